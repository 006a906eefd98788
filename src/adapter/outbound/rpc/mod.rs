//! Remote provider adapter: JSON-RPC 2.0 over `reqwest`.

pub mod dto;
mod http;

pub use http::HttpTransport;
