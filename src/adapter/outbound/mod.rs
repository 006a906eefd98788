//! Outbound adapters (driven side).

pub mod engine;
pub mod rpc;
