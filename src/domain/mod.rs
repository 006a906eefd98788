//! Core domain types for the dispatch core.
//!
//! Nothing in here performs I/O. Payloads (transaction params, RPC results)
//! are opaque pass-through values as far as these types are concerned.

pub mod endpoint;
pub mod error;
pub mod id;
pub mod priority;
pub mod transaction;

pub use endpoint::{Endpoint, EndpointHealth, EndpointSnapshot};
pub use id::{EndpointId, TransactionId};
pub use priority::Priority;
pub use transaction::{
    ExecutionRoute, Signature, SubmitParams, TransactionRecord, TransactionStatus,
};
