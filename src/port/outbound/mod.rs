//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe the two infrastructure dependencies of the core:
//! remote JSON-RPC providers and transaction execution paths.

pub mod execution;
pub mod rpc;
