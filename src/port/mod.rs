//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports define the extension points of the dispatch core. Adapters
//! implement them to integrate with external systems.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!                    │  Dispatcher, Supervisor │
//!     ┌──────────────┤    Domain + Port        ├──────────────┐
//!     │              └─────────────────────────┘              │
//!     ▼                                                       ▼
//! ┌──────────────┐                                 ┌───────────────────┐
//! │ RpcTransport │                                 │  ExecutionPath    │
//! │ HttpTransport│                                 │ EngineBridge      │
//! └──────────────┘                                 │ DirectPath        │
//!                                                  └───────────────────┘
//! ```

pub mod outbound;

pub use outbound::execution::{Dispatched, ExecutionPath, TransactionUpdate, UpdateOutcome};
pub use outbound::rpc::RpcTransport;
