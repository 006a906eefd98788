//! Application services.
//!
//! These services wire the pool, the admission queue and the execution
//! paths together into the operations callers use.

pub mod app;
pub mod direct;
pub mod dispatch;
pub mod supervisor;

pub use app::{CoreStatus, DispatchCore};
pub use direct::DirectPath;
pub use dispatch::Dispatcher;
pub use supervisor::{SupervisorStats, TransactionSupervisor};
