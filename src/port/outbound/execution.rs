//! Transaction execution port.
//!
//! Two implementations exist: the out-of-process engine bridge and the
//! in-process direct path. The supervisor picks one when it starts and
//! treats them interchangeably afterwards.

use async_trait::async_trait;

use crate::domain::{ExecutionRoute, Signature, SubmitParams, TransactionId};
use crate::error::Result;

/// Result of handing a transaction to an execution path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// The path finished the transaction synchronously.
    Settled(Signature),
    /// The outcome arrives later as a [`TransactionUpdate`].
    Awaiting,
}

/// Asynchronous status update for a dispatched transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionUpdate {
    pub id: TransactionId,
    pub outcome: UpdateOutcome,
}

/// What an update says about the transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// Accepted but not yet confirmed.
    Pending,
    /// Confirmed at the requested commitment.
    Confirmed(Signature),
    /// Finalized.
    Finalized(Signature),
    /// Rejected with a human-readable reason.
    Failed(String),
}

impl UpdateOutcome {
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A way of executing a transaction.
#[async_trait]
pub trait ExecutionPath: Send + Sync {
    /// Which route this path represents.
    fn route(&self) -> ExecutionRoute;

    /// Whether the path can take new submissions right now.
    fn is_available(&self) -> bool;

    /// Hand a transaction to the path.
    async fn dispatch(&self, id: &TransactionId, params: &SubmitParams) -> Result<Dispatched>;
}
