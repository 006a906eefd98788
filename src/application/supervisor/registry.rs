//! Completion registry: one waiting caller per transaction id.

use dashmap::DashMap;
use tokio::sync::oneshot;

use crate::domain::{Signature, TransactionId};

/// How a transaction ended, as delivered to its caller.
pub type Completion = std::result::Result<Signature, String>;

/// Waiters keyed by transaction id.
///
/// A waiter is removed when it is completed, so a second completion for the
/// same id finds nothing and is a no-op.
#[derive(Default)]
pub struct CompletionRegistry {
    waiters: DashMap<TransactionId, oneshot::Sender<Completion>>,
}

impl CompletionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a waiter for `id`, replacing any previous one.
    pub fn register(&self, id: TransactionId) -> oneshot::Receiver<Completion> {
        let (tx, rx) = oneshot::channel();
        self.waiters.insert(id, tx);
        rx
    }

    /// Wake the waiter for `id`. Returns whether one was waiting.
    pub fn complete(&self, id: &TransactionId, completion: Completion) -> bool {
        match self.waiters.remove(id) {
            // The caller may have stopped listening; that is not an error.
            Some((_, tx)) => tx.send(completion).is_ok(),
            None => false,
        }
    }

    /// Drop the waiter for `id` without waking it.
    pub fn remove(&self, id: &TransactionId) {
        self.waiters.remove(id);
    }

    pub fn len(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.waiters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_once() {
        let registry = CompletionRegistry::new();
        let id = TransactionId::new("tx-1");
        let rx = registry.register(id.clone());

        assert!(registry.complete(&id, Ok(Signature::new("SIG"))));
        assert!(!registry.complete(&id, Ok(Signature::new("OTHER"))));

        assert_eq!(rx.await.unwrap(), Ok(Signature::new("SIG")));
        assert!(registry.is_empty());
    }

    #[test]
    fn unknown_id_is_ignored() {
        let registry = CompletionRegistry::new();
        assert!(!registry.complete(&TransactionId::new("nope"), Err("x".into())));
    }

    #[test]
    fn dropped_receiver_does_not_panic() {
        let registry = CompletionRegistry::new();
        let id = TransactionId::new("tx-2");
        drop(registry.register(id.clone()));

        assert!(!registry.complete(&id, Err("late".into())));
        assert_eq!(registry.len(), 0);
    }
}
