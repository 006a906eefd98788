//! In-memory table of transaction records.
//!
//! Records are kept for the lifetime of the process. Once a record reaches a
//! terminal status it is never modified again; every mutating call reports
//! whether it changed anything so callers can drop duplicate updates.

use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::domain::error::DomainError;
use crate::domain::{
    ExecutionRoute, Signature, TransactionId, TransactionRecord, TransactionStatus,
};

/// Count of records per status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LedgerCounts {
    pub submitted: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub finalized: usize,
    pub failed: usize,
    pub timed_out: usize,
}

impl LedgerCounts {
    pub const fn total(&self) -> usize {
        self.submitted + self.pending + self.confirmed + self.finalized + self.failed + self.timed_out
    }
}

#[derive(Default)]
pub struct Ledger {
    records: DashMap<TransactionId, TransactionRecord>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a fresh `Submitted` record.
    ///
    /// # Errors
    ///
    /// [`DomainError::DuplicateTransaction`] if the id is already known.
    pub fn insert(&self, id: &TransactionId) -> Result<(), DomainError> {
        match self.records.entry(id.clone()) {
            Entry::Occupied(_) => Err(DomainError::DuplicateTransaction { id: id.to_string() }),
            Entry::Vacant(slot) => {
                slot.insert(TransactionRecord::submitted(id.clone()));
                Ok(())
            }
        }
    }

    /// Move a live record to `Pending` on `route`.
    pub fn mark_pending(&self, id: &TransactionId, route: ExecutionRoute) -> bool {
        self.update(id, |record| {
            record.status = TransactionStatus::Pending;
            record.route = Some(route);
        })
    }

    /// Move a live record to the terminal `status`.
    ///
    /// Returns `false` when the record is unknown or already terminal.
    pub fn finish(
        &self,
        id: &TransactionId,
        status: TransactionStatus,
        signature: Option<Signature>,
        error: Option<String>,
    ) -> bool {
        debug_assert!(status.is_terminal());
        self.update(id, |record| {
            record.status = status;
            record.signature = signature;
            record.error_message = error;
        })
    }

    pub fn get(&self, id: &TransactionId) -> Option<TransactionRecord> {
        self.records.get(id).map(|r| r.value().clone())
    }

    /// Every record, oldest first.
    pub fn all(&self) -> Vec<TransactionRecord> {
        let mut records: Vec<_> = self.records.iter().map(|r| r.value().clone()).collect();
        records.sort_by_key(|r| r.created_at);
        records
    }

    pub fn counts(&self) -> LedgerCounts {
        let mut counts = LedgerCounts::default();
        for record in &self.records {
            match record.status {
                TransactionStatus::Submitted => counts.submitted += 1,
                TransactionStatus::Pending => counts.pending += 1,
                TransactionStatus::Confirmed => counts.confirmed += 1,
                TransactionStatus::Finalized => counts.finalized += 1,
                TransactionStatus::Failed => counts.failed += 1,
                TransactionStatus::TimedOut => counts.timed_out += 1,
            }
        }
        counts
    }

    fn update(&self, id: &TransactionId, apply: impl FnOnce(&mut TransactionRecord)) -> bool {
        let Some(mut record) = self.records.get_mut(id) else {
            return false;
        };
        if record.status.is_terminal() {
            return false;
        }
        apply(&mut record);
        record.updated_at = Utc::now();
        true
    }
}
