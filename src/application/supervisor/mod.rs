//! Transaction lifecycle supervision.
//!
//! [`TransactionSupervisor`] is the entry point for submitting transactions.
//! It owns two execution paths: the out-of-process engine, launched on
//! [`start`](TransactionSupervisor::start) when its binary exists, and the
//! in-process direct path that is always available. New submissions go to
//! the engine while it is running and to the direct path otherwise.
//!
//! # Lifecycle
//!
//! `Submitted -> Pending -> {Confirmed | Finalized | Failed | TimedOut}`
//!
//! Engine submissions resolve when a correlated update arrives on the
//! engine's stdout, or fail with [`TransactionError::Timeout`] once the
//! transaction timeout (60s by default) passes without one. A crashed engine
//! does not wake its pending callers; they expire through the timeout.
//! Updates for transactions that are already terminal are dropped.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::adapter::outbound::engine::{EngineBridge, EngineState};
use crate::domain::{
    ExecutionRoute, Signature, SubmitParams, TransactionId, TransactionRecord, TransactionStatus,
};
use crate::error::{Error, Result, TransactionError};
use crate::infrastructure::config::EngineConfig;
use crate::port::{Dispatched, ExecutionPath, TransactionUpdate, UpdateOutcome};

mod ledger;
mod registry;

pub use ledger::{Ledger, LedgerCounts};
pub use registry::{Completion, CompletionRegistry};

#[cfg(test)]
mod tests;

/// Point-in-time view of the supervisor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupervisorStats {
    /// Route new submissions take.
    pub route: ExecutionRoute,
    /// Engine process state.
    pub engine: EngineState,
    /// Callers waiting on an engine update.
    pub awaiting: usize,
    /// Records by status.
    pub transactions: LedgerCounts,
}

pub struct TransactionSupervisor {
    engine_config: EngineConfig,
    timeout: Duration,
    direct: Arc<dyn ExecutionPath>,
    engine: RwLock<Option<Arc<EngineBridge>>>,
    registry: Arc<CompletionRegistry>,
    ledger: Arc<Ledger>,
    pump: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

impl TransactionSupervisor {
    pub fn new(engine_config: EngineConfig, direct: Arc<dyn ExecutionPath>) -> Self {
        Self {
            timeout: engine_config.transaction_timeout(),
            engine_config,
            direct,
            engine: RwLock::new(None),
            registry: Arc::new(CompletionRegistry::new()),
            ledger: Arc::new(Ledger::new()),
            pump: Mutex::new(None),
            started: AtomicBool::new(false),
        }
    }

    /// Launch the engine, or settle on the direct path if it cannot start.
    ///
    /// Never fails: a missing engine binary is logged and the supervisor
    /// runs on the direct path. Calling it again while started is a no-op.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let bridge = match EngineBridge::spawn(&self.engine_config, tx) {
            Ok(bridge) => Some(Arc::new(bridge)),
            Err(e) => {
                warn!(error = %e, "Execution engine unavailable, using the direct path");
                None
            }
        };
        *self.engine.write() = bridge;

        let handle = tokio::spawn(pump_updates(
            rx,
            Arc::clone(&self.registry),
            Arc::clone(&self.ledger),
        ));
        *self.pump.lock() = Some(handle);
        info!(route = %self.route(), "Transaction supervisor started");
    }

    /// Stop the engine and the update pump.
    ///
    /// Callers still waiting on the engine are not woken; they time out.
    pub async fn stop(&self) {
        if !self.started.swap(false, Ordering::SeqCst) {
            return;
        }
        let engine = self.engine.read().clone();
        if let Some(bridge) = engine {
            bridge.stop().await;
        }
        let pump = self.pump.lock().take();
        if let Some(pump) = pump {
            if let Err(e) = pump.await {
                debug!(error = %e, "Update pump ended abnormally");
            }
        }
        info!("Transaction supervisor stopped");
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Submit a transaction under a fresh id.
    ///
    /// # Errors
    ///
    /// Invalid params, provider and admission errors from the direct path,
    /// [`TransactionError::Failed`] when the transaction is rejected and
    /// [`TransactionError::Timeout`] when no outcome arrives in time.
    pub async fn submit(&self, params: SubmitParams) -> Result<Signature> {
        self.submit_as(TransactionId::generate(), params).await
    }

    /// Submit a transaction under a caller-chosen id.
    pub async fn submit_as(&self, id: TransactionId, params: SubmitParams) -> Result<Signature> {
        if !self.is_started() {
            return Err(TransactionError::NotStarted.into());
        }
        params.validate()?;
        self.ledger.insert(&id)?;

        // Registered before dispatch so an immediate update has a waiter.
        let rx = self.registry.register(id.clone());
        let path = self.active_path();
        self.ledger.mark_pending(&id, path.route());
        debug!(tx_id = %id, route = %path.route(), "Dispatching transaction");

        let dispatched = match path.dispatch(&id, &params).await {
            Ok(dispatched) => dispatched,
            Err(e) if path.route() == ExecutionRoute::Engine => {
                warn!(tx_id = %id, error = %e, "Engine dispatch failed, using the direct path");
                self.ledger.mark_pending(&id, ExecutionRoute::Direct);
                match self.direct.dispatch(&id, &params).await {
                    Ok(dispatched) => dispatched,
                    Err(e) => return Err(self.fail(&id, e)),
                }
            }
            Err(e) => return Err(self.fail(&id, e)),
        };

        match dispatched {
            Dispatched::Settled(signature) => {
                self.registry.remove(&id);
                self.ledger.finish(
                    &id,
                    TransactionStatus::Confirmed,
                    Some(signature.clone()),
                    None,
                );
                info!(tx_id = %id, %signature, "Transaction confirmed");
                Ok(signature)
            }
            Dispatched::Awaiting => self.await_outcome(&id, rx).await,
        }
    }

    /// Route new submissions take right now.
    pub fn route(&self) -> ExecutionRoute {
        self.active_path().route()
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine
            .read()
            .as_ref()
            .map_or(EngineState::NotStarted, |bridge| bridge.state())
    }

    pub fn record(&self, id: &TransactionId) -> Option<TransactionRecord> {
        self.ledger.get(id)
    }

    pub fn records(&self) -> Vec<TransactionRecord> {
        self.ledger.all()
    }

    pub fn stats(&self) -> SupervisorStats {
        SupervisorStats {
            route: self.route(),
            engine: self.engine_state(),
            awaiting: self.registry.len(),
            transactions: self.ledger.counts(),
        }
    }

    fn active_path(&self) -> Arc<dyn ExecutionPath> {
        match self.engine.read().as_ref() {
            Some(bridge) if bridge.is_available() => Arc::clone(bridge) as Arc<dyn ExecutionPath>,
            _ => Arc::clone(&self.direct),
        }
    }

    async fn await_outcome(
        &self,
        id: &TransactionId,
        mut rx: oneshot::Receiver<Completion>,
    ) -> Result<Signature> {
        let received = match tokio::time::timeout(self.timeout, &mut rx).await {
            Ok(received) => received,
            Err(_) => {
                let reason = format!("no status update within {}s", self.timeout.as_secs());
                if self
                    .ledger
                    .finish(id, TransactionStatus::TimedOut, None, Some(reason))
                {
                    self.registry.remove(id);
                    warn!(
                        tx_id = %id,
                        timeout_secs = self.timeout.as_secs(),
                        "Transaction timed out"
                    );
                    return Err(TransactionError::Timeout {
                        id: id.to_string(),
                        after: self.timeout,
                    }
                    .into());
                }
                // An update landed in the ledger first; its completion follows.
                rx.await
            }
        };

        match received {
            Ok(Ok(signature)) => Ok(signature),
            Ok(Err(reason)) => Err(TransactionError::Failed {
                id: id.to_string(),
                reason,
            }
            .into()),
            Err(_) => self.outcome_from_ledger(id),
        }
    }

    /// Resolve from the record when the completion itself was lost.
    fn outcome_from_ledger(&self, id: &TransactionId) -> Result<Signature> {
        match self.ledger.get(id) {
            Some(TransactionRecord {
                status: TransactionStatus::Confirmed | TransactionStatus::Finalized,
                signature: Some(signature),
                ..
            }) => Ok(signature),
            record => Err(TransactionError::Failed {
                id: id.to_string(),
                reason: record
                    .and_then(|r| r.error_message)
                    .unwrap_or_else(|| "outcome lost".to_string()),
            }
            .into()),
        }
    }

    fn fail(&self, id: &TransactionId, error: Error) -> Error {
        self.registry.remove(id);
        self.ledger.finish(
            id,
            TransactionStatus::Failed,
            None,
            Some(error.to_string()),
        );
        warn!(tx_id = %id, error = %error, "Transaction failed");
        error
    }
}

/// Apply engine updates until the engine goes away.
async fn pump_updates(
    mut updates: mpsc::UnboundedReceiver<TransactionUpdate>,
    registry: Arc<CompletionRegistry>,
    ledger: Arc<Ledger>,
) {
    while let Some(update) = updates.recv().await {
        apply_update(&registry, &ledger, update);
    }
    debug!("Engine update stream closed");
}

fn apply_update(registry: &CompletionRegistry, ledger: &Ledger, update: TransactionUpdate) {
    let TransactionUpdate { id, outcome } = update;
    let (status, completion) = match outcome {
        UpdateOutcome::Pending => {
            if !ledger.mark_pending(&id, ExecutionRoute::Engine) {
                debug!(tx_id = %id, "Ignoring pending update for a settled transaction");
            }
            return;
        }
        UpdateOutcome::Confirmed(sig) => (TransactionStatus::Confirmed, Ok(sig)),
        UpdateOutcome::Finalized(sig) => (TransactionStatus::Finalized, Ok(sig)),
        UpdateOutcome::Failed(reason) => (TransactionStatus::Failed, Err(reason)),
    };

    let (signature, error) = match &completion {
        Ok(sig) => (Some(sig.clone()), None),
        Err(reason) => (None, Some(reason.clone())),
    };
    if !ledger.finish(&id, status, signature, error) {
        debug!(tx_id = %id, %status, "Ignoring duplicate or late update");
        return;
    }

    match &completion {
        Ok(sig) => info!(tx_id = %id, signature = %sig, %status, "Transaction settled by engine"),
        Err(reason) => warn!(tx_id = %id, reason = %reason, "Engine rejected transaction"),
    }
    registry.complete(&id, completion);
}
