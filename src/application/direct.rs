//! In-process execution path.
//!
//! Used when no engine is running. The submission is encoded as an opaque
//! base64 payload and sent through the dispatcher, so it is paced by the
//! admission queue and lands on the pinned write primary like any other
//! write.

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use rand::RngCore;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::dispatch::Dispatcher;
use crate::domain::{ExecutionRoute, Priority, Signature, SubmitParams, TransactionId};
use crate::error::{ProviderError, Result, TransactionError};
use crate::port::{Dispatched, ExecutionPath};

/// Fallback path through admission and the endpoint pool.
pub struct DirectPath {
    dispatcher: Arc<Dispatcher>,
    simulation: bool,
}

impl DirectPath {
    /// `simulation` is the default a submission falls back to when it does
    /// not set `is_simulation` itself.
    pub fn new(dispatcher: Arc<Dispatcher>, simulation: bool) -> Self {
        Self {
            dispatcher,
            simulation,
        }
    }

    async fn simulate(&self, id: &TransactionId, payload: String) -> Result<Signature> {
        let params = vec![
            json!(payload),
            json!({ "encoding": "base64", "commitment": self.dispatcher.commitment() }),
        ];
        let result = self
            .dispatcher
            .read("simulateTransaction", params, Priority::High)
            .await?;

        if let Some(err) = simulation_error(&result) {
            return Err(TransactionError::Failed {
                id: id.to_string(),
                reason: format!("simulation failed: {err}"),
            }
            .into());
        }

        let mut bytes = [0u8; 64];
        rand::thread_rng().fill_bytes(&mut bytes);
        let signature = Signature::from_bytes(&bytes);
        info!(tx_id = %id, %signature, "Simulated transaction");
        Ok(signature)
    }

    async fn send(&self, payload: String) -> Result<Signature> {
        let params = vec![
            json!(payload),
            json!({
                "encoding": "base64",
                "skipPreflight": false,
                "preflightCommitment": self.dispatcher.commitment(),
            }),
        ];
        let primary = self.dispatcher.pool().write_primary();
        let result = self
            .dispatcher
            .write("sendTransaction", params, Priority::High)
            .await?;

        match result {
            Value::String(sig) => Ok(Signature::new(sig)),
            other => {
                let endpoint = self
                    .dispatcher
                    .pool()
                    .endpoint(primary)
                    .map(|e| e.name().to_string())
                    .unwrap_or_default();
                Err(ProviderError::InvalidResponse {
                    endpoint,
                    reason: format!("sendTransaction returned {other}"),
                }
                .into())
            }
        }
    }
}

#[async_trait]
impl ExecutionPath for DirectPath {
    fn route(&self) -> ExecutionRoute {
        ExecutionRoute::Direct
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn dispatch(&self, id: &TransactionId, params: &SubmitParams) -> Result<Dispatched> {
        let payload = BASE64.encode(serde_json::to_vec(params)?);
        let simulation = params.simulation(self.simulation);
        debug!(tx_id = %id, simulation, "Executing transaction on the direct path");

        let signature = if simulation {
            self.simulate(id, payload).await?
        } else {
            self.send(payload).await?
        };
        Ok(Dispatched::Settled(signature))
    }
}

/// The `value.err` field of a simulation result, when it is set.
fn simulation_error(result: &Value) -> Option<&Value> {
    result
        .get("value")
        .and_then(|v| v.get("err"))
        .filter(|err| !err.is_null())
}
