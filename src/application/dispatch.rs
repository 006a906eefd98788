//! Outbound call path: admission queue, then endpoint pool, then transport.
//!
//! Every provider call made by the core goes through [`Dispatcher`]. The
//! endpoint is picked when the queue admits the call, not when it is
//! scheduled, so a call that waited out a throttle still lands on whatever
//! endpoint is healthiest at that moment.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use crate::domain::{Endpoint, Priority};
use crate::error::{ProviderError, Result};
use crate::infrastructure::admission::AdmissionQueue;
use crate::infrastructure::pool::EndpointPool;
use crate::port::RpcTransport;

/// SPL token program, the default owner filter for token account lookups.
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Read,
    Write,
}

/// Routes provider calls through admission and the pool.
pub struct Dispatcher {
    pool: Arc<EndpointPool>,
    queue: Arc<AdmissionQueue>,
    transport: Arc<dyn RpcTransport>,
    commitment: String,
}

impl Dispatcher {
    pub fn new(
        pool: Arc<EndpointPool>,
        queue: Arc<AdmissionQueue>,
        transport: Arc<dyn RpcTransport>,
        commitment: impl Into<String>,
    ) -> Self {
        Self {
            pool,
            queue,
            transport,
            commitment: commitment.into(),
        }
    }

    pub fn pool(&self) -> &Arc<EndpointPool> {
        &self.pool
    }

    pub fn queue(&self) -> &Arc<AdmissionQueue> {
        &self.queue
    }

    pub fn commitment(&self) -> &str {
        &self.commitment
    }

    /// Call `method` on the best healthy endpoint.
    ///
    /// # Errors
    ///
    /// Admission errors, or the provider error unchanged after it has been
    /// recorded against the endpoint.
    pub async fn read(&self, method: &str, params: Vec<Value>, priority: Priority) -> Result<Value> {
        self.call(Target::Read, method, params, priority).await
    }

    /// Call `method` on the pinned write primary.
    pub async fn write(&self, method: &str, params: Vec<Value>, priority: Priority) -> Result<Value> {
        self.call(Target::Write, method, params, priority).await
    }

    /// Call `method` on one specific endpoint, bypassing selection.
    ///
    /// Used by health probes; the outcome still updates the endpoint's
    /// health.
    pub async fn probe(&self, endpoint: Endpoint, method: &str, params: Vec<Value>) -> Result<Value> {
        let pool = Arc::clone(&self.pool);
        let transport = Arc::clone(&self.transport);
        let method = method.to_string();
        self.queue
            .schedule(Priority::Normal, move || async move {
                execute(&pool, transport.as_ref(), &endpoint, &method, params).await
            })
            .await
    }

    pub async fn get_balance(&self, address: &str) -> Result<Value> {
        let params = vec![json!(address), self.commitment_config()];
        self.read("getBalance", params, Priority::Normal).await
    }

    pub async fn get_account_info(&self, pubkey: &str) -> Result<Value> {
        let params = vec![
            json!(pubkey),
            json!({ "encoding": "jsonParsed", "commitment": self.commitment }),
        ];
        self.read("getAccountInfo", params, Priority::Normal).await
    }

    /// Latest block reference, read at high priority since submissions
    /// depend on it.
    pub async fn get_latest_blockhash(&self) -> Result<Value> {
        let params = vec![self.commitment_config()];
        self.read("getLatestBlockhash", params, Priority::High).await
    }

    /// Token accounts of `owner` under `program_id` (the token program when
    /// `None`).
    pub async fn get_token_accounts_by_owner(
        &self,
        owner: &str,
        program_id: Option<&str>,
    ) -> Result<Value> {
        let params = vec![
            json!(owner),
            json!({ "programId": program_id.unwrap_or(TOKEN_PROGRAM_ID) }),
            json!({ "encoding": "jsonParsed", "commitment": self.commitment }),
        ];
        self.read("getTokenAccountsByOwner", params, Priority::Normal)
            .await
    }

    pub async fn get_program_accounts(&self, program_id: &str) -> Result<Value> {
        let params = vec![
            json!(program_id),
            json!({ "encoding": "base64", "commitment": self.commitment }),
        ];
        self.read("getProgramAccounts", params, Priority::Low).await
    }

    /// `{"commitment": <level>}` as appended to reads.
    pub fn commitment_config(&self) -> Value {
        json!({ "commitment": self.commitment })
    }

    async fn call(
        &self,
        target: Target,
        method: &str,
        params: Vec<Value>,
        priority: Priority,
    ) -> Result<Value> {
        let pool = Arc::clone(&self.pool);
        let transport = Arc::clone(&self.transport);
        let method = method.to_string();
        self.queue
            .schedule(priority, move || async move {
                let endpoint = match target {
                    Target::Read => pool.select_for_read()?,
                    Target::Write => pool.select_for_write(),
                };
                execute(&pool, transport.as_ref(), &endpoint, &method, params).await
            })
            .await
    }
}

async fn execute(
    pool: &EndpointPool,
    transport: &dyn RpcTransport,
    endpoint: &Endpoint,
    method: &str,
    params: Vec<Value>,
) -> Result<Value> {
    debug!(endpoint = endpoint.name(), method, "Dispatching provider call");
    match transport.call(endpoint, method, Value::Array(params)).await {
        Ok(value) => {
            pool.report_success(endpoint.id());
            Ok(value)
        }
        Err(err) => {
            if counts_against_health(&err) {
                pool.report_error(endpoint.id());
            }
            Err(err.into())
        }
    }
}

/// A well-formed JSON-RPC rejection says nothing about the endpoint's
/// health; everything else does.
const fn counts_against_health(err: &ProviderError) -> bool {
    !matches!(err, ProviderError::Rpc { .. })
}
