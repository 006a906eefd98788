//! Mock [`RpcTransport`] for testing.
//!
//! [`MockTransport`] answers every call from a per-method result table and
//! lets tests queue failures per endpoint. Every call is recorded so tests
//! can assert on routing.

use std::collections::{HashMap, VecDeque};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use crate::domain::Endpoint;
use crate::error::ProviderError;
use crate::port::RpcTransport;

use super::domain::SIGNATURE;

/// One call seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub endpoint: String,
    pub method: String,
    pub params: Value,
}

/// Scripted transport that records calls.
///
/// Defaults: `sendTransaction` returns [`SIGNATURE`], `simulateTransaction`
/// returns a clean simulation, everything else returns
/// `{"endpoint": <name>, "method": <method>}`.
pub struct MockTransport {
    calls: Mutex<Vec<RecordedCall>>,
    results: Mutex<HashMap<String, Value>>,
    failures: Mutex<HashMap<String, VecDeque<ProviderError>>>,
    delay: Option<Duration>,
}

impl MockTransport {
    pub fn new() -> Self {
        let mut results = HashMap::new();
        results.insert("sendTransaction".to_string(), json!(SIGNATURE));
        results.insert(
            "simulateTransaction".to_string(),
            json!({ "context": { "slot": 1 }, "value": { "err": null, "logs": [] } }),
        );
        Self {
            calls: Mutex::new(Vec::new()),
            results: Mutex::new(results),
            failures: Mutex::new(HashMap::new()),
            delay: None,
        }
    }

    /// Sleep this long inside every call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Answer `method` with `result` from now on.
    pub fn respond(&self, method: &str, result: Value) {
        self.results.lock().insert(method.to_string(), result);
    }

    /// Fail the next call to `endpoint` with `error`. Queued failures are
    /// consumed in order.
    pub fn fail_next(&self, endpoint: &str, error: ProviderError) {
        self.failures
            .lock()
            .entry(endpoint.to_string())
            .or_default()
            .push_back(error);
    }

    /// Fail the next `n` calls to `endpoint` with transient errors.
    pub fn fail_times(&self, endpoint: &str, n: usize) {
        for _ in 0..n {
            self.fail_next(endpoint, transient(endpoint));
        }
    }

    /// Every call seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Number of calls routed to `endpoint`.
    pub fn calls_to(&self, endpoint: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.endpoint == endpoint)
            .count()
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RpcTransport for MockTransport {
    async fn call(
        &self,
        endpoint: &Endpoint,
        method: &str,
        params: Value,
    ) -> Result<Value, ProviderError> {
        self.calls.lock().push(RecordedCall {
            endpoint: endpoint.name().to_string(),
            method: method.to_string(),
            params,
        });
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        let failure = self
            .failures
            .lock()
            .get_mut(endpoint.name())
            .and_then(VecDeque::pop_front);
        if let Some(err) = failure {
            return Err(err);
        }

        let result = self.results.lock().get(method).cloned();
        Ok(result.unwrap_or_else(|| json!({ "endpoint": endpoint.name(), "method": method })))
    }
}

/// Transient failure attributed to `endpoint`.
pub fn transient(endpoint: &str) -> ProviderError {
    ProviderError::Transient {
        endpoint: endpoint.to_string(),
        reason: "connection reset".to_string(),
    }
}

/// Rate-limit failure attributed to `endpoint`.
pub fn rate_limited(endpoint: &str) -> ProviderError {
    ProviderError::RateLimited {
        endpoint: endpoint.to_string(),
        reason: "HTTP 429".to_string(),
    }
}
