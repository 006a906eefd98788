//! JSON-RPC over HTTP(S).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::dto::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
use crate::domain::Endpoint;
use crate::error::{ProviderError, Result};
use crate::infrastructure::config::PoolConfig;
use crate::port::RpcTransport;

/// JSON-RPC code some providers use for "too many requests".
const RPC_RATE_LIMITED: i64 = -32005;

/// HTTP transport shared by every endpoint.
///
/// One client (and connection pool) serves all providers; the endpoint only
/// supplies the URL. Failures are classified, never retried.
pub struct HttpTransport {
    http: HttpClient,
    next_id: AtomicU64,
}

impl HttpTransport {
    /// Build a transport with a per-request timeout and optional API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// TLS backend cannot be initialized.
    pub fn new(timeout: Duration, api_key: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(key).map_err(|e| {
                crate::error::ConfigError::InvalidValue {
                    field: "api_key",
                    reason: e.to_string(),
                }
            })?;
            value.set_sensitive(true);
            headers.insert("x-api-key", value);
        }

        let http = HttpClient::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()?;
        Ok(Self {
            http,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn from_config(config: &PoolConfig) -> Result<Self> {
        Self::new(
            Duration::from_secs(config.request_timeout_secs),
            config.api_key.as_deref(),
        )
    }
}

#[async_trait]
impl RpcTransport for HttpTransport {
    async fn call(
        &self,
        endpoint: &Endpoint,
        method: &str,
        params: Value,
    ) -> std::result::Result<Value, ProviderError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest::new(id, method, params);
        debug!(endpoint = endpoint.name(), method, id, "Sending RPC request");

        let response = self
            .http
            .post(endpoint.url())
            .json(&request)
            .send()
            .await
            .map_err(|e| classify_transport(endpoint.name(), &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| classify_transport(endpoint.name(), &e))?;

        if let Some(err) = classify_status(endpoint.name(), status, &body) {
            warn!(endpoint = endpoint.name(), method, %status, error = %err, "RPC request failed");
            return Err(err);
        }
        parse_response(endpoint.name(), &body)
    }
}

/// Map a `reqwest` failure: anything that never produced a response is
/// transient, an unreadable body is an invalid response.
fn classify_transport(endpoint: &str, err: &reqwest::Error) -> ProviderError {
    if err.is_decode() || err.is_body() {
        ProviderError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    } else {
        ProviderError::Transient {
            endpoint: endpoint.to_string(),
            reason: err.to_string(),
        }
    }
}

/// Classify a non-success HTTP status. Returns `None` for 2xx.
///
/// A 4xx body that carries a JSON-RPC error is classified by that error.
pub(crate) fn classify_status(
    endpoint: &str,
    status: StatusCode,
    body: &str,
) -> Option<ProviderError> {
    if status.is_success() {
        return None;
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Some(ProviderError::RateLimited {
            endpoint: endpoint.to_string(),
            reason: format!("HTTP {status}"),
        });
    }
    if status.is_server_error() {
        return Some(ProviderError::Transient {
            endpoint: endpoint.to_string(),
            reason: format!("HTTP {status}"),
        });
    }
    if let Ok(JsonRpcResponse {
        error: Some(error), ..
    }) = serde_json::from_str::<JsonRpcResponse>(body)
    {
        return Some(classify_rpc_error(endpoint, error));
    }
    Some(ProviderError::Rpc {
        endpoint: endpoint.to_string(),
        code: i64::from(status.as_u16()),
        message: truncate(body, 200),
    })
}

/// Classify a JSON-RPC `error` object.
pub(crate) fn classify_rpc_error(endpoint: &str, error: JsonRpcError) -> ProviderError {
    let lowered = error.message.to_ascii_lowercase();
    if error.code == 429
        || error.code == RPC_RATE_LIMITED
        || lowered.contains("rate limit")
        || lowered.contains("too many requests")
    {
        return ProviderError::RateLimited {
            endpoint: endpoint.to_string(),
            reason: error.message,
        };
    }
    ProviderError::Rpc {
        endpoint: endpoint.to_string(),
        code: error.code,
        message: error.message,
    }
}

/// Extract `result` from a 2xx body.
pub(crate) fn parse_response(
    endpoint: &str,
    body: &str,
) -> std::result::Result<Value, ProviderError> {
    let invalid = |reason: String| ProviderError::InvalidResponse {
        endpoint: endpoint.to_string(),
        reason,
    };

    let raw: Value = serde_json::from_str(body).map_err(|e| invalid(e.to_string()))?;
    let has_result = raw.get("result").is_some();
    let response: JsonRpcResponse =
        serde_json::from_value(raw).map_err(|e| invalid(e.to_string()))?;

    if let Some(error) = response.error {
        return Err(classify_rpc_error(endpoint, error));
    }
    if !has_result {
        return Err(invalid("response has neither result nor error".to_string()));
    }
    Ok(response.result.unwrap_or(Value::Null))
}

fn truncate(body: &str, max: usize) -> String {
    match body.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}
