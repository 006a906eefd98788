//! Endpoint list and pool health configuration.

use serde::Deserialize;

/// One configured remote provider.
#[derive(Debug, Clone, Deserialize)]
pub struct EndpointConfig {
    /// Human-readable name used in logs and status output.
    pub name: String,
    /// HTTP(S) JSON-RPC URL.
    pub url: String,
    /// Optional streaming-channel URL.
    #[serde(default)]
    pub ws_url: Option<String>,
    /// Lower values are preferred when choosing the write primary.
    #[serde(default = "default_endpoint_priority")]
    pub priority: u32,
    /// Higher weights win ties during read selection.
    #[serde(default = "default_endpoint_weight")]
    pub weight: u32,
    /// Pin writes to this endpoint.
    ///
    /// At most one endpoint may set this. When none does, the endpoint with
    /// the lowest `priority` becomes the write primary.
    #[serde(default)]
    pub primary: bool,
}

const fn default_endpoint_priority() -> u32 {
    1
}

const fn default_endpoint_weight() -> u32 {
    1
}

/// What the pool does when no endpoint is healthy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExhaustionPolicy {
    /// Restore every endpoint at once and select again.
    #[default]
    ResetAll,
    /// Admit the endpoint closest to recovery as a single probe.
    HalfOpen,
}

/// Health and request settings for the endpoint pool.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Consecutive errors before an endpoint is marked unhealthy.
    #[serde(default = "default_error_threshold")]
    pub error_threshold: u32,
    /// Seconds an unhealthy endpoint stays out of rotation.
    #[serde(default = "default_recovery_secs")]
    pub recovery_secs: u64,
    /// Behavior when every endpoint is unhealthy.
    #[serde(default)]
    pub exhaustion_policy: ExhaustionPolicy,
    /// Consistency level passed with every read.
    #[serde(default = "default_commitment")]
    pub commitment: String,
    /// Per-request HTTP timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Optional API key sent as `x-api-key`.
    ///
    /// Loaded from `SWITCHYARD_RPC_API_KEY`, never from the config file.
    #[serde(skip)]
    pub api_key: Option<String>,
}

const fn default_error_threshold() -> u32 {
    3
}

const fn default_recovery_secs() -> u64 {
    30
}

fn default_commitment() -> String {
    "confirmed".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            error_threshold: default_error_threshold(),
            recovery_secs: default_recovery_secs(),
            exhaustion_policy: ExhaustionPolicy::default(),
            commitment: default_commitment(),
            request_timeout_secs: default_request_timeout_secs(),
            api_key: None,
        }
    }
}
