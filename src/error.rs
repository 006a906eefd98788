use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::domain::error::DomainError;

/// Configuration-related errors with structured variants.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {field}")]
    MissingField { field: &'static str },

    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    #[error("failed to read config file: {0}")]
    ReadFile(#[source] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[source] toml::de::Error),
}

/// Errors reported by a remote provider endpoint.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Network failure, 5xx, or request timeout.
    #[error("transient failure on {endpoint}: {reason}")]
    Transient { endpoint: String, reason: String },

    /// The provider reported that we are over its request limit.
    #[error("rate limited by {endpoint}: {reason}")]
    RateLimited { endpoint: String, reason: String },

    /// A well-formed JSON-RPC error that is not rate limiting.
    #[error("rpc error from {endpoint} (code {code}): {message}")]
    Rpc {
        endpoint: String,
        code: i64,
        message: String,
    },

    /// The provider answered with something that is not a JSON-RPC response.
    #[error("invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },
}

impl ProviderError {
    /// True when the error should trip the admission throttle.
    #[must_use]
    pub const fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Errors raised by the admission queue before a call is dispatched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("admission queue full ({capacity} pending calls), retry later")]
    QueueFull { capacity: usize },

    #[error("admission queue is shut down")]
    Closed,
}

/// Errors raised by the endpoint pool while selecting a provider.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoolError {
    #[error("no healthy endpoint, every candidate already has a probe in flight")]
    NoHealthyEndpoint,
}

/// Errors from the external execution engine process.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("execution engine unavailable: {0}")]
    Unavailable(String),

    #[error("engine I/O failed: {0}")]
    Io(#[source] std::io::Error),

    #[error("engine protocol error: {0}")]
    Protocol(String),
}

/// Caller-visible transaction failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("transaction {id} timed out after {}s without a status update", .after.as_secs())]
    Timeout { id: String, after: Duration },

    #[error("transaction {id} failed: {reason}")]
    Failed { id: String, reason: String },

    #[error("transaction supervisor is not running")]
    NotStarted,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Admission(#[from] AdmissionError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Stable, closed set of error codes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Configuration,
    InvalidInput,
    ProviderTransient,
    RateLimited,
    ProviderRejected,
    InvalidResponse,
    NoHealthyEndpoint,
    Backpressure,
    Shutdown,
    EngineUnavailable,
    Timeout,
    TransactionFailed,
    Internal,
}

impl ErrorCode {
    /// Wire name of the code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Configuration => "configuration",
            Self::InvalidInput => "invalid_input",
            Self::ProviderTransient => "provider_transient",
            Self::RateLimited => "rate_limited",
            Self::ProviderRejected => "provider_rejected",
            Self::InvalidResponse => "invalid_response",
            Self::NoHealthyEndpoint => "no_healthy_endpoint",
            Self::Backpressure => "backpressure",
            Self::Shutdown => "shutdown",
            Self::EngineUnavailable => "engine_unavailable",
            Self::Timeout => "timeout",
            Self::TransactionFailed => "transaction_failed",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    /// Classify this error into its stable [`ErrorCode`].
    #[must_use]
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Config(_) => ErrorCode::Configuration,
            Self::Domain(_) => ErrorCode::InvalidInput,
            Self::Provider(ProviderError::Transient { .. }) => ErrorCode::ProviderTransient,
            Self::Provider(ProviderError::RateLimited { .. }) => ErrorCode::RateLimited,
            Self::Provider(ProviderError::Rpc { .. }) => ErrorCode::ProviderRejected,
            Self::Provider(ProviderError::InvalidResponse { .. }) => ErrorCode::InvalidResponse,
            Self::Pool(PoolError::NoHealthyEndpoint) => ErrorCode::NoHealthyEndpoint,
            Self::Admission(AdmissionError::QueueFull { .. }) => ErrorCode::Backpressure,
            Self::Admission(AdmissionError::Closed) => ErrorCode::Shutdown,
            Self::Engine(_) => ErrorCode::EngineUnavailable,
            Self::Transaction(TransactionError::Timeout { .. }) => ErrorCode::Timeout,
            Self::Transaction(TransactionError::Failed { .. }) => ErrorCode::TransactionFailed,
            Self::Transaction(TransactionError::NotStarted) => ErrorCode::Shutdown,
            Self::Json(_) => ErrorCode::InvalidResponse,
            Self::Http(_) => ErrorCode::ProviderTransient,
            Self::Io(_) | Self::Url(_) => ErrorCode::Internal,
        }
    }

    /// True when the error came from a provider's rate limiter.
    #[must_use]
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::Provider(p) if p.is_rate_limited())
    }
}
