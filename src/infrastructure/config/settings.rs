//! Application configuration loading and validation.
//!
//! Provides the main [`Config`] struct that aggregates all settings.
//! Configuration is loaded from a TOML file, then environment variables
//! override the values that are deployment-specific or sensitive.
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `SWITCHYARD_ENGINE_PATH` | Replaces `engine.path` |
//! | `SWITCHYARD_SIMULATION` | Replaces `simulation` (`true`/`false`/`1`/`0`) |
//! | `SWITCHYARD_RPC_API_KEY` | Sets the `x-api-key` header for every provider |
//! | `SWITCHYARD_PRIMARY_RPC_URL` | Replaces the URL of the write-primary endpoint |
//!
//! # Example
//!
//! ```no_run
//! use switchyard::infrastructure::config::settings::Config;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.toml")?;
//!     config.init_logging();
//!     Ok(())
//! }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use super::admission::AdmissionConfig;
use super::engine::EngineConfig;
use super::logging::LoggingConfig;
use super::pool::{EndpointConfig, PoolConfig};
use crate::error::{ConfigError, Result};

pub const ENV_ENGINE_PATH: &str = "SWITCHYARD_ENGINE_PATH";
pub const ENV_SIMULATION: &str = "SWITCHYARD_SIMULATION";
pub const ENV_RPC_API_KEY: &str = "SWITCHYARD_RPC_API_KEY";
pub const ENV_PRIMARY_RPC_URL: &str = "SWITCHYARD_PRIMARY_RPC_URL";

/// Main application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Logging and tracing configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Remote providers, in preference order for ties.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,

    /// Endpoint health settings.
    #[serde(default)]
    pub pool: PoolConfig,

    /// Rate, concurrency and throttle limits.
    #[serde(default)]
    pub admission: AdmissionConfig,

    /// External execution engine.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Simulate transactions instead of spending real funds.
    ///
    /// Threads through to the direct path; a submission may override it.
    #[serde(default)]
    pub simulation: bool,
}

impl Config {
    /// Parse configuration from TOML content, applying environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is malformed, an override is invalid, or
    /// validation fails.
    pub fn parse_toml(content: &str) -> Result<Self> {
        Self::parse_toml_with(content, |key| std::env::var(key).ok())
    }

    /// Like [`parse_toml`](Self::parse_toml) but with an explicit variable lookup.
    pub fn parse_toml_with<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config: Self = toml::from_str(content).map_err(ConfigError::Parse)?;
        config.apply_overrides(lookup)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the content is malformed,
    /// or validation fails.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
        Self::parse_toml(&content)
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_ENGINE_PATH).filter(|p| !p.is_empty()) {
            self.engine.path = PathBuf::from(path);
        }
        if let Some(raw) = lookup(ENV_SIMULATION) {
            self.simulation = parse_flag(&raw).ok_or_else(|| ConfigError::InvalidValue {
                field: ENV_SIMULATION,
                reason: format!("expected true/false, got '{raw}'"),
            })?;
        }
        if let Some(key) = lookup(ENV_RPC_API_KEY).filter(|k| !k.is_empty()) {
            self.pool.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_PRIMARY_RPC_URL).filter(|u| !u.is_empty()) {
            if let Some(index) = self.write_primary_index() {
                self.endpoints[index].url = url;
            }
        }
        Ok(())
    }

    /// Index of the endpoint that receives writes.
    ///
    /// The endpoint flagged `primary`, otherwise the lowest `priority`
    /// (first in file order on ties).
    #[must_use]
    pub fn write_primary_index(&self) -> Option<usize> {
        if let Some(index) = self.endpoints.iter().position(|e| e.primary) {
            return Some(index);
        }
        self.endpoints
            .iter()
            .enumerate()
            .min_by_key(|(i, e)| (e.priority, *i))
            .map(|(i, _)| i)
    }

    /// Validate configuration values.
    fn validate(&self) -> Result<()> {
        let invalid = |field: &'static str, reason: &str| -> crate::error::Error {
            ConfigError::InvalidValue {
                field,
                reason: reason.to_string(),
            }
            .into()
        };

        if self.endpoints.is_empty() {
            return Err(ConfigError::MissingField { field: "endpoints" }.into());
        }
        let mut names = HashSet::new();
        for endpoint in &self.endpoints {
            if endpoint.name.is_empty() {
                return Err(ConfigError::MissingField { field: "name" }.into());
            }
            if !names.insert(endpoint.name.as_str()) {
                return Err(ConfigError::InvalidValue {
                    field: "name",
                    reason: format!("duplicate endpoint name '{}'", endpoint.name),
                }
                .into());
            }
            if endpoint.url.is_empty() {
                return Err(ConfigError::MissingField { field: "url" }.into());
            }
            check_url("url", &endpoint.url, &["http", "https"])?;
            if let Some(ws) = &endpoint.ws_url {
                check_url("ws_url", ws, &["ws", "wss"])?;
            }
            if endpoint.weight == 0 {
                return Err(invalid("weight", "must be greater than 0"));
            }
        }
        if self.endpoints.iter().filter(|e| e.primary).count() > 1 {
            return Err(invalid("primary", "at most one endpoint may be primary"));
        }

        if self.pool.error_threshold == 0 {
            return Err(invalid("error_threshold", "must be greater than 0"));
        }
        if self.pool.recovery_secs == 0 {
            return Err(invalid("recovery_secs", "must be greater than 0"));
        }
        if self.pool.request_timeout_secs == 0 {
            return Err(invalid("request_timeout_secs", "must be greater than 0"));
        }
        if self.pool.commitment.is_empty() {
            return Err(ConfigError::MissingField {
                field: "commitment",
            }
            .into());
        }

        let admission = &self.admission;
        if admission.max_requests_per_second == 0 {
            return Err(invalid("max_requests_per_second", "must be greater than 0"));
        }
        if admission.max_requests_per_minute < admission.max_requests_per_second {
            return Err(invalid(
                "max_requests_per_minute",
                "must be >= max_requests_per_second",
            ));
        }
        if admission.max_concurrent_requests == 0 {
            return Err(invalid("max_concurrent_requests", "must be greater than 0"));
        }
        if admission.max_pending == 0 {
            return Err(invalid("max_pending", "must be greater than 0"));
        }
        if admission.cooldown_ms == 0 {
            return Err(invalid("cooldown_ms", "must be greater than 0"));
        }
        if admission.max_cooldown_ms < admission.cooldown_ms {
            return Err(invalid("max_cooldown_ms", "must be >= cooldown_ms"));
        }
        if admission.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "must be greater than 0"));
        }

        if self.engine.transaction_timeout_secs == 0 {
            return Err(invalid("transaction_timeout_secs", "must be greater than 0"));
        }
        if self.engine.shutdown_grace_secs == 0 {
            return Err(invalid("shutdown_grace_secs", "must be greater than 0"));
        }

        Ok(())
    }

    /// Initialize logging with the configured settings.
    pub fn init_logging(&self) {
        self.logging.init();
    }
}

fn check_url(field: &'static str, raw: &str, schemes: &[&str]) -> Result<()> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        field,
        reason: format!("'{raw}': {e}"),
    })?;
    if !schemes.contains(&url.scheme()) {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("'{raw}': scheme must be one of {}", schemes.join("/")),
        }
        .into());
    }
    Ok(())
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
