//! Canonical test configurations.
//!
//! Single source of truth for config structs used across tests.
//! Avoids each test module defining its own slightly-different defaults.

use std::path::PathBuf;

use crate::infrastructure::config::{
    AdmissionConfig, Config, EndpointConfig, EngineConfig, ExhaustionPolicy, LoggingConfig,
    PoolConfig,
};
use crate::infrastructure::pool::HealthSettings;

/// Engine path that never exists, so the supervisor runs on the direct path.
pub const MISSING_ENGINE: &str = "/nonexistent/switchyard-engine";

/// Admission limits with a roomy minute window and a fast poll.
///
/// Cooldown starts at 1s and caps at 8s.
pub fn admission(per_second: u32, concurrency: usize) -> AdmissionConfig {
    AdmissionConfig {
        max_requests_per_second: per_second,
        max_requests_per_minute: 10_000,
        max_concurrent_requests: concurrency,
        cooldown_ms: 1_000,
        max_cooldown_ms: 8_000,
        adaptive_throttling: true,
        max_pending: 1_000,
        poll_interval_ms: 10,
    }
}

/// Health settings with the stock threshold (3) and recovery (30s).
pub fn health(policy: ExhaustionPolicy) -> HealthSettings {
    HealthSettings {
        exhaustion_policy: policy,
        ..HealthSettings::default()
    }
}

/// Endpoint entry for `https://<name>.example`.
pub fn endpoint(name: &str, priority: u32, weight: u32) -> EndpointConfig {
    EndpointConfig {
        name: name.to_string(),
        url: format!("https://{name}.example"),
        ws_url: None,
        priority,
        weight,
        primary: false,
    }
}

/// Full configuration over the given `(name, weight)` endpoints.
///
/// The first endpoint has the lowest priority and therefore receives writes.
/// The engine path points nowhere.
pub fn config(endpoints: &[(&str, u32)]) -> Config {
    Config {
        logging: LoggingConfig::default(),
        endpoints: endpoints
            .iter()
            .enumerate()
            .map(|(i, (name, weight))| endpoint(name, i as u32 + 1, *weight))
            .collect(),
        pool: PoolConfig::default(),
        admission: admission(100, 10),
        engine: engine(PathBuf::from(MISSING_ENGINE)),
        simulation: false,
    }
}

/// Engine settings for a binary at `path` with the stock timeouts.
pub fn engine(path: PathBuf) -> EngineConfig {
    EngineConfig {
        path,
        ..EngineConfig::default()
    }
}
