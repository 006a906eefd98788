//! External execution engine configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

fn default_engine_path() -> PathBuf {
    PathBuf::from("./engine/target/release/switchyard-engine")
}

const fn default_shutdown_grace_secs() -> u64 {
    5
}

const fn default_transaction_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Path of the engine binary. When it cannot be launched the supervisor
    /// runs on the direct path.
    #[serde(default = "default_engine_path")]
    pub path: PathBuf,

    /// Extra arguments passed to the engine.
    #[serde(default)]
    pub args: Vec<String>,

    /// Seconds to wait after asking the engine to exit before killing it.
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,

    /// Seconds a submitted transaction may wait for a terminal update.
    #[serde(default = "default_transaction_timeout_secs")]
    pub transaction_timeout_secs: u64,
}

impl EngineConfig {
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    #[must_use]
    pub const fn transaction_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_timeout_secs)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            path: default_engine_path(),
            args: Vec::new(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
            transaction_timeout_secs: default_transaction_timeout_secs(),
        }
    }
}
