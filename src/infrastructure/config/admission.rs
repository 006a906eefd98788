//! Admission queue configuration.
//!
//! Controls the hard rate ceilings, the concurrency ceiling, the backlog bound
//! and the throttle cooldown applied after providers report rate limiting.

use std::time::Duration;

use serde::Deserialize;

const fn default_true() -> bool {
    true
}

const fn default_max_requests_per_second() -> u32 {
    10
}

const fn default_max_requests_per_minute() -> u32 {
    300
}

const fn default_max_concurrent_requests() -> usize {
    5
}

const fn default_cooldown_ms() -> u64 {
    5_000
}

const fn default_max_cooldown_ms() -> u64 {
    120_000
}

const fn default_max_pending() -> usize {
    1_000
}

const fn default_poll_interval_ms() -> u64 {
    50
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdmissionConfig {
    /// Dispatches allowed per one-second window.
    #[serde(default = "default_max_requests_per_second")]
    pub max_requests_per_second: u32,

    /// Dispatches allowed per one-minute window.
    #[serde(default = "default_max_requests_per_minute")]
    pub max_requests_per_minute: u32,

    /// Calls allowed in flight at once.
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,

    /// Initial throttle cooldown after a rate-limit response (milliseconds).
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: u64,

    /// Upper bound for the doubled cooldown (milliseconds).
    #[serde(default = "default_max_cooldown_ms")]
    pub max_cooldown_ms: u64,

    /// Throttle the whole queue when a provider reports rate limiting.
    #[serde(default = "default_true")]
    pub adaptive_throttling: bool,

    /// Maximum backlog length; further calls are rejected.
    #[serde(default = "default_max_pending")]
    pub max_pending: usize,

    /// How long the drain loop sleeps when it cannot dispatch (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl AdmissionConfig {
    #[must_use]
    pub const fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    #[must_use]
    pub const fn max_cooldown(&self) -> Duration {
        Duration::from_millis(self.max_cooldown_ms)
    }

    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_requests_per_second: default_max_requests_per_second(),
            max_requests_per_minute: default_max_requests_per_minute(),
            max_concurrent_requests: default_max_concurrent_requests(),
            cooldown_ms: default_cooldown_ms(),
            max_cooldown_ms: default_max_cooldown_ms(),
            adaptive_throttling: true,
            max_pending: default_max_pending(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}
