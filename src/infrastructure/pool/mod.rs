//! Health-aware pool of redundant RPC providers.
//!
//! The pool owns a static table of [`Endpoint`]s built once from
//! configuration. Reads are balanced across healthy endpoints with a
//! deterministic weighted sort; writes are always pinned to one primary
//! endpoint so transaction submission is never spread across providers.
//!
//! # Health
//!
//! Every reported error increments the endpoint's error count. Reaching the
//! threshold (3 by default) takes the endpoint out of rotation and arms a
//! fixed recovery deadline (30s by default). When the deadline passes the
//! endpoint is restored, no matter what traffic happened in between.
//!
//! When no endpoint is healthy the configured [`ExhaustionPolicy`] decides
//! what to hand out: `ResetAll` restores the whole table at once, `HalfOpen`
//! admits the endpoint closest to recovery as a single probe. An endpoint
//! with a probe in flight is not probed again until that probe is reported;
//! when every endpoint is in that state selection fails with
//! [`PoolError::NoHealthyEndpoint`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::{Endpoint, EndpointHealth, EndpointId, EndpointSnapshot};
use crate::error::{ConfigError, PoolError, Result};
use crate::infrastructure::config::{Config, ExhaustionPolicy};

mod health;

use health::{schedule_recovery, sweep_recovered};

/// Health policy of a pool.
#[derive(Debug, Clone)]
pub struct HealthSettings {
    /// Errors before an endpoint is marked unhealthy.
    pub error_threshold: u32,
    /// How long an unhealthy endpoint stays out of rotation.
    pub recovery: Duration,
    /// What to do when every endpoint is unhealthy.
    pub exhaustion_policy: ExhaustionPolicy,
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            error_threshold: 3,
            recovery: Duration::from_secs(30),
            exhaustion_policy: ExhaustionPolicy::ResetAll,
        }
    }
}

/// Runtime statistics for the pool.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Endpoints currently in rotation.
    pub healthy: usize,
    /// Endpoints configured.
    pub total: usize,
    /// Times an endpoint was taken out of rotation.
    pub trips: u64,
    /// Times the whole table was reset because nothing was healthy.
    pub resets: u64,
    /// Half-open probes handed out.
    pub probes: u64,
}

#[derive(Default)]
struct Counters {
    trips: AtomicU64,
    resets: AtomicU64,
    probes: AtomicU64,
}

/// Pool of remote providers with weighted, error-aware selection.
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
    health: Arc<Mutex<Vec<EndpointHealth>>>,
    write_primary: EndpointId,
    settings: HealthSettings,
    counters: Counters,
}

impl EndpointPool {
    /// Create a pool over a static endpoint table.
    ///
    /// # Errors
    ///
    /// Returns an error if the table is empty, the write primary is not in
    /// the table, or the error threshold is zero.
    pub fn new(
        endpoints: Vec<Endpoint>,
        write_primary: EndpointId,
        settings: HealthSettings,
    ) -> Result<Self> {
        if endpoints.is_empty() {
            return Err(ConfigError::MissingField { field: "endpoints" }.into());
        }
        if write_primary.index() >= endpoints.len() {
            return Err(ConfigError::InvalidValue {
                field: "primary",
                reason: format!("no endpoint at index {}", write_primary.index()),
            }
            .into());
        }
        if settings.error_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                field: "error_threshold",
                reason: "must be > 0".to_string(),
            }
            .into());
        }

        let health = vec![EndpointHealth::default(); endpoints.len()];
        info!(
            endpoints = endpoints.len(),
            write_primary = endpoints[write_primary.index()].name(),
            policy = ?settings.exhaustion_policy,
            "Endpoint pool ready"
        );
        Ok(Self {
            endpoints,
            health: Arc::new(Mutex::new(health)),
            write_primary,
            settings,
            counters: Counters::default(),
        })
    }

    /// Build the pool from the `[[endpoints]]` and `[pool]` configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoints = config
            .endpoints
            .iter()
            .enumerate()
            .map(|(i, e)| {
                Endpoint::try_new(
                    EndpointId::new(i),
                    e.name.clone(),
                    e.url.clone(),
                    e.ws_url.clone(),
                    e.priority,
                    e.weight,
                )
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let primary = config
            .write_primary_index()
            .ok_or(ConfigError::MissingField { field: "endpoints" })?;
        let settings = HealthSettings {
            error_threshold: config.pool.error_threshold,
            recovery: Duration::from_secs(config.pool.recovery_secs),
            exhaustion_policy: config.pool.exhaustion_policy,
        };
        Self::new(endpoints, EndpointId::new(primary), settings)
    }

    /// Pick the best healthy endpoint for a read.
    ///
    /// Healthy endpoints are ordered by error count (ascending), weight
    /// (descending), request count (ascending), then configured priority and
    /// table order. An unhealthy endpoint is never returned while a healthy
    /// one exists.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::NoHealthyEndpoint`] under the half-open policy
    /// when nothing is healthy and every endpoint already has a probe in
    /// flight. The reset-all policy never fails.
    pub fn select_for_read(&self) -> Result<Endpoint> {
        let mut health = self.health.lock();
        let now = Instant::now();
        sweep_recovered(&mut health, now);

        let index = match self.best_healthy(&health) {
            Some(index) => index,
            None => self.on_exhausted(&mut health, now)?,
        };

        let entry = &mut health[index];
        entry.request_count += 1;
        entry.last_used_at = Some(now);
        Ok(self.endpoints[index].clone())
    }

    /// The pinned write primary, regardless of health.
    pub fn select_for_write(&self) -> Endpoint {
        let mut health = self.health.lock();
        let index = self.write_primary.index();
        let entry = &mut health[index];
        entry.request_count += 1;
        entry.last_used_at = Some(Instant::now());
        self.endpoints[index].clone()
    }

    /// Record a successful call.
    ///
    /// Clears the consecutive error count of a healthy endpoint. Under the
    /// half-open policy a success on an unhealthy endpoint restores it.
    pub fn report_success(&self, id: EndpointId) {
        let mut health = self.health.lock();
        let Some(entry) = health.get_mut(id.index()) else {
            return;
        };
        entry.probing = false;
        if entry.healthy {
            entry.error_count = 0;
        } else if self.settings.exhaustion_policy == ExhaustionPolicy::HalfOpen {
            info!(
                endpoint = self.endpoints[id.index()].name(),
                "Probe succeeded, endpoint restored"
            );
            entry.restore();
        }
    }

    /// Record a failed call.
    ///
    /// Reaching the error threshold marks the endpoint unhealthy and arms its
    /// recovery deadline. An error on an unhealthy endpoint re-arms the
    /// deadline only when it answers an outstanding half-open probe.
    pub fn report_error(&self, id: EndpointId) {
        let mut health = self.health.lock();
        let Some(entry) = health.get_mut(id.index()) else {
            return;
        };
        entry.error_count = entry.error_count.saturating_add(1);
        let was_probe = std::mem::take(&mut entry.probing);
        let name = self.endpoints[id.index()].name();

        let should_trip = if entry.healthy {
            entry.error_count >= self.settings.error_threshold
        } else {
            // Late errors from calls issued before the trip must not push the
            // recovery deadline back; only a failed probe re-opens.
            was_probe
        };
        if !should_trip {
            debug!(endpoint = name, errors = entry.error_count, "Endpoint error recorded");
            return;
        }

        let deadline = Instant::now() + self.settings.recovery;
        entry.healthy = false;
        entry.recover_at = Some(deadline);
        self.counters.trips.fetch_add(1, Ordering::Relaxed);
        warn!(
            endpoint = name,
            errors = entry.error_count,
            recovery_secs = self.settings.recovery.as_secs(),
            "Endpoint marked unhealthy"
        );
        drop(health);

        schedule_recovery(
            Arc::clone(&self.health),
            id.index(),
            deadline,
            name.to_string(),
        );
    }

    /// Whether an endpoint is currently in rotation.
    pub fn is_healthy(&self, id: EndpointId) -> bool {
        let mut health = self.health.lock();
        sweep_recovered(&mut health, Instant::now());
        health.get(id.index()).is_some_and(|h| h.healthy)
    }

    /// Endpoint by ID.
    pub fn endpoint(&self, id: EndpointId) -> Option<&Endpoint> {
        self.endpoints.get(id.index())
    }

    /// All configured endpoints in table order.
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// ID of the pinned write primary.
    pub const fn write_primary(&self) -> EndpointId {
        self.write_primary
    }

    /// Per-endpoint view for status output.
    pub fn snapshot(&self) -> Vec<EndpointSnapshot> {
        let mut health = self.health.lock();
        sweep_recovered(&mut health, Instant::now());
        self.endpoints
            .iter()
            .zip(health.iter())
            .map(|(e, h)| EndpointSnapshot {
                name: e.name().to_string(),
                url: e.url().to_string(),
                weight: e.weight(),
                healthy: h.healthy,
                error_count: h.error_count,
                request_count: h.request_count,
                last_used_at: h.last_used_at,
                is_write_primary: e.id() == self.write_primary,
            })
            .collect()
    }

    /// Runtime statistics for observability.
    pub fn stats(&self) -> PoolStats {
        let mut health = self.health.lock();
        sweep_recovered(&mut health, Instant::now());
        PoolStats {
            healthy: health.iter().filter(|h| h.healthy).count(),
            total: health.len(),
            trips: self.counters.trips.load(Ordering::Relaxed),
            resets: self.counters.resets.load(Ordering::Relaxed),
            probes: self.counters.probes.load(Ordering::Relaxed),
        }
    }

    fn best_healthy(&self, health: &[EndpointHealth]) -> Option<usize> {
        health
            .iter()
            .enumerate()
            .filter(|(_, h)| h.healthy)
            .min_by_key(|(i, h)| {
                let endpoint = &self.endpoints[*i];
                (
                    h.error_count,
                    std::cmp::Reverse(endpoint.weight()),
                    h.request_count,
                    endpoint.priority(),
                    *i,
                )
            })
            .map(|(i, _)| i)
    }

    /// Pick an endpoint when nothing is healthy.
    fn on_exhausted(&self, health: &mut [EndpointHealth], now: Instant) -> Result<usize> {
        match self.settings.exhaustion_policy {
            ExhaustionPolicy::ResetAll => {
                warn!(
                    endpoints = health.len(),
                    "No healthy endpoints, resetting all to healthy"
                );
                for entry in health.iter_mut() {
                    entry.restore();
                }
                self.counters.resets.fetch_add(1, Ordering::Relaxed);
                // Non-empty table, so a healthy endpoint exists now.
                Ok(self.best_healthy(health).unwrap_or(0))
            }
            ExhaustionPolicy::HalfOpen => {
                let Some(index) = health
                    .iter()
                    .enumerate()
                    .filter(|(_, h)| !h.probing)
                    .min_by_key(|(i, h)| (h.recover_at.unwrap_or(now), *i))
                    .map(|(i, _)| i)
                else {
                    debug!("No healthy endpoints and every probe is in flight");
                    return Err(PoolError::NoHealthyEndpoint.into());
                };
                health[index].probing = true;
                self.counters.probes.fetch_add(1, Ordering::Relaxed);
                info!(
                    endpoint = self.endpoints[index].name(),
                    "No healthy endpoints, admitting half-open probe"
                );
                Ok(index)
            }
        }
    }
}

#[cfg(test)]
mod tests;
