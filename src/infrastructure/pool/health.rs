//! Recovery bookkeeping for unhealthy endpoints.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::domain::EndpointHealth;

/// Restore every endpoint whose recovery deadline has passed.
///
/// Runs on every pool access so recovery holds even when no runtime timer
/// could be scheduled.
pub(super) fn sweep_recovered(health: &mut [EndpointHealth], now: Instant) {
    for entry in health.iter_mut() {
        if let Some(deadline) = entry.recover_at {
            if !entry.healthy && deadline <= now {
                entry.restore();
            }
        }
    }
}

/// Arm the recovery timer for one trip.
///
/// The timer only restores the endpoint if the deadline it was armed for is
/// still current; a reset or a newer trip supersedes it.
pub(super) fn schedule_recovery(
    health: Arc<Mutex<Vec<EndpointHealth>>>,
    index: usize,
    deadline: Instant,
    name: String,
) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        debug!(endpoint = %name, "No runtime, recovery deferred to next access");
        return;
    };
    handle.spawn(async move {
        tokio::time::sleep_until(deadline).await;
        let mut health = health.lock();
        if let Some(entry) = health.get_mut(index) {
            if !entry.healthy && entry.recover_at == Some(deadline) {
                entry.restore();
                info!(endpoint = %name, "Endpoint recovered after cooldown");
            }
        }
    });
}
