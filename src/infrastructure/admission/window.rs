//! Rate windows and throttle state for the admission queue.

use std::time::Duration;

use tokio::time::Instant;

/// Fixed window counter.
///
/// A window opens at the first dispatch after the previous one closed and
/// counts dispatches until `length` has elapsed.
#[derive(Debug, Clone)]
pub(super) struct RateWindow {
    length: Duration,
    started: Option<Instant>,
    count: u32,
}

impl RateWindow {
    pub(super) const fn new(length: Duration) -> Self {
        Self {
            length,
            started: None,
            count: 0,
        }
    }

    /// Close the window if its time is up.
    pub(super) fn roll(&mut self, now: Instant) {
        if let Some(started) = self.started {
            if now >= started + self.length {
                self.started = None;
                self.count = 0;
            }
        }
    }

    pub(super) const fn has_room(&self, limit: u32) -> bool {
        self.count < limit
    }

    pub(super) fn record(&mut self, now: Instant) {
        if self.started.is_none() {
            self.started = Some(now);
        }
        self.count = self.count.saturating_add(1);
    }

    /// Time until the window closes.
    pub(super) fn remaining(&self, now: Instant) -> Duration {
        self.started
            .map(|s| (s + self.length).saturating_duration_since(now))
            .unwrap_or(Duration::ZERO)
    }

    pub(super) const fn count(&self) -> u32 {
        self.count
    }
}

/// System-wide throttle entered after a provider reports rate limiting.
#[derive(Debug, Clone)]
pub(super) struct ThrottleState {
    base: Duration,
    max: Duration,
    cooldown: Duration,
    until: Option<Instant>,
}

impl ThrottleState {
    pub(super) const fn new(base: Duration, max: Duration) -> Self {
        Self {
            base,
            max,
            cooldown: base,
            until: None,
        }
    }

    /// Enter the throttle, or double the cooldown if still throttled at
    /// `now`. A throttle that has already lapsed counts as cleared.
    ///
    /// Returns the cooldown now in force.
    pub(super) fn trip(&mut self, now: Instant) -> Duration {
        if self.blocked_for(now).is_some() {
            self.cooldown = self.cooldown.saturating_mul(2).min(self.max);
        } else {
            self.cooldown = self.base;
        }
        self.until = Some(now + self.cooldown);
        self.cooldown
    }

    /// Remaining throttle time, clearing the throttle once it has expired.
    ///
    /// Returns `None` when dispatch may proceed.
    pub(super) fn blocked_for(&mut self, now: Instant) -> Option<Duration> {
        let until = self.until?;
        if now >= until {
            self.until = None;
            self.cooldown = self.base;
            return None;
        }
        Some(until - now)
    }

    pub(super) fn is_throttled(&self, now: Instant) -> bool {
        self.until.is_some_and(|until| now < until)
    }

    pub(super) const fn cooldown(&self) -> Duration {
        self.cooldown
    }
}
