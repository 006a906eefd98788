use std::collections::VecDeque;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::time::Instant;

use crate::domain::Priority;
use crate::infrastructure::config::AdmissionConfig;

use super::window::{RateWindow, ThrottleState};

/// Deferred call: building the future is what starts the work.
pub(super) type Job = Box<dyn FnOnce() -> BoxFuture<'static, ()> + Send>;

pub(super) struct PendingCall {
    pub(super) job: Job,
    pub(super) priority: Priority,
    pub(super) enqueued_at: Instant,
}

/// What the drain loop should do next.
pub(super) enum Next {
    /// Run this call now.
    Dispatch(PendingCall),
    /// Nothing to do until something is enqueued or finishes.
    Idle,
    /// Work is waiting on a window, the throttle or the ceiling.
    Wait(Duration),
    /// Queue closed and empty.
    Stop,
}

/// Everything the queue mutates under its lock.
pub(super) struct QueueState {
    high: VecDeque<PendingCall>,
    normal: VecDeque<PendingCall>,
    per_second: RateWindow,
    per_minute: RateWindow,
    pub(super) throttle: ThrottleState,
    /// Queued calls currently running.
    pub(super) in_flight: usize,
    /// Critical calls currently running; outside the ceiling.
    pub(super) critical_in_flight: usize,
    pub(super) closed: bool,
    pub(super) dispatched: u64,
    pub(super) rejected: u64,
    pub(super) rate_limited: u64,
}

impl QueueState {
    pub(super) fn new(config: &AdmissionConfig) -> Self {
        Self {
            high: VecDeque::new(),
            normal: VecDeque::new(),
            per_second: RateWindow::new(Duration::from_secs(1)),
            per_minute: RateWindow::new(Duration::from_secs(60)),
            throttle: ThrottleState::new(config.cooldown(), config.max_cooldown()),
            in_flight: 0,
            critical_in_flight: 0,
            closed: false,
            dispatched: 0,
            rejected: 0,
            rate_limited: 0,
        }
    }

    pub(super) fn pending(&self) -> usize {
        self.high.len() + self.normal.len()
    }

    /// High calls go ahead of every normal and low call; within a class
    /// order is arrival order.
    pub(super) fn push(&mut self, call: PendingCall) {
        match call.priority {
            Priority::High | Priority::Critical => self.high.push_back(call),
            Priority::Normal | Priority::Low => self.normal.push_back(call),
        }
    }

    /// Drop every queued call; their callers observe a closed queue.
    pub(super) fn clear(&mut self) -> usize {
        let dropped = self.pending();
        self.high.clear();
        self.normal.clear();
        dropped
    }

    /// Count a dispatch against both windows.
    pub(super) fn record_dispatch(&mut self, now: Instant) {
        self.per_second.roll(now);
        self.per_minute.roll(now);
        self.per_second.record(now);
        self.per_minute.record(now);
        self.dispatched += 1;
    }

    pub(super) fn window_counts(&mut self, now: Instant) -> (u32, u32) {
        self.per_second.roll(now);
        self.per_minute.roll(now);
        (self.per_second.count(), self.per_minute.count())
    }

    /// Decide the next step for the drain loop and, when a call may run,
    /// take it off the queue with its slot already reserved.
    pub(super) fn next(&mut self, config: &AdmissionConfig, now: Instant) -> Next {
        if self.pending() == 0 {
            return if self.closed { Next::Stop } else { Next::Idle };
        }
        if let Some(wait) = self.throttle.blocked_for(now) {
            return Next::Wait(wait);
        }
        if self.in_flight >= config.max_concurrent_requests {
            return Next::Idle;
        }

        self.per_second.roll(now);
        self.per_minute.roll(now);
        if !self.per_second.has_room(config.max_requests_per_second) {
            return Next::Wait(self.per_second.remaining(now));
        }
        if !self.per_minute.has_room(config.max_requests_per_minute) {
            return Next::Wait(self.per_minute.remaining(now));
        }

        let Some(call) = self.high.pop_front().or_else(|| self.normal.pop_front()) else {
            return Next::Idle;
        };
        self.record_dispatch(now);
        self.in_flight += 1;
        Next::Dispatch(call)
    }
}
