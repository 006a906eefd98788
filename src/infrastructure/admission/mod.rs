//! Priority-aware admission control for outbound provider calls.
//!
//! Every remote call goes through [`AdmissionQueue::schedule`]. The queue
//! enforces:
//!
//! - a per-second and a per-minute ceiling on dispatches (fixed windows),
//! - a ceiling on calls in flight at once,
//! - a bounded backlog that rejects with [`AdmissionError::QueueFull`],
//! - a system-wide throttle after a provider reports rate limiting, whose
//!   cooldown doubles while rate limiting keeps being reported.
//!
//! `Critical` calls skip the backlog and run immediately. They are counted in
//! the rate windows but are not held back by any ceiling or by the throttle,
//! so the rate and concurrency ceilings bind queued calls only. A burst of
//! critical calls can push `per_second`, `per_minute` and `in_flight` past
//! their configured limits.
//! `High` calls run before any `Normal` or `Low` call; within a class order
//! is first-in first-out.
//!
//! A single drain task moves calls from the backlog into execution. It is
//! woken when a call is enqueued or finishes and otherwise sleeps until the
//! blocking window or throttle expires.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::domain::Priority;
use crate::error::{AdmissionError, Error, Result};
use crate::infrastructure::config::AdmissionConfig;

mod state;
mod window;

use state::{Job, Next, PendingCall, QueueState};

/// Point-in-time view of the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionStats {
    /// Calls waiting in the backlog.
    pub pending: usize,
    /// Calls running, critical ones included.
    ///
    /// Critical calls ignore the concurrency ceiling, so this can exceed
    /// `max_concurrent_requests`.
    pub in_flight: usize,
    /// Dispatches in the current one-second window, critical ones included.
    ///
    /// Can exceed `max_requests_per_second` when critical calls bypass the
    /// ceiling; queued calls never push it past the limit.
    pub per_second: u32,
    /// Dispatches in the current one-minute window, critical ones included.
    /// Same caveat as `per_second`.
    pub per_minute: u32,
    /// Whether the rate-limit throttle is active.
    pub throttled: bool,
    /// Cooldown that applies to the current or next throttle.
    pub cooldown: Duration,
    /// Calls dispatched since creation.
    pub dispatched: u64,
    /// Calls rejected because the backlog was full.
    pub rejected: u64,
    /// Rate-limit responses observed.
    pub rate_limited: u64,
}

struct Inner {
    config: AdmissionConfig,
    state: Mutex<QueueState>,
    wake: Notify,
}

impl Inner {
    /// Note a rate-limit response and enter or extend the throttle.
    fn on_rate_limited(&self) {
        let mut state = self.state.lock();
        state.rate_limited += 1;
        if !self.config.adaptive_throttling {
            debug!("Rate limit reported, adaptive throttling disabled");
            return;
        }
        let cooldown = state.throttle.trip(Instant::now());
        warn!(
            cooldown_ms = cooldown.as_millis() as u64,
            "Provider rate limit reported, throttling dispatch"
        );
    }
}

/// Releases a concurrency slot when the call completes, panics included.
struct SlotGuard {
    inner: Arc<Inner>,
    critical: bool,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        {
            let mut state = self.inner.state.lock();
            if self.critical {
                state.critical_in_flight = state.critical_in_flight.saturating_sub(1);
            } else {
                state.in_flight = state.in_flight.saturating_sub(1);
            }
        }
        self.inner.wake.notify_one();
    }
}

/// Admission queue shared by every outbound call.
///
/// Ceilings bind queued calls. [`Priority::Critical`] calls are counted in the
/// rate windows but never wait, so they may exceed the configured limits.
pub struct AdmissionQueue {
    inner: Arc<Inner>,
    drain: Mutex<Option<JoinHandle<()>>>,
}

impl AdmissionQueue {
    /// Create a queue. The drain task starts on first use or on [`start`].
    ///
    /// [`start`]: Self::start
    pub fn new(config: AdmissionConfig) -> Self {
        let state = QueueState::new(&config);
        Self {
            inner: Arc::new(Inner {
                config,
                state: Mutex::new(state),
                wake: Notify::new(),
            }),
            drain: Mutex::new(None),
        }
    }

    /// Spawn the drain task if it is not running yet.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) {
        let mut drain = self.drain.lock();
        if drain.is_some() || self.inner.state.lock().closed {
            return;
        }
        let inner = Arc::clone(&self.inner);
        *drain = Some(tokio::spawn(drain_loop(inner)));
        debug!(
            per_second = self.inner.config.max_requests_per_second,
            per_minute = self.inner.config.max_requests_per_minute,
            concurrency = self.inner.config.max_concurrent_requests,
            "Admission queue started"
        );
    }

    /// Run `call` once the queue admits it and return its result.
    ///
    /// # Errors
    ///
    /// Returns [`AdmissionError::QueueFull`] when the backlog is at capacity,
    /// [`AdmissionError::Closed`] after shutdown, or the call's own error.
    /// A rate-limited call error also trips the throttle before it is
    /// returned.
    pub async fn schedule<F, Fut, T>(&self, priority: Priority, call: F) -> Result<T>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        self.start();

        let (tx, rx) = oneshot::channel::<Result<T>>();
        let inner = Arc::clone(&self.inner);
        let job: Job = Box::new(move || {
            Box::pin(async move {
                let result = call().await;
                if matches!(&result, Err(err) if err.is_rate_limited()) {
                    inner.on_rate_limited();
                }
                let _ = tx.send(result);
            })
        });

        if priority.bypasses_queue() {
            self.run_critical(job)?;
        } else {
            self.enqueue(job, priority)?;
        }

        rx.await.map_err(|_| Error::from(AdmissionError::Closed))?
    }

    /// Current queue state.
    pub fn stats(&self) -> AdmissionStats {
        let mut state = self.inner.state.lock();
        let now = Instant::now();
        let (per_second, per_minute) = state.window_counts(now);
        // Clears a throttle that lapsed while the backlog was empty.
        let _ = state.throttle.blocked_for(now);
        AdmissionStats {
            pending: state.pending(),
            in_flight: state.in_flight + state.critical_in_flight,
            per_second,
            per_minute,
            throttled: state.throttle.is_throttled(now),
            cooldown: state.throttle.cooldown(),
            dispatched: state.dispatched,
            rejected: state.rejected,
            rate_limited: state.rate_limited,
        }
    }

    /// Reject new calls and drop the backlog.
    ///
    /// Calls already running finish normally. Callers waiting in the backlog
    /// receive [`AdmissionError::Closed`].
    pub async fn shutdown(&self) {
        let dropped = {
            let mut state = self.inner.state.lock();
            state.closed = true;
            state.clear()
        };
        self.inner.wake.notify_one();
        let handle = self.drain.lock().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
        info!(dropped, "Admission queue shut down");
    }

    fn enqueue(&self, job: Job, priority: Priority) -> Result<()> {
        let mut state = self.inner.state.lock();
        if state.closed {
            return Err(AdmissionError::Closed.into());
        }
        let capacity = self.inner.config.max_pending;
        if state.pending() >= capacity {
            state.rejected += 1;
            warn!(capacity, %priority, "Admission backlog full, rejecting call");
            return Err(AdmissionError::QueueFull { capacity }.into());
        }
        state.push(PendingCall {
            job,
            priority,
            enqueued_at: Instant::now(),
        });
        drop(state);
        self.inner.wake.notify_one();
        Ok(())
    }

    fn run_critical(&self, job: Job) -> Result<()> {
        {
            let mut state = self.inner.state.lock();
            if state.closed {
                return Err(AdmissionError::Closed.into());
            }
            state.record_dispatch(Instant::now());
            state.critical_in_flight += 1;
        }
        spawn_job(Arc::clone(&self.inner), job, true);
        Ok(())
    }
}

impl Drop for AdmissionQueue {
    fn drop(&mut self) {
        if let Some(handle) = self.drain.lock().take() {
            handle.abort();
        }
    }
}

fn spawn_job(inner: Arc<Inner>, job: Job, critical: bool) {
    let guard = SlotGuard { inner, critical };
    tokio::spawn(async move {
        let _guard = guard;
        job().await;
    });
}

async fn drain_loop(inner: Arc<Inner>) {
    let poll = inner.config.poll_interval();
    loop {
        let next = inner.state.lock().next(&inner.config, Instant::now());
        match next {
            Next::Dispatch(call) => {
                debug!(
                    priority = %call.priority,
                    waited_ms = call.enqueued_at.elapsed().as_millis() as u64,
                    "Dispatching call"
                );
                spawn_job(Arc::clone(&inner), call.job, false);
            }
            // Enqueue, completion and shutdown all notify.
            Next::Idle => inner.wake.notified().await,
            Next::Wait(wait) => {
                let wait = if wait.is_zero() { poll } else { wait.min(poll) };
                tokio::select! {
                    () = inner.wake.notified() => {}
                    () = tokio::time::sleep(wait) => {}
                }
            }
            Next::Stop => break,
        }
    }
    debug!("Admission drain loop stopped");
}
