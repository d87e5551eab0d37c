//! Admission control for outbound calls to the geo service.
//!
//! Every request goes through one [`RequestThrottler`]. A job is dispatched
//! only when fewer than `max_concurrent` jobs are in flight and at least
//! `min_spacing_ms` has passed since the previous dispatch started. The
//! spacing is one shared cadence across all slots, so slow requests can
//! overlap while new ones are still launched at a fixed rate.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::{debug, warn};

fn default_max_concurrent() -> usize {
    3
}
fn default_min_spacing_ms() -> u64 {
    200
}

/// Concurrency and pacing limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrottleConfig {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_min_spacing_ms")]
    pub min_spacing_ms: u64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            min_spacing_ms: default_min_spacing_ms(),
        }
    }
}

impl ThrottleConfig {
    pub fn new(max_concurrent: usize, min_spacing_ms: u64) -> Self {
        Self {
            max_concurrent,
            min_spacing_ms,
        }
    }

    pub fn min_spacing(&self) -> Duration {
        Duration::from_millis(self.min_spacing_ms)
    }
}

/// Point-in-time view of the throttler, for logging and tests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ThrottleStats {
    pub in_flight: usize,
    pub queued: usize,
    pub dispatched: u64,
}

struct PendingJob {
    seq: u64,
    ready: oneshot::Sender<Permit>,
}

/// In-flight count, FIFO queue and last dispatch time.
/// Always read and updated together under one lock.
struct ThrottlerState {
    in_flight: usize,
    queue: VecDeque<PendingJob>,
    last_dispatch: Option<Instant>,
    timer_armed: bool,
    next_seq: u64,
    dispatched: u64,
}

struct Shared {
    config: ThrottleConfig,
    state: Mutex<ThrottlerState>,
}

/// Concurrency-bounded, paced dispatcher for outbound jobs.
///
/// Cheap to clone; clones share the same queue and limits.
#[derive(Clone)]
pub struct RequestThrottler {
    shared: Arc<Shared>,
}

/// Handed to a job when it is dispatched; frees the slot when dropped.
struct Permit {
    shared: Arc<Shared>,
    armed: bool,
}

impl Drop for Permit {
    fn drop(&mut self) {
        if self.armed {
            self.shared.release();
        }
    }
}

impl RequestThrottler {
    /// Create a throttler. A concurrency cap of 0 is treated as 1.
    pub fn new(config: ThrottleConfig) -> Self {
        let config = ThrottleConfig {
            max_concurrent: config.max_concurrent.max(1),
            ..config
        };
        Self {
            shared: Arc::new(Shared {
                config,
                state: Mutex::new(ThrottlerState {
                    in_flight: 0,
                    queue: VecDeque::new(),
                    last_dispatch: None,
                    timer_armed: false,
                    next_seq: 0,
                    dispatched: 0,
                }),
            }),
        }
    }

    pub fn config(&self) -> ThrottleConfig {
        self.shared.config
    }

    pub fn stats(&self) -> ThrottleStats {
        let state = self.shared.lock();
        ThrottleStats {
            in_flight: state.in_flight,
            queued: state.queue.len(),
            dispatched: state.dispatched,
        }
    }

    /// Queue `job` and run it once admitted, returning its output.
    ///
    /// The job is not polled until dispatch. Its outcome, success or
    /// failure, only reaches this caller; either way the slot is freed and
    /// the next queued job is considered straight away. Dropping the
    /// returned future while queued removes the job without dispatching it.
    pub async fn submit<F>(&self, job: F) -> F::Output
    where
        F: Future,
    {
        let ready = self.shared.enqueue();
        // The queue only drops a sender after granting it a permit or seeing
        // the receiver closed, and `&self` keeps the queue alive.
        let _permit = match ready.await {
            Ok(permit) => permit,
            Err(_) => unreachable!("throttler queue dropped a waiting job"),
        };
        job.await
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ThrottlerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(self: &Arc<Self>) -> oneshot::Receiver<Permit> {
        let (tx, rx) = oneshot::channel();
        let mut state = self.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push_back(PendingJob { seq, ready: tx });
        self.pump(&mut state);
        rx
    }

    fn release(self: &Arc<Self>) {
        let mut state = self.lock();
        state.in_flight = state.in_flight.saturating_sub(1);
        self.pump(&mut state);
    }

    fn on_timer(self: &Arc<Self>) {
        let mut state = self.lock();
        state.timer_armed = false;
        self.pump(&mut state);
    }

    /// Dispatch queued jobs for as long as both admission conditions hold.
    fn pump(self: &Arc<Self>, state: &mut ThrottlerState) {
        let spacing = self.config.min_spacing();

        loop {
            if state.in_flight >= self.config.max_concurrent {
                return;
            }
            let Some(front) = state.queue.front() else {
                return;
            };
            if front.ready.is_closed() {
                // caller gave up while queued
                state.queue.pop_front();
                continue;
            }

            let now = Instant::now();
            if let Some(last) = state.last_dispatch {
                let next_allowed = last + spacing;
                if now < next_allowed {
                    self.arm_timer(state, next_allowed);
                    return;
                }
            }

            let Some(job) = state.queue.pop_front() else {
                return;
            };
            let permit = Permit {
                shared: Arc::clone(self),
                armed: true,
            };
            match job.ready.send(permit) {
                Ok(()) => {
                    state.in_flight += 1;
                    state.last_dispatch = Some(now);
                    state.dispatched += 1;
                    debug!(
                        seq = job.seq,
                        in_flight = state.in_flight,
                        queued = state.queue.len(),
                        "dispatched request"
                    );
                }
                Err(mut permit) => {
                    // receiver vanished between the check and the send
                    permit.armed = false;
                }
            }
        }
    }

    fn arm_timer(self: &Arc<Self>, state: &mut ThrottlerState, at: Instant) {
        if state.timer_armed {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!("no async runtime available to schedule paced dispatch");
            return;
        };
        state.timer_armed = true;

        let shared = Arc::clone(self);
        handle.spawn(async move {
            tokio::time::sleep_until(at).await;
            shared.on_timer();
        });
    }
}
