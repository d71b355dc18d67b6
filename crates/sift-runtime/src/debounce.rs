#![forbid(unsafe_code)]

//! Last-trigger-wins debouncing on top of [`TimerQueue`].
//!
//! A [`Debouncer`] owns at most one armed timer. Every
//! [`trigger`](Debouncer::trigger) cancels the previous one and arms a fresh
//! timer for the configured delay, so a burst of triggers separated by less
//! than the delay collapses into a single callback, fired one delay after the
//! last trigger.
//!
//! # Invariants
//!
//! 1. At most one timer armed by this debouncer is pending at any time.
//! 2. A callback superseded by a later trigger, by [`cancel`](Debouncer::cancel)
//!    or by dropping the debouncer never runs.
//! 3. Changing the delay affects only timers armed afterwards.

use std::time::Duration;

use crate::timer::{TimerId, TimerQueue};

/// Default quiet period before a debounced callback fires.
pub const DEFAULT_DELAY: Duration = Duration::from_millis(1000);

/// Coalesces bursts of triggers into one deferred callback.
#[derive(Debug)]
pub struct Debouncer {
    timers: TimerQueue,
    delay: Duration,
    pending: Option<TimerId>,
}

impl Debouncer {
    /// Create a debouncer on `timers` with the given quiet period.
    #[must_use]
    pub fn new(timers: TimerQueue, delay: Duration) -> Self {
        Self {
            timers,
            delay,
            pending: None,
        }
    }

    /// The configured quiet period.
    #[must_use]
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Change the quiet period. An already armed timer keeps its deadline.
    pub fn set_delay(&mut self, delay: Duration) {
        self.delay = delay;
    }

    /// Cancel any armed timer and arm a new one running `callback`.
    pub fn trigger(&mut self, callback: impl FnOnce() + 'static) -> TimerId {
        self.cancel();
        let id = self.timers.schedule(self.delay, callback);
        tracing::debug!(timer = id.id(), delay = ?self.delay, "debounce armed");
        self.pending = Some(id);
        id
    }

    /// Cancel the armed timer. Returns `true` if one was still pending.
    pub fn cancel(&mut self) -> bool {
        match self.pending.take() {
            Some(id) => {
                let cancelled = self.timers.cancel(id);
                if cancelled {
                    tracing::debug!(timer = id.id(), "debounce cancelled");
                }
                cancelled
            }
            None => false,
        }
    }

    /// Whether a callback is armed and has not fired yet.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending.is_some_and(|id| self.timers.is_pending(id))
    }

    /// Deadline of the armed timer, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Duration> {
        self.pending.and_then(|id| self.timers.deadline(id))
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
