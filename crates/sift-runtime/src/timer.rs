#![forbid(unsafe_code)]

//! Single-shot deferred callbacks over a pluggable clock.
//!
//! [`TimerQueue`] is the host's only scheduling primitive. It never spawns
//! threads: timers fire when the host drives the queue via
//! [`run_due`](TimerQueue::run_due), [`advance`](TimerQueue::advance) or
//! [`run_until_idle`](TimerQueue::run_until_idle).
//!
//! # Invariants
//!
//! 1. Timers fire in deadline order; ties fire in scheduling order.
//! 2. A cancelled timer never fires.
//! 3. No internal borrow is held while a callback runs, so callbacks may
//!    schedule or cancel timers (including re-arming themselves).
//! 4. With a [`ManualClock`], `advance` moves the clock to each timer's
//!    deadline before firing it, so callbacks observe the exact fire time.
//!
//! # Failure Modes
//!
//! - Cancelling an unknown or already-fired timer returns `false`.
//! - Deadlines saturate at `Duration::MAX`: a huge delay parks the timer
//!   instead of overflowing.
//! - A callback that re-arms itself with a zero delay keeps `run_due` busy;
//!   callers driving such timers should use `advance` with a bound.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::Duration;

use ahash::AHashMap;
use web_time::Instant;

/// A monotonic time source, measured from an arbitrary origin.
pub trait Clock {
    /// Time elapsed since the clock's origin.
    fn now(&self) -> Duration;

    /// Move a virtual clock forward to `to`. Real clocks return `false`.
    fn jump_to(&self, _to: Duration) -> bool {
        false
    }
}

/// Wall-clock time via [`web_time::Instant`].
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    #[must_use]
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// A virtual clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// A clock at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move the clock forward by `by` without firing anything.
    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get().saturating_add(by));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn jump_to(&self, to: Duration) -> bool {
        if to > self.now.get() {
            self.now.set(to);
        }
        true
    }
}

/// Handle to a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// Raw sequence number.
    #[inline]
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }
}

type TimerCallback = Box<dyn FnOnce()>;

struct State {
    next_seq: u64,
    // (deadline, seq) orders by deadline, FIFO within a deadline.
    queue: BTreeMap<(Duration, u64), TimerCallback>,
    deadlines: AHashMap<TimerId, Duration>,
}

/// Shared queue of pending timers. Clones share the same queue.
#[derive(Clone)]
pub struct TimerQueue {
    clock: Rc<dyn Clock>,
    state: Rc<RefCell<State>>,
}

impl std::fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueue")
            .field("now", &self.now())
            .field("pending", &self.pending_count())
            .finish()
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new(SystemClock::new())
    }
}

impl TimerQueue {
    /// Create a queue driven by `clock`.
    #[must_use]
    pub fn new(clock: impl Clock + 'static) -> Self {
        Self::with_shared_clock(Rc::new(clock))
    }

    /// Create a queue over an already shared clock.
    #[must_use]
    pub fn with_shared_clock(clock: Rc<dyn Clock>) -> Self {
        Self {
            clock,
            state: Rc::new(RefCell::new(State {
                next_seq: 1,
                queue: BTreeMap::new(),
                deadlines: AHashMap::new(),
            })),
        }
    }

    /// Current clock reading.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    /// Run `callback` once, `delay` from now.
    pub fn schedule(&self, delay: Duration, callback: impl FnOnce() + 'static) -> TimerId {
        let deadline = self.now().saturating_add(delay);
        let mut state = self.state.borrow_mut();
        let seq = state.next_seq;
        state.next_seq += 1;
        let id = TimerId(seq);
        state.queue.insert((deadline, seq), Box::new(callback));
        state.deadlines.insert(id, deadline);
        tracing::trace!(timer = seq, ?delay, ?deadline, "timer scheduled");
        id
    }

    /// Cancel a pending timer. Returns `true` if it had not fired yet.
    pub fn cancel(&self, id: TimerId) -> bool {
        let mut state = self.state.borrow_mut();
        let Some(deadline) = state.deadlines.remove(&id) else {
            return false;
        };
        state.queue.remove(&(deadline, id.0));
        tracing::trace!(timer = id.0, "timer cancelled");
        true
    }

    /// Whether `id` is still waiting to fire.
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.state.borrow().deadlines.contains_key(&id)
    }

    /// Deadline of a pending timer.
    #[must_use]
    pub fn deadline(&self, id: TimerId) -> Option<Duration> {
        self.state.borrow().deadlines.get(&id).copied()
    }

    /// Number of pending timers.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.state.borrow().deadlines.len()
    }

    /// Earliest pending deadline.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state
            .borrow()
            .queue
            .first_key_value()
            .map(|(&(deadline, _), _)| deadline)
    }

    /// Pop the earliest timer if it is due at `at`.
    fn pop_due(&self, at: Duration) -> Option<(u64, TimerCallback)> {
        let mut state = self.state.borrow_mut();
        let (&(deadline, seq), _) = state.queue.first_key_value()?;
        if deadline > at {
            return None;
        }
        let callback = state.queue.remove(&(deadline, seq))?;
        state.deadlines.remove(&TimerId(seq));
        Some((seq, callback))
    }

    /// Fire every timer whose deadline has passed. Returns how many fired.
    pub fn run_due(&self) -> usize {
        let mut fired = 0;
        while let Some((seq, callback)) = self.pop_due(self.now()) {
            tracing::debug!(timer = seq, "timer fired");
            callback();
            fired += 1;
        }
        fired
    }

    /// Let `by` elapse, firing everything that becomes due on the way.
    ///
    /// With a virtual clock each timer fires with the clock set to its own
    /// deadline; timers scheduled by callbacks inside the window fire too. With
    /// a real clock this sleeps for `by` and then runs whatever is due.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        if !self.clock.jump_to(self.now()) {
            std::thread::sleep(by);
            return self.run_due();
        }
        let mut fired = 0;
        while let Some(deadline) = self.next_deadline().filter(|&d| d <= target) {
            self.clock.jump_to(deadline);
            if let Some((seq, callback)) = self.pop_due(deadline) {
                tracing::debug!(timer = seq, ?deadline, "timer fired");
                callback();
                fired += 1;
            }
        }
        self.clock.jump_to(target);
        fired
    }

    /// Fire timers until none remain, waiting for each deadline.
    pub fn run_until_idle(&self) -> usize {
        let mut fired = 0;
        while let Some(deadline) = self.next_deadline() {
            let now = self.now();
            if deadline > now && !self.clock.jump_to(deadline) {
                std::thread::sleep(deadline - now);
            }
            fired += self.run_due();
        }
        fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn manual() -> (ManualClock, TimerQueue) {
        let clock = ManualClock::new();
        let queue = TimerQueue::new(clock.clone());
        (clock, queue)
    }

    #[test]
    fn fires_at_deadline_not_before() {
        let (_clock, timers) = manual();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        timers.schedule(ms(100), move || f.set(true));

        assert_eq!(timers.advance(ms(99)), 0);
        assert!(!fired.get());
        assert_eq!(timers.advance(ms(1)), 1);
        assert!(fired.get());
        assert_eq!(timers.pending_count(), 0);
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let (_clock, timers) = manual();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        let id = timers.schedule(ms(10), move || f.set(true));
        assert!(timers.is_pending(id));
        assert!(timers.cancel(id));
        assert!(!timers.cancel(id), "second cancel is a no-op");
        timers.advance(ms(100));
        assert!(!fired.get());
    }

    #[test]
    fn fires_in_deadline_then_fifo_order() {
        let (_clock, timers) = manual();
        let log = Rc::new(RefCell::new(Vec::new()));
        for (name, delay) in [("c", 30), ("a", 10), ("b1", 20), ("b2", 20)] {
            let l = Rc::clone(&log);
            timers.schedule(ms(delay), move || l.borrow_mut().push(name));
        }
        timers.advance(ms(30));
        assert_eq!(*log.borrow(), vec!["a", "b1", "b2", "c"]);
    }

    #[test]
    fn callbacks_observe_their_own_deadline() {
        let (clock, timers) = manual();
        let seen = Rc::new(RefCell::new(Vec::new()));
        for delay in [5, 15] {
            let s = Rc::clone(&seen);
            let c = clock.clone();
            timers.schedule(ms(delay), move || s.borrow_mut().push(c.now()));
        }
        timers.advance(ms(50));
        assert_eq!(*seen.borrow(), vec![ms(5), ms(15)]);
        assert_eq!(clock.now(), ms(50));
    }

    #[test]
    fn callback_may_reschedule_within_window() {
        let (clock, timers) = manual();
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let q = timers.clone();
        timers.schedule(ms(10), move || {
            h.set(h.get() + 1);
            let h2 = Rc::clone(&h);
            q.schedule(ms(10), move || h2.set(h2.get() + 1));
        });
        assert_eq!(timers.advance(ms(25)), 2);
        assert_eq!(hits.get(), 2);
        assert_eq!(clock.now(), ms(25));
    }

    #[test]
    fn run_due_only_fires_past_deadlines() {
        let (clock, timers) = manual();
        timers.schedule(ms(10), || {});
        timers.schedule(ms(20), || {});
        clock.advance(ms(15));
        assert_eq!(timers.run_due(), 1);
        assert_eq!(timers.next_deadline(), Some(ms(20)));
    }

    #[test]
    fn run_until_idle_drains_virtual_queue() {
        let (clock, timers) = manual();
        timers.schedule(ms(1000), || {});
        timers.schedule(ms(5), || {});
        assert_eq!(timers.run_until_idle(), 2);
        assert_eq!(clock.now(), ms(1000));
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn system_clock_short_timer() {
        let timers = TimerQueue::default();
        let fired = Rc::new(Cell::new(false));
        let f = Rc::clone(&fired);
        timers.schedule(ms(1), move || f.set(true));
        assert_eq!(timers.run_until_idle(), 1);
        assert!(fired.get());
    }

    #[test]
    fn deadline_reports_absolute_time() {
        let (clock, timers) = manual();
        clock.advance(ms(7));
        let id = timers.schedule(ms(3), || {});
        assert_eq!(timers.deadline(id), Some(ms(10)));
        assert_eq!(id.id(), 1);
    }

    #[test]
    fn huge_delay_saturates_instead_of_overflowing() {
        let (clock, timers) = manual();
        clock.advance(ms(5));
        let id = timers.schedule(Duration::MAX, || {});
        assert_eq!(timers.deadline(id), Some(Duration::MAX));
        assert_eq!(timers.advance(ms(1000)), 0);
        assert!(timers.is_pending(id));
        assert!(timers.cancel(id));
    }
}
