use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use proptest::prelude::*;
use sift_runtime::{Debouncer, ManualClock, TimerQueue};

fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

#[test]
fn timers_fire_in_deadline_then_schedule_order() {
    let timers = TimerQueue::new(ManualClock::new());
    let order = Rc::new(RefCell::new(Vec::new()));
    for (label, delay) in [("c", 30), ("a", 10), ("b", 10), ("d", 0)] {
        let o = Rc::clone(&order);
        timers.schedule(ms(delay), move || o.borrow_mut().push(label));
    }
    timers.run_until_idle();
    assert_eq!(*order.borrow(), vec!["d", "a", "b", "c"]);
}

#[test]
fn debouncer_dropped_with_pending_timer_never_fires() {
    let timers = TimerQueue::new(ManualClock::new());
    let fired = Rc::new(RefCell::new(false));
    {
        let mut debouncer = Debouncer::new(timers.clone(), ms(50));
        let f = Rc::clone(&fired);
        debouncer.trigger(move || *f.borrow_mut() = true);
    }
    timers.advance(ms(100));
    assert!(!*fired.borrow());
}

proptest! {
    #[test]
    fn advance_observes_each_deadline(delays in proptest::collection::vec(0u64..500, 1..16)) {
        let timers = TimerQueue::new(ManualClock::new());
        let seen = Rc::new(RefCell::new(Vec::new()));
        for &d in &delays {
            let s = Rc::clone(&seen);
            let clock = timers.clone();
            timers.schedule(ms(d), move || s.borrow_mut().push((d, clock.now())));
        }
        prop_assert_eq!(timers.advance(ms(500)), delays.len());
        for &(d, at) in seen.borrow().iter() {
            prop_assert_eq!(at, ms(d));
        }
        prop_assert_eq!(timers.now(), ms(500));
    }

    #[test]
    fn last_trigger_wins(triggers in proptest::collection::vec(0u64..99, 1..20)) {
        let timers = TimerQueue::new(ManualClock::new());
        let mut debouncer = Debouncer::new(timers.clone(), ms(100));
        let fired = Rc::new(RefCell::new(Vec::new()));
        for (i, gap) in triggers.iter().enumerate() {
            timers.advance(ms(*gap));
            let f = Rc::clone(&fired);
            debouncer.trigger(move || f.borrow_mut().push(i));
        }
        let last_at = timers.now();
        timers.run_until_idle();
        prop_assert_eq!(fired.borrow().clone(), vec![triggers.len() - 1]);
        prop_assert_eq!(timers.now(), last_at + ms(100));
    }
}
