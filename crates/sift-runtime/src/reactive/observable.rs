#![forbid(unsafe_code)]

//! Version-tracked shared values with change notification.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// RAII guard for a registered callback.
///
/// The owning side keeps only a `Weak` reference to the callback; dropping the
/// `Subscription` drops the last strong reference, so the callback is skipped
/// from the next notification on and pruned lazily.
#[must_use = "dropping a Subscription immediately unsubscribes"]
pub struct Subscription {
    _guard: Box<dyn Any>,
}

impl Subscription {
    pub(crate) fn from_guard<G: Any>(guard: G) -> Self {
        Self {
            _guard: Box::new(guard),
        }
    }

    /// Unsubscribe now. Equivalent to dropping the guard.
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

type Callback<T> = dyn Fn(&T);

pub(crate) struct CallbackList<T: ?Sized> {
    entries: Vec<Weak<T>>,
}

impl<T: ?Sized> CallbackList<T> {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, callback: &Rc<T>) {
        self.entries.push(Rc::downgrade(callback));
    }

    /// Live callbacks in registration order. Dead entries are pruned.
    pub(crate) fn snapshot(&mut self) -> Vec<Rc<T>> {
        self.entries.retain(|w| w.strong_count() > 0);
        self.entries.iter().filter_map(Weak::upgrade).collect()
    }

    pub(crate) fn live_count(&self) -> usize {
        self.entries.iter().filter(|w| w.strong_count() > 0).count()
    }
}

struct Inner<T> {
    value: T,
    version: u64,
    subscribers: CallbackList<Callback<T>>,
}

/// A shared value that notifies subscribers when it changes.
///
/// Clones share the same value. Setting a value equal to the current one is a
/// no-op: no version bump, no notification.
pub struct Observable<T> {
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: Clone + PartialEq + std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create an observable holding `value` at version 0.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Inner {
                value,
                version: 0,
                subscribers: CallbackList::new(),
            })),
        }
    }

    /// Clone out the current value.
    #[must_use]
    pub fn get(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value for the duration of `f`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.borrow().value)
    }

    /// Number of changes so far.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Replace the value, notifying subscribers if it changed.
    ///
    /// Subscribers run after the internal borrow is released, so they may read
    /// or even set this observable again.
    pub fn set(&self, value: T) {
        let callbacks = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                return;
            }
            inner.value = value;
            inner.version += 1;
            inner.subscribers.snapshot()
        };
        let current = self.get();
        for cb in callbacks {
            cb(&current);
        }
    }

    /// Mutate in place; notifies only if the result differs from before.
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get();
        f(&mut next);
        self.set(next);
    }

    /// Register a change callback.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let cb: Rc<Callback<T>> = Rc::new(callback);
        self.inner.borrow_mut().subscribers.push(&cb);
        Subscription::from_guard(cb)
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner.borrow().subscribers.live_count()
    }
}
