#![forbid(unsafe_code)]

//! Fire-and-forget typed event streams.

use std::cell::RefCell;
use std::rc::Rc;

use super::observable::{CallbackList, Subscription};

type Handler<E> = dyn Fn(&E);

/// A typed event channel with any number of subscribers.
///
/// Unlike [`Observable`](super::Observable), a stream holds no current value:
/// every [`emit`](Self::emit) is delivered, even if identical to the last one.
pub struct EventStream<E> {
    handlers: Rc<RefCell<CallbackList<Handler<E>>>>,
}

impl<E> Clone for EventStream<E> {
    fn clone(&self) -> Self {
        Self {
            handlers: Rc::clone(&self.handlers),
        }
    }
}

impl<E> std::fmt::Debug for EventStream<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStream")
            .field("subscribers", &self.handlers.borrow().live_count())
            .finish()
    }
}

impl<E: 'static> Default for EventStream<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> EventStream<E> {
    /// Create a stream with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Rc::new(RefCell::new(CallbackList::new())),
        }
    }

    /// Register a handler; it stays active while the returned guard lives.
    pub fn subscribe(&self, handler: impl Fn(&E) + 'static) -> Subscription {
        let h: Rc<Handler<E>> = Rc::new(handler);
        self.handlers.borrow_mut().push(&h);
        Subscription::from_guard(h)
    }

    /// Deliver `event` to every live handler in registration order.
    ///
    /// Returns the number of handlers invoked. Handlers registered during
    /// delivery see the next event, not this one.
    pub fn emit(&self, event: &E) -> usize {
        let handlers = self.handlers.borrow_mut().snapshot();
        for h in &handlers {
            h(event);
        }
        handlers.len()
    }

    /// Number of live handlers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.handlers.borrow().live_count()
    }
}
