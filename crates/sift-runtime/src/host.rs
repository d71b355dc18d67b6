#![forbid(unsafe_code)]

//! The host environment widgets are attached to.
//!
//! A [`Host`] bundles the shared [`Document`], the [`TimerQueue`] and the
//! [`ListenerRegistry`]. It is cheap to clone; clones share all three.
//!
//! The `type_text` / `press_enter` / `commit` helpers simulate user input the
//! way a browser would deliver it, which keeps tests and demos terse.

use std::cell::RefCell;
use std::rc::Rc;

use sift_core::{Document, InputEvent, Key, NodeId};

use crate::listeners::ListenerRegistry;
use crate::timer::{Clock, SystemClock, TimerQueue};

/// Shared document, timers and listeners.
#[derive(Debug, Clone)]
pub struct Host {
    document: Rc<RefCell<Document>>,
    timers: TimerQueue,
    listeners: ListenerRegistry,
}

impl Default for Host {
    fn default() -> Self {
        Self::new()
    }
}

impl Host {
    /// An empty document on the system clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(SystemClock::new())
    }

    /// An empty document on the given clock.
    #[must_use]
    pub fn with_clock(clock: impl Clock + 'static) -> Self {
        Self::from_parts(Document::new(), TimerQueue::new(clock))
    }

    /// Wrap an existing document and timer queue.
    #[must_use]
    pub fn from_parts(document: Document, timers: TimerQueue) -> Self {
        Self {
            document: Rc::new(RefCell::new(document)),
            timers,
            listeners: ListenerRegistry::new(),
        }
    }

    /// The shared document.
    #[must_use]
    pub fn document(&self) -> &Rc<RefCell<Document>> {
        &self.document
    }

    /// The shared timer queue.
    #[must_use]
    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    /// The shared listener table.
    #[must_use]
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Deliver `event` to the listeners of `node`.
    pub fn dispatch(&self, node: NodeId, event: InputEvent) -> usize {
        self.listeners.dispatch(node, &event)
    }

    /// Append `text` to the control's value one keystroke at a time.
    pub fn type_text(&self, node: NodeId, text: &str) {
        for c in text.chars() {
            let next = {
                let doc = self.document.borrow();
                let mut v = doc.value(node).to_owned();
                v.push(c);
                v
            };
            if self.document.borrow_mut().set_value(node, next).is_err() {
                return;
            }
            self.dispatch(node, InputEvent::KeyDown(Key::Char(c)));
            self.dispatch(node, InputEvent::KeyPress(Key::Char(c)));
        }
    }

    /// Remove the last character of the control's value, as Backspace would.
    pub fn backspace(&self, node: NodeId) {
        let next = {
            let doc = self.document.borrow();
            let mut v = doc.value(node).to_owned();
            v.pop();
            v
        };
        if self.document.borrow_mut().set_value(node, next).is_ok() {
            self.dispatch(node, InputEvent::KeyDown(Key::Backspace));
        }
    }

    /// Press and release Enter.
    pub fn press_enter(&self, node: NodeId) {
        self.dispatch(node, InputEvent::KeyDown(Key::Enter));
        self.dispatch(node, InputEvent::KeyPress(Key::Enter));
    }

    /// Set the control's value outright and fire a change event.
    pub fn commit(&self, node: NodeId, value: &str) {
        if self.document.borrow_mut().set_value(node, value).is_ok() {
            self.dispatch(node, InputEvent::Change);
        }
    }
}
