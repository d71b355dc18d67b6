#![forbid(unsafe_code)]

//! Per-node input listeners.
//!
//! Listeners are registered against a [`NodeId`] and stay attached while the
//! returned [`Subscription`] lives. [`ListenerRegistry::dispatch`] delivers an
//! [`InputEvent`] to the live listeners of one node, in registration order,
//! with no internal borrow held.
//!
//! A node's entry is removed once its last listener is released, so
//! rebinding to fresh nodes does not grow the table.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use ahash::AHashMap;
use sift_core::{InputEvent, NodeId};

use crate::reactive::Subscription;
use crate::reactive::observable::CallbackList;

type Listener = dyn Fn(&InputEvent);
type Table = RefCell<AHashMap<NodeId, CallbackList<Listener>>>;

/// Shared table of input listeners. Clones share the same table.
#[derive(Clone, Default)]
pub struct ListenerRegistry {
    by_node: Rc<Table>,
}

/// Keeps one listener alive; prunes the node entry when it goes.
struct ListenerGuard {
    node: NodeId,
    listener: Option<Rc<Listener>>,
    table: Weak<Table>,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        drop(self.listener.take());
        let Some(table) = self.table.upgrade() else {
            return;
        };
        // Busy only while `on` or `dispatch` hold it; `dispatch` prunes too.
        let Ok(mut table) = table.try_borrow_mut() else {
            return;
        };
        if table.get(&self.node).is_some_and(|l| l.live_count() == 0) {
            table.remove(&self.node);
        }
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("nodes", &self.by_node.borrow().len())
            .finish()
    }
}

impl ListenerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Listen for input events on `node`.
    pub fn on(&self, node: NodeId, listener: impl Fn(&InputEvent) + 'static) -> Subscription {
        let l: Rc<Listener> = Rc::new(listener);
        self.by_node
            .borrow_mut()
            .entry(node)
            .or_insert_with(CallbackList::new)
            .push(&l);
        Subscription::from_guard(ListenerGuard {
            node,
            listener: Some(l),
            table: Rc::downgrade(&self.by_node),
        })
    }

    /// Number of nodes with at least one registered listener.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.by_node.borrow().len()
    }

    /// Number of live listeners on `node`.
    #[must_use]
    pub fn listener_count(&self, node: NodeId) -> usize {
        self.by_node
            .borrow()
            .get(&node)
            .map_or(0, CallbackList::live_count)
    }

    /// Deliver `event` to the listeners of `node`. Returns how many ran.
    pub fn dispatch(&self, node: NodeId, event: &InputEvent) -> usize {
        let listeners = {
            let mut table = self.by_node.borrow_mut();
            let Some(list) = table.get_mut(&node) else {
                return 0;
            };
            let live = list.snapshot();
            if live.is_empty() {
                table.remove(&node);
            }
            live
        };
        tracing::trace!(%node, ?event, listeners = listeners.len(), "input event dispatched");
        for l in &listeners {
            l(event);
        }
        listeners.len()
    }
}
