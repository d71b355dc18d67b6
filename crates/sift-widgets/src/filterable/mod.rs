#![forbid(unsafe_code)]

//! Debounced text filtering over a container's items.
//!
//! A [`Filterable`] binds one or more input controls to a container element.
//! Whenever the query is (re)applied, every candidate item is tested against
//! the visibility [`Predicate`]; items that fail carry the
//! [`FILTERED_CLASS`] marker, items that pass do not. Only items whose
//! classification flips produce a [`FilterEvent`].
//!
//! Input routing per bound control:
//!
//! | Event | Control | Effect |
//! |-------|---------|--------|
//! | `Change` | any | apply now |
//! | `KeyPress(Enter)` | text input | apply now |
//! | `KeyDown(_)` | text input, textarea | apply after the debounce delay |
//!
//! Applying "now" cancels any armed debounce timer first.
//!
//! # Invariants
//!
//! 1. Right after a completed pass, an item carries [`FILTERED_CLASS`] iff
//!    the predicate rejected it for the query of that pass.
//! 2. At most one debounced pass is pending; a new keystroke replaces it.
//! 3. A pass never overlaps itself. A pass requested from inside a pass (e.g.
//!    by an event subscriber) runs right after the current one finishes.
//! 4. After [`destroy`](Filterable::destroy) every operation is a no-op and no
//!    pending pass will run.
//!
//! # Failure Modes
//!
//! - A panicking predicate aborts the pass; items not yet visited keep their
//!   previous classification. The filterable stays usable.
//! - The predicate runs with the document borrowed; it must not mutate it.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use sift_runtime::{Host, ManualClock};
//! use sift_widgets::filterable::{Filterable, FilterableOptions};
//!
//! let host = Host::with_clock(ManualClock::new());
//! let list = {
//!     let mut doc = host.document().borrow_mut();
//!     let ul = doc.create_element("ul");
//!     doc.append_root(ul).unwrap();
//!     for fruit in ["apple", "banana", "cherry"] {
//!         let li = doc.create_text_element("li", fruit);
//!         doc.append_child(ul, li).unwrap();
//!     }
//!     ul
//! };
//!
//! let filterable = Filterable::new(&host, list, FilterableOptions::new());
//! let input = filterable.inputs()[0];
//! host.type_text(input, "an");
//! host.timers().advance(Duration::from_millis(1000));
//!
//! assert_eq!(filterable.filtered_items().len(), 2);
//! ```

pub mod options;
pub mod predicate;

use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::time::Duration;

use sift_core::{ControlKind, Document, InputEvent, NodeId};
use sift_runtime::{BindingScope, Debouncer, EventStream, Host, Observable, Subscription};

pub use options::{FilterableOptions, InputSource, ItemFilter, ItemResolver};
pub use predicate::{ItemView, Predicate, Query};

/// Marker on the container while a filterable is attached.
pub const CONTAINER_CLASS: &str = "ui-filterable";
/// Marker on every bound input control.
pub const INPUT_CLASS: &str = "ui-filterable-input";
/// Marker on every item currently rejected by the predicate.
pub const FILTERED_CLASS: &str = "ui-filterable-filtered";

/// A classification change of one item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterEvent {
    /// The item stopped matching and is now marked filtered.
    Filtered(NodeId),
    /// The item matches again and is no longer marked filtered.
    Unfiltered(NodeId),
}

impl FilterEvent {
    /// The affected item.
    #[must_use]
    pub const fn item(&self) -> NodeId {
        match *self {
            Self::Filtered(n) | Self::Unfiltered(n) => n,
        }
    }
}

/// Item counts from the last completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FilterStats {
    /// Candidate items tested.
    pub total: usize,
    /// Items rejected by the predicate.
    pub filtered: usize,
}

impl FilterStats {
    /// Items that passed the predicate.
    #[must_use]
    pub const fn visible(&self) -> usize {
        self.total - self.filtered
    }
}

struct Inner {
    host: Host,
    container: NodeId,
    inputs: Vec<NodeId>,
    owns_input: bool,
    filter: ItemFilter,
    predicate: Predicate,
    debouncer: Debouncer,
    listeners: BindingScope,
    events: EventStream<FilterEvent>,
    stats: Observable<FilterStats>,
    evaluating: bool,
    rerun: bool,
    destroyed: bool,
}

impl Inner {
    fn query(&self, doc: &Document) -> Query {
        Query::new(
            self.inputs
                .iter()
                .map(|&n| doc.value(n).to_owned())
                .collect(),
        )
    }

    /// Detach listeners; remove an owned input, unmark external ones.
    fn release_inputs(&mut self) {
        self.listeners.clear();
        let mut doc = self.host.document().borrow_mut();
        for &input in &self.inputs {
            if self.owns_input {
                doc.remove(input);
            } else {
                doc.remove_class(input, INPUT_CLASS);
            }
        }
        tracing::debug!(
            container = %self.container,
            inputs = self.inputs.len(),
            owned = self.owns_input,
            "filterable inputs released"
        );
        self.inputs.clear();
        self.owns_input = false;
    }
}

type Shared = Rc<RefCell<Inner>>;

/// Debounced filter controller bound to one container element.
///
/// Dropping the handle [`destroy`](Self::destroy)s the controller.
pub struct Filterable {
    inner: Shared,
}

impl std::fmt::Debug for Filterable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Filterable")
            .field("container", &inner.container)
            .field("inputs", &inner.inputs)
            .field("owns_input", &inner.owns_input)
            .field("filter", &inner.filter)
            .field("delay", &inner.debouncer.delay())
            .field("destroyed", &inner.destroyed)
            .finish()
    }
}

impl Filterable {
    /// Attach a filterable to `container`.
    ///
    /// Marks the container, resolves or creates the input controls and starts
    /// listening to them. No pass runs until the first input event.
    #[must_use]
    pub fn new(host: &Host, container: NodeId, options: FilterableOptions) -> Self {
        let FilterableOptions {
            input,
            filter,
            delay,
            visible,
        } = options;
        host.document()
            .borrow_mut()
            .add_class(container, CONTAINER_CLASS);
        let inner = Rc::new(RefCell::new(Inner {
            host: host.clone(),
            container,
            inputs: Vec::new(),
            owns_input: false,
            filter,
            predicate: visible,
            debouncer: Debouncer::new(host.timers().clone(), delay),
            listeners: BindingScope::new(),
            events: EventStream::new(),
            stats: Observable::new(FilterStats::default()),
            evaluating: false,
            rerun: false,
            destroyed: false,
        }));
        attach_inputs(&inner, input);
        tracing::debug!(%container, ?delay, "filterable created");
        Self { inner }
    }

    /// Schedule a pass: debounced unless `immediate`.
    pub fn on_input(&self, immediate: bool) {
        on_input(&self.inner, immediate);
    }

    /// Run a pass now. Returns the number of items whose classification
    /// changed (0 when destroyed or when called from inside a pass).
    pub fn evaluate(&self) -> usize {
        evaluate(&self.inner)
    }

    /// Replace the predicate and reapply it immediately.
    pub fn set_predicate(&self, predicate: Predicate) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return;
            }
            inner.predicate = predicate;
        }
        evaluate(&self.inner);
    }

    /// Replace the predicate with a closure and reapply it immediately.
    pub fn set_predicate_fn(&self, f: impl Fn(&Query, &ItemView<'_>) -> bool + 'static) {
        self.set_predicate(predicate::from_fn(f));
    }

    /// Change the debounce delay. A pass already pending keeps its deadline.
    pub fn set_delay(&self, delay: Duration) {
        let mut inner = self.inner.borrow_mut();
        if !inner.destroyed {
            inner.debouncer.set_delay(delay);
        }
    }

    /// Replace the item resolver; takes effect on the next pass.
    pub fn set_filter(&self, filter: ItemFilter) {
        let mut inner = self.inner.borrow_mut();
        if !inner.destroyed {
            inner.filter = filter;
        }
    }

    /// Rebind to a new input source.
    ///
    /// The old inputs lose their listeners. An input this filterable created
    /// is removed from the document; externally supplied inputs stay in place
    /// and only lose the [`INPUT_CLASS`] marker.
    pub fn set_inputs(&self, source: InputSource) {
        {
            let mut inner = self.inner.borrow_mut();
            if inner.destroyed {
                return;
            }
            inner.release_inputs();
        }
        attach_inputs(&self.inner, source);
    }

    /// Same as [`set_inputs`](Self::set_inputs).
    pub fn rebind(&self, source: InputSource) {
        self.set_inputs(source);
    }

    /// Tear down: cancel the pending pass, release the inputs and unmark the
    /// container. Item markers are left as they are. Idempotent.
    pub fn destroy(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.destroyed {
            return;
        }
        inner.destroyed = true;
        inner.debouncer.cancel();
        inner.release_inputs();
        let container = inner.container;
        inner
            .host
            .document()
            .borrow_mut()
            .remove_class(container, CONTAINER_CLASS);
        tracing::debug!(%container, "filterable destroyed");
    }

    /// Receive every [`FilterEvent`].
    pub fn subscribe(&self, handler: impl Fn(&FilterEvent) + 'static) -> Subscription {
        self.inner.borrow().events.subscribe(handler)
    }

    /// Receive the items that become filtered.
    pub fn on_filtered(&self, handler: impl Fn(NodeId) + 'static) -> Subscription {
        self.subscribe(move |event| {
            if let FilterEvent::Filtered(item) = *event {
                handler(item);
            }
        })
    }

    /// Receive the items that become unfiltered.
    pub fn on_unfiltered(&self, handler: impl Fn(NodeId) + 'static) -> Subscription {
        self.subscribe(move |event| {
            if let FilterEvent::Unfiltered(item) = *event {
                handler(item);
            }
        })
    }

    /// Counts from the last completed pass, observable for live summaries.
    #[must_use]
    pub fn stats(&self) -> Observable<FilterStats> {
        self.inner.borrow().stats.clone()
    }

    #[must_use]
    pub fn container(&self) -> NodeId {
        self.inner.borrow().container
    }

    /// Bound input controls in binding order.
    #[must_use]
    pub fn inputs(&self) -> Vec<NodeId> {
        self.inner.borrow().inputs.clone()
    }

    /// Whether the bound input was created by this filterable.
    #[must_use]
    pub fn owns_input(&self) -> bool {
        self.inner.borrow().owns_input
    }

    /// The query as it would be read by a pass right now.
    #[must_use]
    pub fn query(&self) -> Query {
        let inner = self.inner.borrow();
        let doc = inner.host.document().borrow();
        inner.query(&doc)
    }

    #[must_use]
    pub fn delay(&self) -> Duration {
        self.inner.borrow().debouncer.delay()
    }

    /// Whether a debounced pass is waiting to run.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.borrow().debouncer.is_pending()
    }

    #[must_use]
    pub fn is_destroyed(&self) -> bool {
        self.inner.borrow().destroyed
    }

    /// Current candidate items, resolved afresh.
    #[must_use]
    pub fn items(&self) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let doc = inner.host.document().borrow();
        inner.filter.resolve(&doc, inner.container)
    }

    /// Whether `item` currently carries the filtered marker.
    #[must_use]
    pub fn is_filtered(&self, item: NodeId) -> bool {
        let inner = self.inner.borrow();
        let doc = inner.host.document().borrow();
        doc.has_class(item, FILTERED_CLASS)
    }

    /// Current candidate items that carry the filtered marker.
    #[must_use]
    pub fn filtered_items(&self) -> Vec<NodeId> {
        let inner = self.inner.borrow();
        let doc = inner.host.document().borrow();
        inner
            .filter
            .resolve(&doc, inner.container)
            .into_iter()
            .filter(|&n| doc.has_class(n, FILTERED_CLASS))
            .collect()
    }
}

impl Drop for Filterable {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn attach_inputs(shared: &Shared, source: InputSource) {
    let weak = Rc::downgrade(shared);
    let mut inner = shared.borrow_mut();
    let host = inner.host.clone();
    let container = inner.container;
    let mut doc = host.document().borrow_mut();

    let (inputs, owned) = match source {
        InputSource::Owned => {
            let input = doc.create_element("input");
            let _ = doc.set_attr(input, "type", "text");
            if let Err(err) = doc.insert_before(input, container) {
                tracing::warn!(%container, %err, "container is detached, owned input added as a root");
                let _ = doc.append_root(input);
            }
            (vec![input], true)
        }
        InputSource::Selector(sel) => (sel.select_all(&doc), false),
        InputSource::Nodes(nodes) => (
            nodes.into_iter().filter(|&n| doc.exists(n)).collect(),
            false,
        ),
    };

    for &input in &inputs {
        doc.add_class(input, INPUT_CLASS);
        let kind = doc.control_kind(input);
        let weak: Weak<RefCell<Inner>> = weak.clone();
        let sub = host.listeners().on(input, move |event| {
            if let Some(shared) = weak.upgrade() {
                route_event(&shared, kind, event);
            }
        });
        inner.listeners.hold(sub);
    }
    tracing::debug!(%container, inputs = inputs.len(), owned, "filterable inputs bound");
    inner.inputs = inputs;
    inner.owns_input = owned;
}

fn route_event(shared: &Shared, kind: ControlKind, event: &InputEvent) {
    match event {
        InputEvent::Change => on_input(shared, true),
        InputEvent::KeyPress(_) if event.is_enter_press() && kind == ControlKind::TextInput => {
            on_input(shared, true);
        }
        InputEvent::KeyDown(_) if kind.is_text_entry() => on_input(shared, false),
        _ => {}
    }
}

fn on_input(shared: &Shared, immediate: bool) {
    {
        let mut inner = shared.borrow_mut();
        if inner.destroyed {
            return;
        }
        if !immediate {
            let weak = Rc::downgrade(shared);
            inner.debouncer.trigger(move || {
                if let Some(shared) = weak.upgrade() {
                    evaluate(&shared);
                }
            });
            return;
        }
        inner.debouncer.cancel();
    }
    evaluate(shared);
}

/// Resets the re-entrancy flag even if the predicate panics.
struct PassGuard<'a>(&'a Shared);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.0.borrow_mut();
        inner.evaluating = false;
        inner.rerun = false;
    }
}

struct Pass {
    host: Host,
    container: NodeId,
    items: Vec<NodeId>,
    query: Query,
    predicate: Predicate,
    events: EventStream<FilterEvent>,
    stats: Observable<FilterStats>,
}

fn evaluate(shared: &Shared) -> usize {
    {
        let mut inner = shared.borrow_mut();
        if inner.destroyed {
            return 0;
        }
        if inner.evaluating {
            inner.rerun = true;
            return 0;
        }
        inner.evaluating = true;
    }
    let _guard = PassGuard(shared);

    let mut changed = 0;
    loop {
        let Some(pass) = prepare_pass(shared) else {
            break;
        };
        changed += run_pass(shared, &pass);
        let mut inner = shared.borrow_mut();
        if inner.destroyed || !inner.rerun {
            break;
        }
        inner.rerun = false;
    }
    changed
}

fn prepare_pass(shared: &Shared) -> Option<Pass> {
    let inner = shared.borrow();
    if inner.destroyed {
        return None;
    }
    let doc = inner.host.document().borrow();
    Some(Pass {
        host: inner.host.clone(),
        container: inner.container,
        items: inner.filter.resolve(&doc, inner.container),
        query: inner.query(&doc),
        predicate: Rc::clone(&inner.predicate),
        events: inner.events.clone(),
        stats: inner.stats.clone(),
    })
}

fn run_pass(shared: &Shared, pass: &Pass) -> usize {
    let _span = tracing::debug_span!(
        "filter_pass",
        container = %pass.container,
        items = pass.items.len(),
        query = pass.query.text()
    )
    .entered();

    let document = pass.host.document();
    let mut filtered = 0;
    let mut changed = 0;
    for &item in &pass.items {
        if shared.borrow().destroyed {
            tracing::debug!("filterable destroyed mid-pass");
            return changed;
        }
        let visible = {
            let doc = document.borrow();
            (pass.predicate)(&pass.query, &ItemView::new(&doc, item))
        };
        let transition = {
            let mut doc = document.borrow_mut();
            if visible {
                doc.remove_class(item, FILTERED_CLASS)
                    .then_some(FilterEvent::Unfiltered(item))
            } else {
                filtered += 1;
                doc.add_class(item, FILTERED_CLASS)
                    .then_some(FilterEvent::Filtered(item))
            }
        };
        if let Some(event) = transition {
            tracing::trace!(?event, "item classification changed");
            changed += 1;
            pass.events.emit(&event);
        }
    }
    pass.stats.set(FilterStats {
        total: pass.items.len(),
        filtered,
    });
    tracing::debug!(filtered, changed, "filter pass complete");
    changed
}
