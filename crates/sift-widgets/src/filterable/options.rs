#![forbid(unsafe_code)]

//! Construction options for [`Filterable`](super::Filterable).

use std::rc::Rc;
use std::time::Duration;

use sift_core::{Document, NodeId, Selector};
use sift_runtime::DEFAULT_DELAY;

use super::predicate::{self, ItemView, Predicate, Query};

/// Where the query text comes from.
#[derive(Debug, Clone, Default)]
pub enum InputSource {
    /// Create a text input right before the container and own it.
    #[default]
    Owned,
    /// Every attached element matching the selector, anywhere in the document.
    Selector(Selector),
    /// Explicit elements.
    Nodes(Vec<NodeId>),
}

impl InputSource {
    /// Whether the filterable creates (and later removes) its own input.
    #[must_use]
    pub fn is_owned(&self) -> bool {
        matches!(self, Self::Owned)
    }
}

/// Custom item resolver: `(document, container) -> items`.
pub type ItemResolver = Rc<dyn Fn(&Document, NodeId) -> Vec<NodeId>>;

/// Which elements are tested against the query.
#[derive(Clone, Default)]
pub enum ItemFilter {
    /// Direct children of the container.
    #[default]
    Children,
    /// Descendants of the container matching the selector.
    Selector(Selector),
    /// Caller-supplied resolver.
    Custom(ItemResolver),
}

impl ItemFilter {
    /// Resolve the candidate items. Called afresh on every pass.
    #[must_use]
    pub fn resolve(&self, doc: &Document, container: NodeId) -> Vec<NodeId> {
        match self {
            Self::Children => doc.children(container).to_vec(),
            Self::Selector(sel) => sel.select(doc, container),
            Self::Custom(f) => f(doc, container),
        }
    }
}

impl std::fmt::Debug for ItemFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Children => f.write_str("Children"),
            Self::Selector(sel) => f.debug_tuple("Selector").field(&sel.as_str()).finish(),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Options for a new filterable.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sift_core::Selector;
/// use sift_widgets::filterable::FilterableOptions;
///
/// let opts = FilterableOptions::new()
///     .filter_selector(Selector::parse("li").unwrap())
///     .delay(Duration::from_millis(250));
/// assert_eq!(opts.delay_value(), Duration::from_millis(250));
/// ```
#[derive(Clone)]
pub struct FilterableOptions {
    pub(crate) input: InputSource,
    pub(crate) filter: ItemFilter,
    pub(crate) delay: Duration,
    pub(crate) visible: Predicate,
}

impl Default for FilterableOptions {
    fn default() -> Self {
        Self {
            input: InputSource::Owned,
            filter: ItemFilter::Children,
            delay: DEFAULT_DELAY,
            visible: predicate::regex_match(),
        }
    }
}

impl std::fmt::Debug for FilterableOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterableOptions")
            .field("input", &self.input)
            .field("filter", &self.filter)
            .field("delay", &self.delay)
            .finish_non_exhaustive()
    }
}

impl FilterableOptions {
    /// Defaults: owned input, direct children, 1 s delay, regex predicate.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn input(mut self, input: InputSource) -> Self {
        self.input = input;
        self
    }

    /// Bind to every element matching `selector`.
    #[must_use]
    pub fn input_selector(self, selector: Selector) -> Self {
        self.input(InputSource::Selector(selector))
    }

    /// Bind to explicit input elements.
    #[must_use]
    pub fn inputs(self, nodes: impl IntoIterator<Item = NodeId>) -> Self {
        self.input(InputSource::Nodes(nodes.into_iter().collect()))
    }

    #[must_use]
    pub fn filter(mut self, filter: ItemFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Test descendants of the container matching `selector`.
    #[must_use]
    pub fn filter_selector(self, selector: Selector) -> Self {
        self.filter(ItemFilter::Selector(selector))
    }

    /// Resolve items with a custom function.
    #[must_use]
    pub fn filter_with(self, f: impl Fn(&Document, NodeId) -> Vec<NodeId> + 'static) -> Self {
        self.filter(ItemFilter::Custom(Rc::new(f)))
    }

    /// Quiet period after a keystroke before the filter is reapplied.
    #[must_use]
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    #[must_use]
    pub fn visible(mut self, predicate: Predicate) -> Self {
        self.visible = predicate;
        self
    }

    /// Use a closure as the visibility predicate.
    #[must_use]
    pub fn visible_fn(self, f: impl Fn(&Query, &ItemView<'_>) -> bool + 'static) -> Self {
        self.visible(predicate::from_fn(f))
    }

    #[must_use]
    pub fn input_source(&self) -> &InputSource {
        &self.input
    }

    #[must_use]
    pub fn item_filter(&self) -> &ItemFilter {
        &self.filter
    }

    #[must_use]
    pub fn delay_value(&self) -> Duration {
        self.delay
    }
}
