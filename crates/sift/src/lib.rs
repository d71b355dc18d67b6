#![forbid(unsafe_code)]

//! sift: debounced text filtering over an element tree.
//!
//! This crate re-exports the host primitives ([`primitives`]), the runtime
//! ([`runtime`]) and the widgets ([`widgets`]). Most users only need the
//! [`prelude`].
//!
//! ```
//! use sift::prelude::*;
//!
//! let host = Host::with_clock(ManualClock::new());
//! let list = host.document().borrow_mut().create_element("ul");
//! host.document().borrow_mut().append_root(list).unwrap();
//!
//! let filterable = Filterable::new(&host, list, FilterableOptions::new());
//! assert!(filterable.owns_input());
//! ```

pub use sift_core as primitives;
pub use sift_runtime as runtime;
pub use sift_widgets as widgets;

pub use sift_core::{Document, InputEvent, Key, NodeId, Selector};
pub use sift_runtime::{Host, ManualClock, Subscription, SystemClock};
pub use sift_widgets::{FilterEvent, Filterable, FilterableOptions};

/// Common imports.
pub mod prelude {
    pub use sift_core::{ControlKind, Document, InputEvent, Key, NodeId, Selector};
    pub use sift_runtime::{Host, ManualClock, Observable, Subscription, SystemClock, TimerQueue};
    pub use sift_widgets::filterable::predicate;
    pub use sift_widgets::{
        FilterEvent, FilterStats, Filterable, FilterableOptions, InputSource, ItemFilter,
        ItemView, Query,
    };

    #[cfg(feature = "policy-config")]
    pub use sift_widgets::{FilterableConfig, MatchMode};
}
