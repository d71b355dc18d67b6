#![forbid(unsafe_code)]

//! Widgets built on the sift runtime.

#[cfg(feature = "policy-config")]
pub mod config;
pub mod filterable;

#[cfg(feature = "policy-config")]
pub use config::{ConfigError, FilterableConfig, MatchMode};
pub use filterable::{
    CONTAINER_CLASS, FILTERED_CLASS, FilterEvent, FilterStats, Filterable, FilterableOptions,
    INPUT_CLASS, InputSource, ItemFilter, ItemResolver, ItemView, Predicate, Query,
};
