#![forbid(unsafe_code)]

//! Host primitives for sift: an arena element tree, a small selector engine
//! and the input events controls receive.

pub mod dom;
pub mod event;
pub mod selector;

pub use dom::{ControlKind, Document, DomError, NodeId};
pub use event::{InputEvent, Key};
pub use selector::{Selector, SelectorError};
