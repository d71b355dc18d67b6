#![forbid(unsafe_code)]

//! Change-tracking primitives.
//!
//! - [`Observable`]: a shared, version-tracked value with change callbacks.
//! - [`EventStream`]: a value-less typed event channel.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`BindingScope`]: holds a group of subscriptions for one owner.
//!
//! # Architecture
//!
//! Everything is single-threaded (`Rc<RefCell<..>>`). Owners keep `Weak`
//! callback pointers; the strong side lives in the [`Subscription`], so
//! dropping the guard is all it takes to disconnect. Dead entries are pruned
//! lazily at the next notification.
//!
//! # Invariants
//!
//! 1. Subscribers are notified in registration order.
//! 2. No internal borrow is held while a callback runs; callbacks may read,
//!    write, subscribe or unsubscribe freely.
//! 3. Setting an `Observable` to an equal value is a no-op.

pub mod observable;
pub mod scope;
pub mod stream;

pub use observable::{Observable, Subscription};
pub use scope::BindingScope;
pub use stream::EventStream;
