#![forbid(unsafe_code)]

//! Single-threaded host runtime for sift.
//!
//! - [`timer`]: single-shot deferred callbacks over a pluggable clock.
//! - [`debounce`]: last-trigger-wins coalescing on top of the timer queue.
//! - [`listeners`]: per-node input listeners.
//! - [`reactive`]: observables, event streams and subscription guards.
//! - [`host`]: the bundle of document, timers and listeners widgets attach to.
//!
//! Nothing here is `Send`; the host event loop drives everything serially.

pub mod debounce;
pub mod host;
pub mod listeners;
pub mod reactive;
pub mod timer;

pub use debounce::{DEFAULT_DELAY, Debouncer};
pub use host::Host;
pub use listeners::ListenerRegistry;
pub use reactive::{BindingScope, EventStream, Observable, Subscription};
pub use timer::{Clock, ManualClock, SystemClock, TimerId, TimerQueue};
