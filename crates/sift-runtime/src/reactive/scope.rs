#![forbid(unsafe_code)]

//! Grouped subscription lifetimes.

use super::observable::Subscription;

/// Owns the subscriptions of one widget binding.
///
/// Listeners, observers and stream handlers registered for the same owner go
/// into one scope so they can be released together, either explicitly with
/// [`clear`](Self::clear) or when the scope is dropped. Release happens in
/// reverse registration order.
#[derive(Default)]
pub struct BindingScope {
    held: Vec<Subscription>,
}

impl BindingScope {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep `sub` alive as long as this scope.
    pub fn hold(&mut self, sub: Subscription) {
        self.held.push(sub);
    }

    /// Number of held subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.held.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.held.is_empty()
    }

    /// Release everything now; the scope can be reused afterwards. Returns
    /// how many subscriptions were released.
    pub fn clear(&mut self) -> usize {
        let released = self.held.len();
        while let Some(sub) = self.held.pop() {
            drop(sub);
        }
        released
    }
}

impl Extend<Subscription> for BindingScope {
    fn extend<I: IntoIterator<Item = Subscription>>(&mut self, iter: I) {
        self.held.extend(iter);
    }
}

impl Drop for BindingScope {
    fn drop(&mut self) {
        self.clear();
    }
}

impl std::fmt::Debug for BindingScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BindingScope")
            .field("held", &self.held.len())
            .finish()
    }
}
