//! Settings listener trait and subscription handle

/// Trait for receiving change notifications for one subscription key.
///
/// `value` is the freshly derived value visible at the key, or `None` when
/// the key no longer resolves (e.g. the record was removed).
pub trait SettingsListener<V>: Send + Sync + 'static {
    /// Called when the derived value at the subscribed key has changed.
    fn on_change(&self, value: Option<&V>);
}

/// A simple listener that invokes a closure.
pub struct FnListener<F> {
    f: F,
}

impl<F> FnListener<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<V, F> SettingsListener<V> for FnListener<F>
where
    F: Fn(Option<&V>) + Send + Sync + 'static,
{
    fn on_change(&self, value: Option<&V>) {
        (self.f)(value);
    }
}

/// Handle returned by every `subscribe` call.
///
/// Dropping the handle (or calling [`unsubscribe`](Subscription::unsubscribe))
/// removes exactly this listener; other listeners on the same key are kept.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new<F>(cancel: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Remove the listener now.
    pub fn unsubscribe(mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}
