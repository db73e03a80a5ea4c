//! Granular publish/subscribe registry
//!
//! One hub exists per key space (setting id, group id, section key). Each
//! watched key remembers the last value delivered to its listeners, and a
//! publish only produces a [`Delivery`] when the newly derived value differs
//! from it. Redundant writes that round-trip to the same value stay silent.

use std::fmt::Display;
use std::hash::Hash;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::{debug, error};

use super::listener::{SettingsListener, Subscription};

struct HubEntry<V> {
    last: Option<V>,
    listeners: Vec<(u64, Arc<dyn SettingsListener<V>>)>,
}

struct HubInner<K, V> {
    kind: &'static str,
    entries: DashMap<K, HubEntry<V>>,
    next_id: AtomicU64,
}

impl<K, V> HubInner<K, V>
where
    K: Eq + Hash + Display,
{
    fn remove(&self, key: &K, listener_id: u64) {
        let now_empty = match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.listeners.retain(|(id, _)| *id != listener_id);
                entry.listeners.is_empty()
            }
            None => return,
        };

        if now_empty {
            self.entries.remove_if(key, |_, entry| entry.listeners.is_empty());
            debug!("Stopped watching {}: {}", self.kind, key);
        }
    }

    fn is_registered(&self, key: &K, listener_id: u64) -> bool {
        self.entries
            .get(key)
            .is_some_and(|entry| entry.listeners.iter().any(|(id, _)| *id == listener_id))
    }
}

/// Keyed subscription registry with value-equality gating.
pub struct SubscriptionHub<K, V> {
    inner: Arc<HubInner<K, V>>,
}

impl<K, V> SubscriptionHub<K, V>
where
    K: Eq + Hash + Clone + Display + Send + Sync + 'static,
    V: Clone + PartialEq + Send + Sync + 'static,
{
    /// Create an empty hub; `kind` only labels log lines.
    pub fn new(kind: &'static str) -> Self {
        Self {
            inner: Arc::new(HubInner {
                kind,
                entries: DashMap::new(),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Register a listener for `key`.
    ///
    /// `current` is the value visible at the key right now; it becomes the
    /// baseline for change detection when the key was not watched yet.
    pub fn subscribe(
        &self,
        key: K,
        current: Option<V>,
        listener: Arc<dyn SettingsListener<V>>,
    ) -> Subscription {
        let listener_id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);

        self.inner
            .entries
            .entry(key.clone())
            .or_insert_with(|| {
                debug!("Started watching {}: {}", self.inner.kind, key);
                HubEntry {
                    last: current,
                    listeners: Vec::new(),
                }
            })
            .listeners
            .push((listener_id, listener));

        let inner = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = inner.upgrade() {
                inner.remove(&key, listener_id);
            }
        })
    }

    /// Whether any listener watches `key`.
    pub fn is_watched(&self, key: &K) -> bool {
        self.inner.entries.contains_key(key)
    }

    /// Number of listeners registered for `key`.
    pub fn listener_count(&self, key: &K) -> usize {
        self.inner
            .entries
            .get(key)
            .map(|entry| entry.listeners.len())
            .unwrap_or(0)
    }

    /// All keys with at least one listener.
    pub fn watched_keys(&self) -> Vec<K> {
        self.inner
            .entries
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }

    /// Record the value now derived at `key`.
    ///
    /// Returns the pending delivery when the value differs from the last one
    /// delivered, `None` when the key is unwatched or unchanged.
    pub fn publish(&self, key: &K, current: Option<V>) -> Option<Delivery<K, V>> {
        let mut entry = self.inner.entries.get_mut(key)?;
        if entry.last == current {
            return None;
        }

        entry.last = current.clone();
        Some(Delivery {
            kind: self.inner.kind,
            key: key.clone(),
            value: current,
            listeners: entry.listeners.clone(),
            hub: Arc::downgrade(&self.inner),
        })
    }
}

/// Notification captured under the store lock and delivered after it is
/// released.
///
/// Listeners are re-checked against the hub right before each call, so one
/// that unsubscribed in the meantime is skipped.
pub struct Delivery<K, V> {
    kind: &'static str,
    key: K,
    value: Option<V>,
    listeners: Vec<(u64, Arc<dyn SettingsListener<V>>)>,
    hub: Weak<HubInner<K, V>>,
}

impl<K, V: 'static> Delivery<K, V>
where
    K: Eq + Hash + Display,
{
    /// Key space label of the hub that produced this delivery.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Invoke every captured listener that is still subscribed, returning how
    /// many returned normally.
    ///
    /// A panicking listener is logged and skipped; the remaining listeners
    /// still run.
    pub fn deliver(self) -> usize {
        let mut delivered = 0;
        for (listener_id, listener) in &self.listeners {
            let registered = self
                .hub
                .upgrade()
                .is_some_and(|hub| hub.is_registered(&self.key, *listener_id));
            if !registered {
                debug!(
                    "Skipping detached listener: kind={}, key={}",
                    self.kind, self.key
                );
                continue;
            }

            let value = self.value.as_ref();
            match catch_unwind(AssertUnwindSafe(|| listener.on_change(value))) {
                Ok(()) => delivered += 1,
                Err(_) => {
                    error!(
                        "Settings listener panicked: kind={}, key={}",
                        self.kind, self.key
                    );
                }
            }
        }
        delivered
    }
}
