//! # Subscription Registry
//!
//! Tracks the live listeners for each tag presence event kind.
//!
//! ## Identifiers
//!
//! Ids come from a monotonic atomic counter starting at 1. An id is handed out
//! once and never again, even after its subscription is removed, so a stale
//! handle held by the host can never alias a newer subscription.
//!
//! ## Concurrency
//!
//! The hardware service delivers events from its own thread while the host
//! subscribes and unsubscribes from the application thread. The id counter is
//! an `AtomicU64`; the subscription map sits behind a `parking_lot::Mutex`
//! that is only held for map operations, never while a listener runs.
//!
//! ```
//! use std::sync::Arc;
//! use bridge_traits::tag::EventKind;
//! use core_runtime::subscriptions::SubscriptionRegistry;
//!
//! let registry = SubscriptionRegistry::new();
//! let id = registry.subscribe(EventKind::TagConnected, Arc::new(|_event| Ok(())));
//! assert!(registry.is_active(id));
//!
//! registry.unsubscribe(id);
//! registry.unsubscribe(id); // already gone, no-op
//! assert!(!registry.is_active(id));
//! ```

use bridge_traits::tag::{EventKind, TagEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Outcome of a listener invocation. Errors are logged by the dispatcher and
/// never reach the event source.
pub type ListenerResult = anyhow::Result<()>;

/// Callback invoked for every event of the subscribed kind.
pub type TagListener = Arc<dyn Fn(&TagEvent) -> ListenerResult + Send + Sync>;

/// Opaque subscription handle, always ≥ 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for SubscriptionId {
    /// Rebuilds a handle received back from the host boundary.
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only view of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: SubscriptionId,
    pub event_kind: EventKind,
    pub active: bool,
}

struct Entry {
    kind: EventKind,
    listener: TagListener,
}

/// Owner of all live subscriptions.
pub struct SubscriptionRegistry {
    last_id: AtomicU64,
    entries: Mutex<BTreeMap<SubscriptionId, Entry>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            last_id: AtomicU64::new(0),
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Registers `listener` for `kind` and returns its new id.
    pub fn subscribe(&self, kind: EventKind, listener: TagListener) -> SubscriptionId {
        self.subscribe_with(kind, move |_| listener)
    }

    /// Registers a listener built from its own id.
    ///
    /// Used when the listener has to report which subscription a delivery
    /// belongs to, as the host-boundary forwarders do.
    pub fn subscribe_with<F>(&self, kind: EventKind, make_listener: F) -> SubscriptionId
    where
        F: FnOnce(SubscriptionId) -> TagListener,
    {
        let id = self.next_id();
        let listener = make_listener(id);

        self.entries.lock().insert(id, Entry { kind, listener });
        debug!(subscription = %id, kind = %kind, "Subscription added");
        id
    }

    /// Removes a subscription. Unknown or already removed ids are ignored.
    ///
    /// Returns whether a subscription was removed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let removed = self.entries.lock().remove(&id).is_some();
        if removed {
            debug!(subscription = %id, "Subscription removed");
        }
        removed
    }

    /// Removes a subscription only if it belongs to `kind`.
    pub fn unsubscribe_kind(&self, id: SubscriptionId, kind: EventKind) -> bool {
        let mut entries = self.entries.lock();
        match entries.get(&id) {
            Some(entry) if entry.kind == kind => {
                entries.remove(&id);
                drop(entries);
                debug!(subscription = %id, kind = %kind, "Subscription removed");
                true
            }
            Some(entry) => {
                debug!(
                    subscription = %id,
                    expected = %kind,
                    actual = %entry.kind,
                    "Ignoring removal for subscription of another kind"
                );
                false
            }
            None => false,
        }
    }

    pub fn is_active(&self, id: SubscriptionId) -> bool {
        self.entries.lock().contains_key(&id)
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Subscription> {
        self.entries.lock().get(&id).map(|entry| Subscription {
            id,
            event_kind: entry.kind,
            active: true,
        })
    }

    /// Listeners currently subscribed to `kind`, in subscription order.
    ///
    /// The returned handles are a snapshot: subscriptions added afterwards are
    /// not part of it.
    pub fn snapshot(&self, kind: EventKind) -> Vec<(SubscriptionId, TagListener)> {
        self.entries
            .lock()
            .iter()
            .filter(|(_, entry)| entry.kind == kind)
            .map(|(id, entry)| (*id, Arc::clone(&entry.listener)))
            .collect()
    }

    /// All live subscriptions.
    pub fn subscriptions(&self) -> Vec<Subscription> {
        self.entries
            .lock()
            .iter()
            .map(|(id, entry)| Subscription {
                id: *id,
                event_kind: entry.kind,
                active: true,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn len_of(&self, kind: EventKind) -> usize {
        self.entries
            .lock()
            .values()
            .filter(|entry| entry.kind == kind)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn next_id(&self) -> SubscriptionId {
        SubscriptionId(self.last_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionRegistry")
            .field("last_id", &self.last_id.load(Ordering::SeqCst))
            .field("active", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn noop() -> TagListener {
        Arc::new(|_event| Ok(()))
    }

    #[test]
    fn test_first_id_is_one() {
        let registry = SubscriptionRegistry::new();
        let id = registry.subscribe(EventKind::TagConnected, noop());
        assert_eq!(id.as_u64(), 1);
    }

    #[test]
    fn test_ids_never_reused_after_removal() {
        let registry = SubscriptionRegistry::new();
        let first = registry.subscribe(EventKind::TagConnected, noop());
        registry.unsubscribe(first);

        let second = registry.subscribe(EventKind::TagConnected, noop());
        assert_ne!(first, second);
        assert!(second > first);
        assert!(!registry.is_active(first));
        assert!(registry.is_active(second));
    }

    #[test]
    fn test_unsubscribe_unknown_is_noop() {
        let registry = SubscriptionRegistry::new();
        assert!(!registry.unsubscribe(SubscriptionId::from(42)));

        let id = registry.subscribe(EventKind::TagDisconnected, noop());
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unsubscribe_kind_mismatch_keeps_subscription() {
        let registry = SubscriptionRegistry::new();
        let id = registry.subscribe(EventKind::TagDisconnected, noop());

        assert!(!registry.unsubscribe_kind(id, EventKind::TagConnected));
        assert!(registry.is_active(id));

        assert!(registry.unsubscribe_kind(id, EventKind::TagDisconnected));
        assert!(!registry.is_active(id));
    }

    #[test]
    fn test_snapshot_filters_by_kind() {
        let registry = SubscriptionRegistry::new();
        let a = registry.subscribe(EventKind::TagConnected, noop());
        let _b = registry.subscribe(EventKind::TagDisconnected, noop());
        let c = registry.subscribe(EventKind::TagConnected, noop());

        let ids: Vec<_> = registry
            .snapshot(EventKind::TagConnected)
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(ids, vec![a, c]);
        assert_eq!(registry.len_of(EventKind::TagDisconnected), 1);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_subscribe_with_sees_own_id() {
        let registry = SubscriptionRegistry::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);

        let id = registry.subscribe_with(EventKind::TagConnected, move |id| {
            *seen_clone.lock() = Some(id);
            noop()
        });

        assert_eq!(*seen.lock(), Some(id));
    }

    #[test]
    fn test_get_subscription() {
        let registry = SubscriptionRegistry::new();
        let id = registry.subscribe(EventKind::TagDisconnected, noop());

        let subscription = registry.get(id).unwrap();
        assert_eq!(subscription.event_kind, EventKind::TagDisconnected);
        assert!(subscription.active);

        registry.unsubscribe(id);
        assert!(registry.get(id).is_none());
    }

    #[test]
    fn test_concurrent_subscribe_unique_ids() {
        let registry = Arc::new(SubscriptionRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let kind = if worker % 2 == 0 {
                        EventKind::TagConnected
                    } else {
                        EventKind::TagDisconnected
                    };
                    let mut ids = Vec::new();
                    for i in 0..200 {
                        let id = registry.subscribe(kind, noop());
                        if i % 3 == 0 {
                            registry.unsubscribe(id);
                        }
                        ids.push(id);
                    }
                    ids
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(all.insert(id), "duplicate id {}", id);
            }
        }
        assert_eq!(all.len(), 1600);
    }
}
