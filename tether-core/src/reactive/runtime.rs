//! Dependency Store
//!
//! The runtime is the process-wide store that connects reads to writes. It
//! maps `target → property key → set of subscribers`.
//!
//! # How It Works
//!
//! 1. When a reactive property is read while a subscriber is running,
//!    [`Runtime::track`] adds that subscriber to the entry for
//!    `(target, key)` and hands the entry back to the subscriber so it can
//!    unlink itself later.
//!
//! 2. When the property is written, [`Runtime::trigger`] snapshots the
//!    entry, splits it into computed and plain subscribers, and re-invokes
//!    all computed subscribers before any plain one. Plain effects that read
//!    a computed value therefore see it after it has re-run.
//!
//! 3. When a target is dropped, its entries are evicted.
//!
//! The two-phase fan-out is not a topological sort: diamond-shaped graphs
//! can re-run a downstream effect more than once.
//!
//! # Thread Safety
//!
//! Entries live in a `DashMap`, subscriber sets behind a `parking_lot`
//! mutex. Neither is held while a subscriber runs, so subscribers are free
//! to read and write reactive state (nested triggers recurse synchronously).
//! Sets hold weak references: dropping every handle to an effect ends its
//! subscriptions, and the effect unlinks itself from each set on drop.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use dashmap::DashMap;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tracing::{debug, trace};

use super::context::ReactiveContext;
use super::subscriber::{Subscriber, SubscriberId, TargetId};
use crate::value::Value;

/// Old and new value of a write, passed along with a trigger.
#[derive(Debug, Clone, Default)]
pub struct TriggerInfo {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// A dependency entry: the subscriber set for one `(target, key)` pair.
///
/// Cloning shares the set. Insertion order is kept, so subscribers within a
/// group are re-invoked in the order they first subscribed.
#[derive(Clone, Default)]
pub struct Dep {
    subscribers: Arc<Mutex<IndexMap<SubscriberId, Weak<dyn Subscriber>>>>,
}

impl Dep {
    /// Add a subscriber. Returns `false` if it was already present.
    pub fn insert(&self, subscriber: &Arc<dyn Subscriber>) -> bool {
        let mut set = self.subscribers.lock();
        if set.contains_key(&subscriber.id()) {
            return false;
        }
        set.insert(subscriber.id(), Arc::downgrade(subscriber));
        true
    }

    pub fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().shift_remove(&id).is_some()
    }

    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    /// Number of live subscribers.
    pub fn len(&self) -> usize {
        self.subscribers
            .lock()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether both handles share one set.
    pub fn ptr_eq(&self, other: &Dep) -> bool {
        Arc::ptr_eq(&self.subscribers, &other.subscribers)
    }

    /// Entries held, dead ones included.
    #[cfg(test)]
    pub(crate) fn stored_len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Live subscribers, pruning the dead ones.
    fn snapshot(&self) -> Vec<Arc<dyn Subscriber>> {
        let mut set = self.subscribers.lock();
        set.retain(|_, weak| weak.strong_count() > 0);
        set.values().filter_map(Weak::upgrade).collect()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dep").field("len", &self.len()).finish()
    }
}

type KeyMap = HashMap<String, Dep>;

/// The dependency store.
///
/// This is a singleton: every target in the process shares it.
pub struct Runtime;

static TARGETS: OnceLock<DashMap<TargetId, KeyMap>> = OnceLock::new();

fn targets() -> &'static DashMap<TargetId, KeyMap> {
    TARGETS.get_or_init(DashMap::new)
}

impl Runtime {
    /// Record that the active subscriber depends on `(target, key)`.
    ///
    /// No-op when nothing is running. A subscriber joins each entry once;
    /// only the first join is appended to its deps list.
    pub fn track(target: TargetId, key: &str) {
        let Some(active) = ReactiveContext::current() else {
            return;
        };

        let dep = {
            let mut key_map = targets().entry(target).or_default();
            match key_map.get(key) {
                Some(dep) => dep.clone(),
                None => {
                    let dep = Dep::default();
                    key_map.insert(key.to_owned(), dep.clone());
                    dep
                }
            }
        };

        if dep.insert(&active) {
            trace!(target_id = target.raw(), key, subscriber = ?active.id(), "track");
            active.record_dep(dep);
        }
    }

    /// Re-invoke every subscriber of `(target, key)`, computed ones first.
    ///
    /// A panicking subscriber is not caught; it unwinds to the writer and
    /// the remaining subscribers do not run.
    pub fn trigger(target: TargetId, key: &str, info: &TriggerInfo) {
        let dep = targets()
            .get(&target)
            .and_then(|key_map| key_map.get(key).cloned());

        let Some(dep) = dep else {
            trace!(target_id = target.raw(), key, "trigger without subscribers");
            return;
        };

        let (computed, plain): (Vec<_>, Vec<_>) =
            dep.snapshot().into_iter().partition(|sub| sub.is_computed());

        debug!(
            target_id = target.raw(),
            key,
            computed = computed.len(),
            plain = plain.len(),
            old_value = ?info.old_value,
            new_value = ?info.new_value,
            "trigger"
        );

        for subscriber in computed.into_iter().chain(plain) {
            subscriber.notify();
        }
    }

    /// Drop every entry recorded for `target`.
    pub fn evict(target: TargetId) {
        if let Some((_, key_map)) = targets().remove(&target) {
            trace!(target_id = target.raw(), keys = key_map.len(), "evict");
        }
    }

    /// Number of live subscribers of `(target, key)`.
    pub fn subscriber_count(target: TargetId, key: &str) -> usize {
        targets()
            .get(&target)
            .and_then(|key_map| key_map.get(key).map(Dep::len))
            .unwrap_or(0)
    }

    /// The dependency entry for `(target, key)`, if one was ever created.
    pub fn dep(target: TargetId, key: &str) -> Option<Dep> {
        targets()
            .get(&target)
            .and_then(|key_map| key_map.get(key).cloned())
    }

    /// Keys of `target` that have an entry, sorted.
    pub fn tracked_keys(target: TargetId) -> Vec<String> {
        let mut keys: Vec<String> = targets()
            .get(&target)
            .map(|key_map| key_map.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        keys
    }

    /// Whether the store holds any entry for `target`.
    pub fn is_tracked(target: TargetId) -> bool {
        targets().contains_key(&target)
    }
}
