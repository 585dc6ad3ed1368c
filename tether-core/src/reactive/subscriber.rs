//! Subscriber types for the reactive system.
//!
//! A Subscriber is any computation that can be re-invoked when data it read
//! changes. Effects and computed values are both subscribers. The dependency
//! store only ever sees them through the [`Subscriber`] trait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::runtime::Dep;

/// Unique identifier for a subscriber.
///
/// Used to keep dependency entries sets (never multisets) and to detect
/// re-entrant runs on the execution stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

/// Identity of something whose properties can be tracked.
///
/// Raw objects and computed values each own one. The dependency store is
/// keyed by `(TargetId, property key)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for TargetId {
    fn default() -> Self {
        Self::new()
    }
}

/// A computation that the dependency store can re-invoke.
pub trait Subscriber: Send + Sync {
    /// Get the subscriber ID.
    fn id(&self) -> SubscriberId;

    /// Computed subscribers are re-invoked before plain ones.
    fn is_computed(&self) -> bool;

    /// Remember a dependency entry this subscriber was added to.
    fn record_dep(&self, dep: Dep);

    /// Re-run after a dependency changed. Called with no store lock held.
    fn notify(self: Arc<Self>);
}
