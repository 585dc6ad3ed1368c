//! Computed Implementation
//!
//! A Computed is a derived value backed by a lazy, computed-priority
//! effect.
//!
//! # How Computeds Work
//!
//! 1. Nothing runs on creation.
//!
//! 2. Every call to [`Computed::value`] re-runs the backing effect and
//!    returns its result. Reads inside the body subscribe the backing
//!    effect, not the caller.
//!
//! 3. The caller (if an effect is running) is subscribed to the computed's
//!    own `"value"` key instead. When a dependency of the body is written,
//!    the backing effect is re-invoked ahead of plain effects and then
//!    triggers `"value"`, so effects reading the computed run after it.
//!
//! Values are recomputed on every read; there is no cache to invalidate.

use std::fmt;

use super::effect::Effect;
use super::runtime::Runtime;
use super::subscriber::TargetId;

/// Property key under which readers of a computed are subscribed.
pub const VALUE_KEY: &str = "value";

/// A derived value.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(Object::new().with("count", 0));
///
/// let view = state.clone();
/// let doubled = computed(move || view.get_as::<i64>("count").unwrap_or(0) * 2);
///
/// state.set("count", 3);
/// assert_eq!(doubled.value(), Some(6));
/// ```
///
/// The handle keeps the computed subscribed: once every clone is dropped
/// its readers are no longer re-run.
#[must_use = "dropping the handle unsubscribes the computed"]
pub struct Computed<T> {
    id: TargetId,
    effect: Effect<T>,
}

impl<T: 'static> Computed<T> {
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let id = TargetId::new();
        Self {
            id,
            effect: Effect::computed_source(func, id),
        }
    }

    /// Recompute and return the value.
    ///
    /// Returns `None` only when read from inside its own computation.
    pub fn value(&self) -> Option<T> {
        Runtime::track(self.id, VALUE_KEY);
        self.effect.run()
    }
}

impl<T> Computed<T> {
    /// The target readers of this value subscribe to.
    pub fn id(&self) -> TargetId {
        self.id
    }

    /// The backing effect.
    pub fn effect(&self) -> &Effect<T> {
        &self.effect
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            effect: self.effect.clone(),
        }
    }
}

impl<T> fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id)
            .field("effect", &self.effect)
            .finish()
    }
}

/// Create a computed value.
#[must_use = "dropping the handle unsubscribes the computed"]
pub fn computed<T, F>(func: F) -> Computed<T>
where
    T: 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Computed::new(func)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    use crate::reactive::{effect, reactive};
    use crate::value::Object;

    #[test]
    fn computed_is_lazy() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let c = computed(move || {
            call_count_clone.fetch_add(1, Ordering::SeqCst);
            42
        });

        assert_eq!(call_count.load(Ordering::SeqCst), 0);
        assert!(c.effect().is_lazy());
        assert!(c.effect().is_computed());

        assert_eq!(c.value(), Some(42));
        assert_eq!(call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn every_read_recomputes() {
        let call_count = Arc::new(AtomicI32::new(0));
        let call_count_clone = call_count.clone();

        let c = computed(move || call_count_clone.fetch_add(1, Ordering::SeqCst) + 1);

        assert_eq!(c.value(), Some(1));
        assert_eq!(c.value(), Some(2));
        assert_eq!(c.value(), Some(3));
    }

    #[test]
    fn computed_follows_reactive_state() {
        let state = reactive(Object::new().with("count", 0));

        let view = state.clone();
        let doubled = computed(move || view.get_as::<i64>("count").unwrap_or(0) * 2);

        state.set("count", 3);
        assert_eq!(doubled.value(), Some(6));
    }

    #[test]
    fn readers_rerun_after_computed() {
        let state = reactive(Object::new().with("count", 1));

        let view = state.clone();
        let doubled = computed(move || view.get_as::<i64>("count").unwrap_or(0) * 2);

        let seen = Arc::new(AtomicI32::new(0));
        let seen_clone = seen.clone();
        let reader = doubled.clone();
        let _effect = effect(move || {
            let v = reader.value().unwrap_or(-1);
            seen_clone.store(v as i32, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(Runtime::subscriber_count(doubled.id(), VALUE_KEY), 1);

        state.set("count", 5);
        assert_eq!(seen.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn dropping_backing_effect_evicts_entries() {
        let state = reactive(Object::new().with("count", 1));
        let view = state.clone();
        let c = computed(move || view.get("count"));

        let reader = c.clone();
        let outer = effect(move || {
            reader.value();
        });
        let id = c.id();
        assert!(Runtime::is_tracked(id));

        drop(outer);
        drop(c);
        assert!(!Runtime::is_tracked(id));
    }
}
