//! Wrapper Registry
//!
//! Two process-wide tables keep instrumentation identity-preserving:
//!
//! - raw → view: the live view of each raw object (held weakly), so
//!   wrapping the same object twice hands back the same view;
//! - view → raw: every view ever produced and still alive, so a view passed
//!   back in is recognized and returned unchanged instead of wrapped again.
//!
//! A view removes both of its entries when its last handle is dropped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

use super::proxy::{Reactive, ViewInner};
use super::subscriber::TargetId;
use crate::value::{Object, Value};

/// Unique identifier for an instrumented view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

static TO_VIEW: OnceLock<DashMap<TargetId, Weak<ViewInner>>> = OnceLock::new();
static TO_RAW: OnceLock<DashMap<ViewId, TargetId>> = OnceLock::new();

fn view_table() -> &'static DashMap<TargetId, Weak<ViewInner>> {
    TO_VIEW.get_or_init(DashMap::new)
}

fn raw_table() -> &'static DashMap<ViewId, TargetId> {
    TO_RAW.get_or_init(DashMap::new)
}

/// The wrapper registry.
pub struct Registry;

impl Registry {
    /// The view of `raw`, creating it on first use.
    pub fn wrap_raw(raw: Object) -> Reactive {
        let raw_id = raw.id();
        let view = match view_table().entry(raw_id) {
            Entry::Occupied(mut entry) => match entry.get().upgrade() {
                Some(view) => return Reactive::from_inner(view),
                None => {
                    let view = ViewInner::new(raw);
                    entry.insert(Arc::downgrade(&view));
                    view
                }
            },
            Entry::Vacant(entry) => {
                let view = ViewInner::new(raw);
                entry.insert(Arc::downgrade(&view));
                view
            }
        };

        raw_table().insert(view.id(), raw_id);
        trace!(target_id = raw_id.raw(), view = ?view.id(), "wrap");
        Reactive::from_inner(view)
    }

    /// A view handed back in is returned as is.
    pub fn wrap_view(view: Reactive) -> Reactive {
        if raw_table().contains_key(&view.id()) {
            return view;
        }
        // Views register on creation, so this only covers a view whose
        // entry was already released.
        Self::wrap_raw(view.raw().clone())
    }

    /// The raw object behind a registered view.
    pub fn raw_id(view: ViewId) -> Option<TargetId> {
        raw_table().get(&view).map(|entry| *entry)
    }

    /// Whether `view` was produced by the registry and is still alive.
    pub fn is_view(view: ViewId) -> bool {
        raw_table().contains_key(&view)
    }

    /// Whether `raw` currently has a live view.
    pub fn has_view(raw: TargetId) -> bool {
        view_table()
            .get(&raw)
            .map_or(false, |weak| weak.strong_count() > 0)
    }

    /// Number of live views.
    pub fn view_count() -> usize {
        raw_table().len()
    }

    /// Called when the last handle of a view goes away.
    pub(crate) fn release(view: ViewId, raw: TargetId) {
        raw_table().remove(&view);
        // A fresh view may already have replaced the dead entry.
        view_table().remove_if(&raw, |_, weak| weak.strong_count() == 0);
        trace!(target_id = raw.raw(), view = ?view, "release");
    }
}

/// Things that can be turned into a reactive view.
pub trait IntoReactive {
    fn into_reactive(self) -> Reactive;
}

impl IntoReactive for Object {
    fn into_reactive(self) -> Reactive {
        Registry::wrap_raw(self)
    }
}

impl IntoReactive for &Object {
    fn into_reactive(self) -> Reactive {
        Registry::wrap_raw(self.clone())
    }
}

impl IntoReactive for Reactive {
    fn into_reactive(self) -> Reactive {
        Registry::wrap_view(self)
    }
}

impl IntoReactive for &Reactive {
    fn into_reactive(self) -> Reactive {
        Registry::wrap_view(self.clone())
    }
}

/// Instrument an object.
///
/// Idempotent: the same raw object always yields the same view while that
/// view is alive, and a view passed in is returned unchanged. Wrapping is
/// shallow; nested objects are wrapped when read through the view.
pub fn reactive(target: impl IntoReactive) -> Reactive {
    target.into_reactive()
}

/// The raw object behind a view.
pub fn to_raw(view: &Reactive) -> Object {
    view.raw().clone()
}

/// Whether a value holds a registered view.
pub fn is_reactive(value: &Value) -> bool {
    value.as_reactive().map_or(false, |view| Registry::is_view(view.id()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wrapping_is_identity_preserving() {
        let raw = Object::new().with("a", 1);

        let first = reactive(&raw);
        let second = reactive(&raw);
        assert!(first.ptr_eq(&second));
        assert!(Registry::has_view(raw.id()));
    }

    #[test]
    fn wrapping_a_view_returns_it() {
        let view = reactive(Object::new());
        let again = reactive(&view);
        assert!(again.ptr_eq(&view));
        assert_eq!(Registry::raw_id(view.id()), Some(view.raw().id()));
    }

    #[test]
    fn dropped_view_is_released() {
        let raw = Object::new();
        let view = reactive(&raw);
        let view_id = view.id();
        assert!(Registry::is_view(view_id));

        drop(view);
        assert!(!Registry::is_view(view_id));
        assert!(!Registry::has_view(raw.id()));

        // A new view can be created afterwards
        let fresh = reactive(&raw);
        assert_ne!(fresh.id(), view_id);
    }

    #[test]
    fn is_reactive_checks_values() {
        let view = reactive(Object::new());
        assert!(is_reactive(&Value::from(view.clone())));
        assert!(!is_reactive(&Value::from(Object::new())));
        assert!(!is_reactive(&Value::from(1)));
        assert!(to_raw(&view).ptr_eq(view.raw()));
    }
}
