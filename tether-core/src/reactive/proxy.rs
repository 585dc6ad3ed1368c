//! Instrumentation Layer
//!
//! A [`Reactive`] view stands in for a raw [`Object`]. Every property access
//! goes through it:
//!
//! - **read** fetches the raw value, records the running effect as a
//!   dependent of `(object, key)`, and wraps object-valued results, so
//!   nested structures become reactive the first time they are reached;
//! - **write** remembers the old value, writes through, and re-invokes the
//!   dependents of `(object, key)` before returning;
//! - **delete** removes the raw property and nothing else. Dependents of a
//!   deleted key are not re-run.
//!
//! Rust has no implicit property hooks, so the interception is an explicit
//! accessor interface: [`PropertyAccess`], implemented both by views and
//! by raw objects (the latter without any tracking).

use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;

use super::registry::{reactive, Registry, ViewId};
use super::runtime::{Runtime, TriggerInfo};
use crate::error::ValueError;
use crate::value::{Object, Value};

/// Uniform property access for raw objects and reactive views.
pub trait PropertyAccess {
    /// Read a property; `None` if absent.
    fn get(&self, key: &str) -> Option<Value>;

    /// Write a property. Returns whether the write was accepted.
    fn set(&self, key: &str, value: Value) -> bool;

    /// Delete a property. Returns whether the deletion was accepted.
    fn delete(&self, key: &str) -> bool;

    /// Untracked membership test.
    fn has(&self, key: &str) -> bool;
}

pub(crate) struct ViewInner {
    id: ViewId,
    raw: Object,
}

impl ViewInner {
    pub(crate) fn new(raw: Object) -> Arc<Self> {
        Arc::new(Self {
            id: ViewId::new(),
            raw,
        })
    }

    pub(crate) fn id(&self) -> ViewId {
        self.id
    }
}

impl Drop for ViewInner {
    fn drop(&mut self) {
        Registry::release(self.id, self.raw.id());
    }
}

/// An instrumented view of a raw object.
///
/// Cloning yields another handle to the same view. Obtain one with
/// [`reactive`](super::reactive).
#[derive(Clone)]
pub struct Reactive {
    inner: Arc<ViewInner>,
}

impl Reactive {
    pub(crate) fn from_inner(inner: Arc<ViewInner>) -> Self {
        Self { inner }
    }

    pub fn id(&self) -> ViewId {
        self.inner.id
    }

    /// The raw object this view is bound to.
    pub fn raw(&self) -> &Object {
        &self.inner.raw
    }

    /// Whether both handles refer to the same view.
    pub fn ptr_eq(&self, other: &Reactive) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Read a property and subscribe the running effect to it.
    ///
    /// The key is tracked even when absent, so a later write that creates
    /// it re-runs the reader.
    pub fn get(&self, key: &str) -> Option<Value> {
        let value = self.inner.raw.get(key);
        Runtime::track(self.inner.raw.id(), key);
        value.map(wrap_nested)
    }

    /// Read a property without subscribing to it.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.inner.raw.get(key).map(wrap_nested)
    }

    /// Tracked read converted to a Rust type. An absent key reads as null.
    pub fn get_as<T>(&self, key: &str) -> crate::Result<T>
    where
        T: TryFrom<Value, Error = ValueError>,
    {
        T::try_from(self.get(key).unwrap_or_default())
    }

    /// Write a property and re-run its dependents.
    ///
    /// Dependents are re-invoked even if the raw object refused the write;
    /// the return value reports whether it was accepted.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> bool {
        let raw = &self.inner.raw;
        let new_value = value.into();

        let (accepted, old_value) = match raw.replace(key.to_owned(), new_value.clone()) {
            Ok(old_value) => (true, old_value),
            Err(_) => (false, raw.get(key)),
        };

        Runtime::trigger(
            raw.id(),
            key,
            &TriggerInfo {
                old_value,
                new_value: Some(new_value),
            },
        );
        accepted
    }

    /// Delete a property. Dependents of the key are not notified.
    pub fn delete(&self, key: &str) -> bool {
        self.inner.raw.delete(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.raw.has(key)
    }

    /// Untracked key listing, in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.raw.keys()
    }
}

fn wrap_nested(value: Value) -> Value {
    match value {
        Value::Object(object) => Value::Reactive(reactive(object)),
        other => other,
    }
}

impl PropertyAccess for Reactive {
    fn get(&self, key: &str) -> Option<Value> {
        Reactive::get(self, key)
    }

    fn set(&self, key: &str, value: Value) -> bool {
        Reactive::set(self, key, value)
    }

    fn delete(&self, key: &str) -> bool {
        Reactive::delete(self, key)
    }

    fn has(&self, key: &str) -> bool {
        Reactive::has(self, key)
    }
}

impl PropertyAccess for Object {
    fn get(&self, key: &str) -> Option<Value> {
        Object::get(self, key)
    }

    fn set(&self, key: &str, value: Value) -> bool {
        Object::set(self, key, value)
    }

    fn delete(&self, key: &str) -> bool {
        Object::delete(self, key)
    }

    fn has(&self, key: &str) -> bool {
        Object::has(self, key)
    }
}

impl PartialEq for Reactive {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Reactive {}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.id())
            .field("raw", self.raw())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
