//! Raw objects.
//!
//! An [`Object`] is a cheaply cloneable handle to a shared property map.
//! All clones refer to the same object; identity (not contents) is what
//! the reactive layer keys on.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::Value;
use crate::error::ValueError;
use crate::reactive::{Runtime, TargetId};

/// A raw, uninstrumented object.
///
/// Reads and writes on an `Object` are never tracked. Wrap it with
/// [`reactive`](crate::reactive::reactive) to observe it.
#[derive(Clone)]
pub struct Object {
    inner: Arc<ObjectInner>,
}

struct ObjectInner {
    id: TargetId,
    props: RwLock<IndexMap<String, Value>>,
    frozen: AtomicBool,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        // Dependency entries are keyed by identity and die with the object.
        Runtime::evict(self.id);
    }
}

impl Object {
    /// Create an empty object.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ObjectInner {
                id: TargetId::new(),
                props: RwLock::new(IndexMap::new()),
                frozen: AtomicBool::new(false),
            }),
        }
    }

    /// Builder-style insert, for literals.
    pub fn with(self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inner.props.write().insert(key.into(), value.into());
        self
    }

    /// The identity key used by the dependency store.
    pub fn id(&self) -> TargetId {
        self.inner.id
    }

    /// Whether both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Object) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.props.read().get(key).cloned()
    }

    /// Write a property. Returns `false` if the object is frozen.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) -> bool {
        self.replace(key.into(), value.into()).is_ok()
    }

    /// Write a property and hand back the previous value.
    ///
    /// On a frozen object nothing is written and the rejected value is
    /// returned as the error.
    pub(crate) fn replace(&self, key: String, value: Value) -> Result<Option<Value>, Value> {
        if self.is_frozen() {
            return Err(value);
        }
        Ok(self.inner.props.write().insert(key, value))
    }

    /// Remove a property. Removing an absent key succeeds; a frozen object
    /// refuses every deletion.
    pub fn delete(&self, key: &str) -> bool {
        if self.is_frozen() {
            return false;
        }
        // Keep the removed value alive past the guard.
        let _removed = self.inner.props.write().shift_remove(key);
        true
    }

    pub fn has(&self, key: &str) -> bool {
        self.inner.props.read().contains_key(key)
    }

    /// Property names in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.inner.props.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.inner.props.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.props.read().is_empty()
    }

    /// Make every later write or delete fail.
    pub fn freeze(&self) {
        self.inner.frozen.store(true, Ordering::SeqCst);
    }

    pub fn is_frozen(&self) -> bool {
        self.inner.frozen.load(Ordering::SeqCst)
    }

    /// Parse a JSON document whose top level is an object.
    pub fn parse(json: &str) -> crate::Result<Self> {
        Self::from_json(serde_json::from_str(json)?)
    }

    /// Build an object graph from JSON. Nested JSON objects become nested
    /// raw objects.
    pub fn from_json(json: serde_json::Value) -> crate::Result<Self> {
        match json {
            serde_json::Value::Object(map) => Self::from_json_map(map),
            other => Err(ValueError::NotAnObject(json_kind(&other))),
        }
    }

    pub(super) fn from_json_map(map: serde_json::Map<String, serde_json::Value>) -> crate::Result<Self> {
        let mut props = IndexMap::with_capacity(map.len());
        for (key, value) in map {
            props.insert(key, Value::from_json(value)?);
        }
        let object = Self::new();
        *object.inner.props.write() = props;
        Ok(object)
    }

    /// Snapshot the object graph as JSON. Views are serialized through their
    /// raw objects; nothing is tracked.
    pub fn to_json(&self) -> crate::Result<serde_json::Value> {
        self.to_json_inner(&mut HashSet::new())
    }

    fn to_json_inner(&self, path: &mut HashSet<TargetId>) -> crate::Result<serde_json::Value> {
        if !path.insert(self.id()) {
            return Err(ValueError::Cycle);
        }
        let entries: Vec<(String, Value)> = self
            .inner
            .props
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut map = serde_json::Map::with_capacity(entries.len());
        for (key, value) in entries {
            let json = match value {
                Value::Null => serde_json::Value::Null,
                Value::Bool(b) => serde_json::Value::Bool(b),
                Value::Int(i) => serde_json::Value::from(i),
                Value::Float(f) => serde_json::Number::from_f64(f)
                    .map(serde_json::Value::Number)
                    .ok_or(ValueError::UnsupportedJson("non-finite float"))?,
                Value::Str(s) => serde_json::Value::String(s.to_string()),
                Value::Object(o) => o.to_json_inner(path)?,
                Value::Reactive(r) => r.raw().to_json_inner(path)?,
            };
            map.insert(key, json);
        }
        path.remove(&self.id());
        Ok(serde_json::Value::Object(map))
    }
}

fn json_kind(json: &serde_json::Value) -> &'static str {
    match json {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

impl Default for Object {
    fn default() -> Self {
        Self::new()
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Object {}

impl<K, V> FromIterator<(K, V)> for Object
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter().fold(Object::new(), |obj, (k, v)| obj.with(k, v))
    }
}

impl fmt::Debug for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Keys only: values may point back at this object.
        f.debug_struct("Object")
            .field("id", &self.id())
            .field("keys", &self.keys())
            .field("frozen", &self.is_frozen())
            .finish()
    }
}
