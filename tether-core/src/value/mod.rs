//! Dynamic Object Model
//!
//! Reactive views wrap *raw objects*: shared, mutable property bags whose
//! properties hold [`Value`]s. Objects are compared by identity, never by
//! contents, which is what the wrapper registry and the dependency store
//! key on.
//!
//! A property may hold either a raw [`Object`] or a [`Reactive`] view. Reads
//! through a view hand back nested objects wrapped, so deep structures become
//! reactive lazily, on first access.

mod object;

use std::convert::TryFrom;
use std::fmt;
use std::sync::Arc;

use crate::error::ValueError;
use crate::reactive::Reactive;

pub use object::Object;

/// A property value.
#[derive(Clone, Default, PartialEq)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// A raw (uninstrumented) object.
    Object(Object),
    /// An instrumented view stored as a plain value.
    Reactive(Reactive),
}

impl Value {
    /// Short name of the value's kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Object(_) => "object",
            Value::Reactive(_) => "reactive",
        }
    }

    /// Whether the value is object-valued (raw or wrapped).
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_) | Value::Reactive(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric view of the value. Integers widen to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Object> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_reactive(&self) -> Option<&Reactive> {
        match self {
            Value::Reactive(r) => Some(r),
            _ => None,
        }
    }

    /// Convert a JSON value. JSON objects become fresh raw [`Object`]s.
    pub fn from_json(json: serde_json::Value) -> crate::Result<Self> {
        Ok(match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().ok_or(ValueError::UnsupportedJson("number"))?),
            },
            serde_json::Value::String(s) => Value::Str(s.into()),
            serde_json::Value::Array(_) => return Err(ValueError::UnsupportedJson("array")),
            serde_json::Value::Object(map) => Value::Object(Object::from_json_map(map)?),
        })
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::Int(i) => write!(f, "Int({i})"),
            Value::Float(x) => write!(f, "Float({x})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(o) => fmt::Debug::fmt(o, f),
            Value::Reactive(r) => fmt::Debug::fmt(r, f),
        }
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s.into())
    }
}

impl From<Object> for Value {
    fn from(o: Object) -> Self {
        Value::Object(o)
    }
}

impl From<Reactive> for Value {
    fn from(r: Reactive) -> Self {
        Value::Reactive(r)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

macro_rules! try_from_value {
    ($ty:ty, $expected:literal, $($pat:pat => $out:expr),+ $(,)?) => {
        impl TryFrom<Value> for $ty {
            type Error = ValueError;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match value {
                    $($pat => Ok($out),)+
                    other => Err(ValueError::TypeMismatch {
                        expected: $expected,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

try_from_value!(bool, "bool", Value::Bool(b) => b);
try_from_value!(i64, "int", Value::Int(i) => i);
try_from_value!(f64, "float", Value::Float(f) => f, Value::Int(i) => i as f64);
try_from_value!(String, "string", Value::Str(s) => s.to_string());
try_from_value!(Object, "object", Value::Object(o) => o);
try_from_value!(Reactive, "reactive", Value::Reactive(r) => r);
