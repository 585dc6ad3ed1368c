//! Error types for the value model.
//!
//! Reactive operations themselves never fail: a skipped re-entrant run is
//! reported as `None`, a refused write as `false`. The errors here cover
//! converting between [`Value`](crate::value::Value) and Rust or JSON data.

use thiserror::Error;

/// Errors produced when converting or snapshotting values.
#[derive(Debug, Error)]
pub enum ValueError {
    /// A value had a different kind than the caller asked for.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A JSON document was expected to be an object at the top level.
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),

    /// The JSON document holds something the object model cannot represent.
    #[error("unsupported JSON value: {0}")]
    UnsupportedJson(&'static str),

    /// Snapshotting reached an object that is already being serialized.
    #[error("object graph contains a cycle")]
    Cycle,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Result alias used across the crate.
pub type Result<T, E = ValueError> = std::result::Result<T, E>;
