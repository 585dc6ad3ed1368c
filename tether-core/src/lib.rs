//! Tether Core
//!
//! This crate provides a minimal reactive dependency-tracking runtime for
//! plain mutable objects. It implements:
//!
//! - A dynamic object model (objects, values, JSON snapshots)
//! - Instrumented views that record reads and react to writes
//! - Effects and computed values that re-run when what they read changes
//!
//! No annotations or manual subscriptions are needed: whatever an effect
//! reads through a view is what it depends on.
//!
//! # Architecture
//!
//! - `value`: raw objects and property values
//! - `reactive`: wrapper registry, dependency store, execution stack,
//!   effects, computeds, and the instrumentation layer
//! - `error`: value conversion errors
//!
//! # Example
//!
//! ```rust
//! use std::sync::atomic::{AtomicI64, Ordering};
//! use std::sync::Arc;
//!
//! use tether_core::reactive::{computed, effect, reactive};
//! use tether_core::value::Object;
//!
//! let state = reactive(Object::new().with("count", 0));
//!
//! let seen = Arc::new(AtomicI64::new(-1));
//! let (view, sink) = (state.clone(), seen.clone());
//! let _effect = effect(move || {
//!     sink.store(view.get_as::<i64>("count").unwrap_or(0), Ordering::SeqCst);
//! });
//!
//! state.set("count", 5);
//! assert_eq!(seen.load(Ordering::SeqCst), 5);
//!
//! let view = state.clone();
//! let doubled = computed(move || view.get_as::<i64>("count").unwrap_or(0) * 2);
//! state.set("count", 3);
//! assert_eq!(doubled.value(), Some(6));
//! ```

pub mod error;
pub mod reactive;
pub mod value;

pub use error::{Result, ValueError};
