//! Reactive Runtime
//!
//! This module implements transparent dependency tracking over plain
//! objects: wrap an object, read it inside effects, and writes re-run
//! exactly the effects that read the written property.
//!
//! # Concepts
//!
//! ## Views
//!
//! [`reactive`] returns the instrumented view of a raw object. Reading a
//! property through the view while an effect runs subscribes that effect to
//! the `(object, property)` pair. Writing through the view re-runs its
//! subscribers. Nested objects are wrapped on access.
//!
//! ## Effects
//!
//! An [`Effect`] is a computation re-run whenever something it read
//! changes. Effects run synchronously: by the time a write returns, every
//! dependent has already re-run.
//!
//! ## Computeds
//!
//! A [`Computed`] is a derived value. Its backing effect is re-invoked
//! before plain effects, so effects reading it see the fresh result.
//!
//! # Implementation Notes
//!
//! The running effect is found through a thread-local execution stack
//! ([`ReactiveContext`]). The dependency store ([`Runtime`]) and the
//! wrapper registry ([`Registry`]) are process-wide tables; entries are
//! evicted when the objects, views, and computeds they describe are
//! dropped.

mod computed;
mod context;
mod effect;
mod proxy;
mod registry;
mod runtime;
mod subscriber;

pub use computed::{computed, Computed, VALUE_KEY};
pub use context::ReactiveContext;
pub use effect::{create_effect, effect, Effect, EffectOptions};
pub use proxy::{PropertyAccess, Reactive};
pub use registry::{is_reactive, reactive, to_raw, IntoReactive, Registry, ViewId};
pub use runtime::{Dep, Runtime, TriggerInfo};
pub use subscriber::{Subscriber, SubscriberId, TargetId};
