//! Effect Implementation
//!
//! An Effect is a computation that re-runs whenever reactive data it read
//! changes.
//!
//! # How Effects Work
//!
//! 1. Unless created lazy, the effect runs once immediately to establish
//!    its dependencies.
//!
//! 2. Each run pushes the effect on the execution stack, so every reactive
//!    read in its body subscribes it to that `(object, key)` pair.
//!
//! 3. A write to a subscribed key re-runs it synchronously, before the
//!    write returns.
//!
//! # Re-entrancy
//!
//! An effect that is already on the execution stack is never started
//! again: the nested run is skipped and [`Effect::run`] returns `None`.
//! This stops an effect that writes to data it also reads from recursing
//! into itself. Longer cycles (A triggers B triggers A) are only cut when
//! they come back to an effect still on the stack.
//!
//! # Failure
//!
//! A panic in the body unwinds through whoever ran the effect, including a
//! write that triggered it. The execution stack is restored on the way out.
//! Work the body did before panicking is not undone.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::debug;

use super::computed::VALUE_KEY;
use super::context::ReactiveContext;
use super::runtime::{Dep, Runtime, TriggerInfo};
use super::subscriber::{Subscriber, SubscriberId, TargetId};

/// Options recognized when creating an effect.
///
/// Deserializable so options can come from configuration; missing fields
/// take their defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EffectOptions {
    /// Do not run on creation.
    pub lazy: bool,
    /// Re-invoke before plain effects when a shared dependency changes.
    pub computed: bool,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn computed(mut self, computed: bool) -> Self {
        self.computed = computed;
        self
    }
}

struct EffectInner<T> {
    id: SubscriberId,
    options: EffectOptions,
    func: Box<dyn Fn() -> T + Send + Sync>,

    /// Every dependency entry this effect joined, in join order.
    deps: Mutex<SmallVec<[Dep; 4]>>,

    stopped: AtomicBool,
    run_count: AtomicUsize,

    /// Set for the effect behind a computed value: the target its readers
    /// subscribe to.
    source: Option<TargetId>,
}

impl<T: 'static> EffectInner<T> {
    fn run(self: &Arc<Self>) -> Option<T> {
        if self.stopped.load(Ordering::SeqCst) {
            return None;
        }
        if ReactiveContext::contains(self.id) {
            debug!(subscriber = ?self.id, "skipping re-entrant run");
            return None;
        }

        let _ctx = ReactiveContext::enter(self.clone());
        let value = (self.func)();
        self.run_count.fetch_add(1, Ordering::SeqCst);
        Some(value)
    }
}

impl<T: 'static> Subscriber for EffectInner<T> {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn is_computed(&self) -> bool {
        self.options.computed
    }

    fn record_dep(&self, dep: Dep) {
        self.deps.lock().push(dep);
    }

    fn notify(self: Arc<Self>) {
        if self.run().is_some() {
            if let Some(source) = self.source {
                Runtime::trigger(source, VALUE_KEY, &TriggerInfo::default());
            }
        }
    }
}

impl<T> Drop for EffectInner<T> {
    fn drop(&mut self) {
        for dep in self.deps.get_mut().drain(..) {
            dep.remove(self.id);
        }
        if let Some(source) = self.source {
            Runtime::evict(source);
        }
    }
}

/// A computation that re-runs when its dependencies change.
///
/// Cloning yields another handle to the same effect. The dependency store
/// only holds weak references, so the effect stays subscribed for as long
/// as at least one handle is alive.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(Object::new().with("count", 0));
///
/// let view = state.clone();
/// let _effect = Effect::new(move || {
///     println!("count is {:?}", view.get("count"));
/// });
///
/// state.set("count", 5); // prints "count is Some(Int(5))"
/// ```
#[must_use = "dropping the handle unsubscribes the effect"]
pub struct Effect<T = ()> {
    inner: Arc<EffectInner<T>>,
}

impl<T: 'static> Effect<T> {
    /// Create an effect and run it once.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_options(func, EffectOptions::default())
    }

    /// Create an effect without running it.
    pub fn new_lazy<F>(func: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::with_options(func, EffectOptions::new().lazy(true))
    }

    pub fn with_options<F>(func: F, options: EffectOptions) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        let effect = Self::build(Box::new(func), options, None);
        if !options.lazy {
            effect.run();
        }
        effect
    }

    /// The lazy, computed-priority effect behind a computed value.
    pub(crate) fn computed_source<F>(func: F, source: TargetId) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(
            Box::new(func),
            EffectOptions::new().lazy(true).computed(true),
            Some(source),
        )
    }

    fn build(
        func: Box<dyn Fn() -> T + Send + Sync>,
        options: EffectOptions,
        source: Option<TargetId>,
    ) -> Self {
        Self {
            inner: Arc::new(EffectInner {
                id: SubscriberId::new(),
                options,
                func,
                deps: Mutex::new(SmallVec::new()),
                stopped: AtomicBool::new(false),
                run_count: AtomicUsize::new(0),
                source,
            }),
        }
    }

    /// Run the body with this effect active.
    ///
    /// Returns `None` without running if the effect is stopped or already
    /// running further up the stack.
    pub fn run(&self) -> Option<T> {
        self.inner.run()
    }

    /// Unsubscribe from every dependency and refuse further runs.
    pub fn stop(&self) {
        if self.inner.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let deps = std::mem::take(&mut *self.inner.deps.lock());
        for dep in &deps {
            dep.remove(self.inner.id);
        }
        debug!(subscriber = ?self.inner.id, deps = deps.len(), "effect stopped");
    }
}

impl<T> Effect<T> {
    /// Get the subscriber ID for this effect.
    pub fn id(&self) -> SubscriberId {
        self.inner.id
    }

    pub fn options(&self) -> EffectOptions {
        self.inner.options
    }

    pub fn is_lazy(&self) -> bool {
        self.inner.options.lazy
    }

    pub fn is_computed(&self) -> bool {
        self.inner.options.computed
    }

    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Number of completed runs.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.load(Ordering::SeqCst)
    }

    /// Number of dependency entries joined so far.
    pub fn dependency_count(&self) -> usize {
        self.inner.deps.lock().len()
    }

    /// Whether both handles refer to the same effect.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<T> Clone for Effect<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Effect<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Effect")
            .field("id", &self.id())
            .field("options", &self.options())
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

/// Create an effect. Unless `options.lazy` is set it runs once right away.
///
/// The effect stays subscribed only while a handle to it is alive. Keep the
/// returned [`Effect`] for as long as it should react; dropping the last
/// handle unlinks it from every dependency, and [`Effect::stop`] does the
/// same while handles remain.
#[must_use = "dropping the handle unsubscribes the effect"]
pub fn create_effect<T, F>(func: F, options: EffectOptions) -> Effect<T>
where
    T: 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Effect::with_options(func, options)
}

/// Create an effect with default options.
///
/// Same disposal rule as [`create_effect`]: `effect(..);` as a bare
/// statement subscribes nothing past its first run.
#[must_use = "dropping the handle unsubscribes the effect"]
pub fn effect<T, F>(func: F) -> Effect<T>
where
    T: 'static,
    F: Fn() -> T + Send + Sync + 'static,
{
    Effect::new(func)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new_lazy(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });

        // Effect should not have run
        assert_eq!(run_count.load(Ordering::SeqCst), 0);
        assert_eq!(effect.run_count(), 0);
        assert!(effect.is_lazy());

        // Manually run
        assert_eq!(effect.run(), Some(()));
        assert_eq!(run_count.load(Ordering::SeqCst), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn run_returns_body_result() {
        let effect = create_effect(|| 21 * 2, EffectOptions::new().lazy(true));
        assert_eq!(effect.run(), Some(42));
    }

    #[test]
    fn reentrant_run_is_skipped() {
        let slot: Arc<Mutex<Option<Effect<i32>>>> = Arc::new(Mutex::new(None));
        let inner_result = Arc::new(Mutex::new(None));

        let slot_clone = slot.clone();
        let result_clone = inner_result.clone();
        let effect = Effect::new_lazy(move || {
            let me = slot_clone.lock().clone();
            if let Some(me) = me {
                *result_clone.lock() = Some(me.run());
            }
            7
        });
        *slot.lock() = Some(effect.clone());

        assert_eq!(effect.run(), Some(7));
        // The nested call saw the effect on the stack and skipped
        assert_eq!(*inner_result.lock(), Some(None));
        assert_eq!(effect.run_count(), 1);

        // Break the self-reference
        slot.lock().take();
    }

    #[test]
    fn nested_effects_restore_outer() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = seen.clone();

        let outer = Effect::new_lazy(move || {
            let outer_id = ReactiveContext::current_subscriber();
            let inner_seen = seen_clone.clone();
            let inner = Effect::new(move || {
                inner_seen.lock().push(ReactiveContext::current_subscriber());
            });
            seen_clone.lock().push(ReactiveContext::current_subscriber());
            assert_eq!(ReactiveContext::current_subscriber(), outer_id);
            inner.id()
        });

        let inner_id = outer.run().unwrap();
        let seen = seen.lock();
        assert_eq!(seen[0], Some(inner_id));
        assert_eq!(seen[1], Some(outer.id()));
    }

    #[test]
    fn stack_unwinds_when_body_panics() {
        let effect = Effect::new_lazy(|| -> i32 { panic!("effect failed") });

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| effect.run()));

        assert!(result.is_err());
        assert_eq!(ReactiveContext::depth(), 0);
        assert_eq!(effect.run_count(), 0);
    }

    #[test]
    fn stopped_effect_does_not_run() {
        let run_count = Arc::new(AtomicI32::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new(move || {
            run_count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        effect.stop();
        assert!(effect.is_stopped());

        assert_eq!(effect.run(), None);
        assert_eq!(run_count.load(Ordering::SeqCst), 1);

        // Stopping twice is harmless
        effect.stop();
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.id(), effect2.id());
        assert!(effect1.ptr_eq(&effect2));

        effect1.run();
        assert_eq!(effect1.run_count(), 2);
        assert_eq!(effect2.run_count(), 2);

        effect1.stop();
        assert!(effect2.is_stopped());
    }

    #[test]
    fn dropped_effects_leave_no_entries_behind() {
        let target = TargetId::new();

        for _ in 0..1000 {
            let effect = Effect::new(move || Runtime::track(target, "x"));
            assert_eq!(effect.dependency_count(), 1);
        }

        let dep = Runtime::dep(target, "x").unwrap();
        assert_eq!(dep.len(), 0);
        assert_eq!(dep.stored_len(), 0);
    }

    #[test]
    fn dropping_a_stopped_effect_is_harmless() {
        let target = TargetId::new();
        let effect = Effect::new(move || Runtime::track(target, "x"));
        effect.stop();
        drop(effect);

        assert_eq!(Runtime::dep(target, "x").unwrap().stored_len(), 0);
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: EffectOptions = serde_json::from_str(r#"{"lazy": true}"#).unwrap();
        assert_eq!(options, EffectOptions::new().lazy(true));

        let options: EffectOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, EffectOptions::default());
    }
}
