//! Execution Stack
//!
//! The execution stack tracks which computation is currently running.
//! This enables automatic dependency attribution: when a reactive property
//! is read, the subscriber on top of the stack is recorded as a dependent.
//!
//! # Implementation
//!
//! We use a thread-local stack of subscribers. Running an effect pushes it
//! and returns a guard; dropping the guard pops it. Because the pop lives in
//! `Drop`, the stack is restored on every exit path, including a panic
//! unwinding out of the effect body.
//!
//! Nesting falls out naturally: an effect run inside another effect's body
//! sits above it, and once it finishes the outer effect is on top again.

use std::cell::RefCell;
use std::sync::Arc;

use super::subscriber::{Subscriber, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Arc<dyn Subscriber>>> = RefCell::new(Vec::new());
}

/// Guard that pops the execution stack when dropped.
pub struct ReactiveContext {
    subscriber_id: SubscriberId,
}

impl ReactiveContext {
    /// Push `subscriber` as the active computation.
    ///
    /// Reads made while the returned guard is alive are attributed to it.
    pub fn enter(subscriber: Arc<dyn Subscriber>) -> Self {
        let subscriber_id = subscriber.id();
        CONTEXT_STACK.with(|stack| stack.borrow_mut().push(subscriber));
        Self { subscriber_id }
    }

    /// Check if there is an active computation.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The subscriber on top of the stack, if any.
    pub fn current() -> Option<Arc<dyn Subscriber>> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|sub| sub.id()))
    }

    /// Whether `id` is anywhere on the stack, not only on top.
    pub fn contains(id: SubscriberId) -> bool {
        CONTEXT_STACK.with(|stack| stack.borrow().iter().any(|sub| sub.id() == id))
    }

    pub fn depth() -> usize {
        CONTEXT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let popped = CONTEXT_STACK.with(|stack| stack.borrow_mut().pop());

        // Guards are scoped, so pops always match pushes.
        if let Some(entry) = &popped {
            debug_assert_eq!(
                entry.id(),
                self.subscriber_id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.subscriber_id,
                entry.id()
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::runtime::Dep;

    struct Probe(SubscriberId);

    impl Subscriber for Probe {
        fn id(&self) -> SubscriberId {
            self.0
        }

        fn is_computed(&self) -> bool {
            false
        }

        fn record_dep(&self, _dep: Dep) {}

        fn notify(self: Arc<Self>) {}
    }

    fn probe() -> Arc<dyn Subscriber> {
        Arc::new(Probe(SubscriberId::new()))
    }

    #[test]
    fn context_tracks_subscriber() {
        let sub = probe();
        let id = sub.id();

        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());

        {
            let _ctx = ReactiveContext::enter(sub);

            assert!(ReactiveContext::is_active());
            assert_eq!(ReactiveContext::current_subscriber(), Some(id));
        }

        // Context should be cleaned up after drop
        assert!(!ReactiveContext::is_active());
        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn nested_contexts() {
        let outer = probe();
        let inner = probe();
        let (id1, id2) = (outer.id(), inner.id());

        {
            let _ctx1 = ReactiveContext::enter(outer);
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));

            {
                let _ctx2 = ReactiveContext::enter(inner);
                assert_eq!(ReactiveContext::current_subscriber(), Some(id2));
                assert!(ReactiveContext::contains(id1));
                assert_eq!(ReactiveContext::depth(), 2);
            }

            // After inner context drops, outer should be current
            assert_eq!(ReactiveContext::current_subscriber(), Some(id1));
            assert!(!ReactiveContext::contains(id2));
        }

        assert!(ReactiveContext::current_subscriber().is_none());
    }

    #[test]
    fn context_pops_on_panic() {
        let sub = probe();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _ctx = ReactiveContext::enter(sub);
            panic!("boom");
        }));

        assert!(result.is_err());
        assert_eq!(ReactiveContext::depth(), 0);
    }
}
