//! Ordered callback registry shared between the caller and the hook thread.

use parking_lot::Mutex;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// A registered callback. Identity (for removal) is the `Arc` allocation.
pub type Callback<E> = Arc<dyn Fn(&E) + Send + Sync>;

/// Wrap a closure as a [`Callback`], keeping a handle that can later be removed.
pub fn callback<E, F>(f: F) -> Callback<E>
where
    F: Fn(&E) + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Insertion-ordered list of callbacks. Duplicates are allowed.
///
/// Mutation and snapshotting both take the lock, but callbacks are never
/// invoked while it is held, so a callback may freely add or remove
/// callbacks (the change applies from the next event).
pub struct CallbackRegistry<E> {
    callbacks: Mutex<Vec<Callback<E>>>,
}

impl<E> CallbackRegistry<E> {
    pub fn new() -> Self {
        Self {
            callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn add(&self, callback: Callback<E>) {
        self.callbacks.lock().push(callback);
    }

    /// Remove the first occurrence of `callback`. Absent callbacks are ignored.
    pub fn remove(&self, callback: &Callback<E>) {
        let mut callbacks = self.callbacks.lock();
        if let Some(pos) = callbacks.iter().position(|c| Arc::ptr_eq(c, callback)) {
            callbacks.remove(pos);
        }
    }

    pub fn clear(&self) {
        self.callbacks.lock().clear();
    }

    /// Snapshot of the current callbacks in insertion order.
    pub fn list(&self) -> Vec<Callback<E>> {
        self.callbacks.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.callbacks.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.lock().is_empty()
    }

    /// Invoke every callback with `event`, in insertion order, on the current thread.
    ///
    /// Each invocation runs inside its own panic boundary: a panicking
    /// callback is logged and counted, and the remaining callbacks still run.
    pub fn dispatch(&self, event: &E) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();

        for callback in self.list() {
            match panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(()) => outcome.invoked += 1,
                Err(payload) => {
                    outcome.failed += 1;
                    tracing::error!(
                        "Callback panicked during dispatch: {}",
                        panic_message(payload.as_ref())
                    );
                }
            }
        }

        outcome
    }
}

/// Result of fanning one event out to the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub invoked: usize,
    pub failed: usize,
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

impl<E> Default for CallbackRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn same(a: &[Callback<u32>], b: &[&Callback<u32>]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| Arc::ptr_eq(x, *y))
    }

    #[test]
    fn test_add_preserves_insertion_order() {
        let registry = CallbackRegistry::new();
        let a = callback(|_: &u32| {});
        let b = callback(|_: &u32| {});

        registry.add(a.clone());
        registry.add(b.clone());

        assert!(same(&registry.list(), &[&a, &b]));
    }

    #[test]
    fn test_remove_first_occurrence_only() {
        let registry = CallbackRegistry::new();
        let a = callback(|_: &u32| {});
        let b = callback(|_: &u32| {});

        registry.add(a.clone());
        registry.add(b.clone());
        registry.add(a.clone());
        registry.remove(&a);

        assert!(same(&registry.list(), &[&b, &a]));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let registry = CallbackRegistry::new();
        let a = callback(|_: &u32| {});
        let stranger = callback(|_: &u32| {});

        registry.add(a.clone());
        registry.remove(&stranger);

        assert!(same(&registry.list(), &[&a]));
    }

    #[test]
    fn test_identical_closures_are_distinct_callbacks() {
        let registry = CallbackRegistry::new();
        let a = callback(|_: &u32| {});
        let b = callback(|_: &u32| {});

        registry.add(a.clone());
        registry.remove(&b);

        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_clear() {
        let registry = CallbackRegistry::new();
        registry.add(callback(|_: &u32| {}));
        registry.add(callback(|_: &u32| {}));

        registry.clear();

        assert!(registry.is_empty());
        assert!(registry.list().is_empty());
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let registry = CallbackRegistry::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for id in 0..3 {
            let order = order.clone();
            registry.add(callback(move |event: &u32| order.lock().push((id, *event))));
        }

        let outcome = registry.dispatch(&9);

        assert_eq!(outcome, DispatchOutcome { invoked: 3, failed: 0 });
        assert_eq!(*order.lock(), vec![(0, 9), (1, 9), (2, 9)]);
    }

    #[test]
    fn test_panicking_callback_is_isolated() {
        let registry = CallbackRegistry::new();
        let reached = Arc::new(Mutex::new(false));

        registry.add(callback(|_: &u32| panic!("boom")));
        let r = reached.clone();
        registry.add(callback(move |_: &u32| *r.lock() = true));

        let outcome = registry.dispatch(&1);

        assert_eq!(outcome, DispatchOutcome { invoked: 1, failed: 1 });
        assert!(*reached.lock());
    }

    #[test]
    fn test_callback_can_remove_itself() {
        let registry = Arc::new(CallbackRegistry::<u32>::new());
        let slot: Arc<Mutex<Option<Callback<u32>>>> = Arc::new(Mutex::new(None));

        let reg = registry.clone();
        let me = slot.clone();
        let cb = callback(move |_: &u32| {
            if let Some(me) = me.lock().take() {
                reg.remove(&me);
            }
        });
        *slot.lock() = Some(cb.clone());
        registry.add(cb);

        registry.dispatch(&1);

        assert!(registry.is_empty());
    }

    #[test]
    fn test_mixed_sequence_matches_net_additions() {
        let registry = CallbackRegistry::new();
        let a = callback(|_: &u32| {});
        let b = callback(|_: &u32| {});
        let c = callback(|_: &u32| {});

        registry.add(a.clone());
        registry.add(b.clone());
        registry.add(c.clone());
        registry.add(b.clone());
        registry.remove(&b);
        registry.remove(&a);
        registry.add(a.clone());

        assert!(same(&registry.list(), &[&c, &b, &a]));
    }
}
