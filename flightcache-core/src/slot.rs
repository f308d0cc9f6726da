//! A write-once completion cell that many concurrent awaiters can subscribe to.
//!
//! This is the synchronization primitive a [`crate::task::Task`] resolves exactly
//! once; every caller that joined the same in-flight fetch reads the same result
//! back out through it. The resolved value and error are each wrapped in their own
//! `Arc` so that sharing the result across every waiter never requires `O` or `E`
//! to implement `Clone`; only a caller that explicitly wants an isolated deep copy
//! needs that bound, and it pays for it at the call site, not here.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

/// The value a [`Slot`] holds once resolved: a shared success or a shared failure.
pub type SlotResult<O, E> = Result<Arc<O>, Arc<E>>;

/// A single-assignment cell, resolved or rejected exactly once, readable by any
/// number of concurrent awaiters.
///
/// Resolving a slot twice is a usage error in the caller (two completions racing for
/// the same task), not a runtime condition callers are expected to handle — it panics
/// in debug builds and is a logic error the scheduler is responsible for preventing.
pub struct Slot<O, E> {
    tx: watch::Sender<Option<SlotResult<O, E>>>,
    done: AtomicBool,
}

impl<O, E> Slot<O, E> {
    /// Create a new, unresolved slot.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            tx,
            done: AtomicBool::new(false),
        }
    }

    /// Resolve the slot with a successful value. Panics if already completed.
    pub fn resolve(&self, value: O) {
        self.complete(Ok(Arc::new(value)));
    }

    /// Resolve the slot with an error. Panics if already completed.
    pub fn reject(&self, error: E) {
        self.complete(Err(Arc::new(error)));
    }

    fn complete(&self, result: SlotResult<O, E>) {
        let already_done = self.done.swap(true, Ordering::AcqRel);
        debug_assert!(!already_done, "cache slot resolved more than once");
        if already_done {
            panic!("cache slot resolved more than once");
        }
        // watch::Sender::send only fails if every receiver was dropped; we always
        // hold at least the implicit subscription created in `new`, so ignore it.
        let _ = self.tx.send(Some(result));
    }

    /// True once [`Slot::resolve`] or [`Slot::reject`] has run.
    pub fn is_resolved(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Return the result immediately if already resolved, without waiting.
    pub fn try_get(&self) -> Option<SlotResult<O, E>> {
        self.tx.borrow().clone()
    }

    /// Wait for the slot to resolve and return the shared result.
    ///
    /// Safe to call concurrently from any number of tasks; every caller observes the
    /// same `Arc`s once resolution happens.
    pub async fn wait(&self) -> SlotResult<O, E> {
        let mut rx = self.tx.subscribe();
        loop {
            if let Some(value) = rx.borrow().clone() {
                return value;
            }
            if rx.changed().await.is_err() {
                // Sender dropped without ever resolving: only possible if the owning
                // Task was dropped mid-flight, which the scheduler never does while
                // awaiters exist.
                unreachable!("slot sender dropped before resolving");
            }
        }
    }
}

impl<O, E> Default for Slot<O, E> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn resolves_and_is_readable() {
        let slot: Slot<i32, String> = Slot::new();
        slot.resolve(42);
        assert!(slot.is_resolved());
        let result = slot.wait().await;
        assert_eq!(*result.unwrap(), 42);
    }

    #[tokio::test]
    async fn many_awaiters_see_the_same_result() {
        let slot = Arc::new(Slot::<i32, String>::new());
        let mut handles = Vec::new();
        for _ in 0..20 {
            let slot = slot.clone();
            handles.push(tokio::spawn(async move { slot.wait().await }));
        }
        tokio::task::yield_now().await;
        slot.resolve(7);
        for h in handles {
            let r = h.await.unwrap();
            assert_eq!(*r.unwrap(), 7);
        }
    }

    #[test]
    #[should_panic(expected = "resolved more than once")]
    fn double_resolve_panics() {
        let slot: Slot<i32, String> = Slot::new();
        slot.resolve(1);
        slot.resolve(2);
    }

    #[tokio::test]
    async fn reject_propagates_error() {
        let slot: Slot<i32, String> = Slot::new();
        slot.reject("boom".to_string());
        let result = slot.wait().await;
        assert_eq!(*result.unwrap_err(), "boom");
    }

    #[test]
    fn try_get_before_resolution_is_none() {
        let slot: Slot<i32, String> = Slot::new();
        assert!(slot.try_get().is_none());
    }
}
