//! Background periodic cleanup: an expiration pass followed by a memory-pressure
//! eviction pass, run on a `tokio::time::interval` guarded by a
//! `tokio_util::sync::CancellationToken` so `clear()` can stop it and a later
//! operation can cheaply re-arm it.

use crate::config::FreeUpMemoryPolicy;
use crate::metrics::Metrics;
use crate::size::ByteSize;
use crate::store::Store;
use crate::task::TaskStatus;
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Owns the background sweep task's lifecycle. Holds no cache data itself; the
/// actual cleanup logic is supplied as a closure so this type stays ignorant of the
/// cache's `I`/`O`/`E` type parameters.
pub struct Sweeper {
    state: AsyncMutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl Sweeper {
    pub fn new() -> Self {
        Self {
            state: AsyncMutex::new(None),
        }
    }

    /// Start the background loop if it isn't already running.
    pub async fn ensure_started<F>(&self, interval: Duration, sweep_once: F)
    where
        F: Fn() + Send + 'static,
    {
        let mut state = self.state.lock().await;
        if state.is_some() {
            return;
        }
        let token = CancellationToken::new();
        let child = token.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick is immediate; skip it
            loop {
                tokio::select! {
                    _ = child.cancelled() => break,
                    _ = ticker.tick() => sweep_once(),
                }
            }
        });
        *state = Some((token, handle));
    }

    /// Stop the background loop. Idempotent.
    pub async fn stop(&self) {
        if let Some((token, handle)) = self.state.lock().await.take() {
            token.cancel();
            handle.abort();
        }
    }
}

impl Default for Sweeper {
    fn default() -> Self {
        Self::new()
    }
}

/// Run one expiration pass followed by one memory pass over `store`.
///
/// The expiration pass removes every task whose derived status is `Expired`. The
/// memory pass then evicts ACTIVE tasks in ascending score order (lowest-scoring,
/// i.e. least valuable, first) until resident bytes fall back to the configured
/// low-water mark. `max_memory_bytes == 0` is normalized to "evict whenever any
/// bytes are resident" rather than disabling the pass.
pub fn sweep_once<I, O, E>(store: &Store<I, O, E>, metrics: &Metrics, policy: &FreeUpMemoryPolicy)
where
    O: ByteSize,
{
    expiration_pass(store, metrics);
    memory_pass(store, metrics, policy);
}

fn expiration_pass<I, O, E>(store: &Store<I, O, E>, metrics: &Metrics) {
    for (fingerprint, task) in store.snapshot() {
        if task.status() == TaskStatus::Expired {
            if store.remove_if_same(&fingerprint, &task) {
                metrics.add_released_bytes(task.bytes());
                tracing::debug!(fingerprint = %fingerprint, "expired task swept");
            }
        }
    }
}

fn memory_pass<I, O, E>(store: &Store<I, O, E>, metrics: &Metrics, policy: &FreeUpMemoryPolicy)
where
    O: ByteSize,
{
    let mut active: Vec<_> = store
        .snapshot()
        .into_iter()
        .filter(|(_, t)| t.status() == TaskStatus::Active)
        .collect();
    let mut current_bytes: u64 = active.iter().map(|(_, t)| t.bytes() as u64).sum();
    let over_cap = if policy.max_memory_bytes == 0 {
        current_bytes > 0
    } else {
        current_bytes > policy.max_memory_bytes
    };
    if !over_cap {
        return;
    }
    active.sort_by(|(_, a), (_, b)| {
        a.eviction_score(policy.score_fn.as_ref())
            .partial_cmp(&b.eviction_score(policy.score_fn.as_ref()))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    for (fingerprint, task) in active {
        if current_bytes <= policy.low_water_bytes {
            break;
        }
        if store.remove_if_same(&fingerprint, &task) {
            let bytes = task.bytes() as u64;
            current_bytes = current_bytes.saturating_sub(bytes);
            metrics.add_released_bytes(task.bytes());
            metrics.record_eviction();
            tracing::info!(fingerprint = %fingerprint, bytes, "task evicted under memory pressure");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CachePolicy;
    use crate::task::Task;
    use std::sync::Arc;

    fn active_task(v: i32, value: i32) -> Arc<Task<i32, i32, String>> {
        let t = Arc::new(Task::new(v, CachePolicy::default()));
        t.begin();
        t.complete_ok(value);
        t
    }

    #[test]
    fn expiration_pass_removes_expired_only() {
        let store: Store<i32, i32, String> = Store::new();
        let mut policy = CachePolicy::default();
        policy.ttl = Some(Duration::from_millis(1));
        let expiring = Arc::new(Task::new(1, policy));
        expiring.begin();
        expiring.complete_ok(1);
        std::thread::sleep(Duration::from_millis(20));
        store.insert("expiring".to_string(), expiring);
        store.insert("fresh".to_string(), active_task(2, 2));

        let metrics = Metrics::new();
        expiration_pass(&store, &metrics);

        assert!(store.get("expiring").is_none());
        assert!(store.get("fresh").is_some());
    }

    #[test]
    fn memory_pass_evicts_down_to_low_water_mark() {
        let store: Store<i32, i32, String> = Store::new();
        for i in 0..10 {
            store.insert(format!("k{i}"), active_task(i, i));
        }
        let metrics = Metrics::new();
        let policy = FreeUpMemoryPolicy {
            max_memory_bytes: 40,
            low_water_bytes: 16,
            ..FreeUpMemoryPolicy::default()
        };
        memory_pass(&store, &metrics, &policy);
        let remaining_bytes: usize = store.snapshot().iter().map(|(_, t)| t.bytes()).sum();
        assert!(remaining_bytes <= 16);
        assert!(metrics.evictions() > 0);
    }

    #[test]
    fn memory_pass_is_noop_when_under_cap() {
        let store: Store<i32, i32, String> = Store::new();
        store.insert("a".to_string(), active_task(1, 1));
        let metrics = Metrics::new();
        let policy = FreeUpMemoryPolicy {
            max_memory_bytes: 1000,
            low_water_bytes: 100,
            ..FreeUpMemoryPolicy::default()
        };
        memory_pass(&store, &metrics, &policy);
        assert_eq!(metrics.evictions(), 0);
    }

    #[test]
    fn memory_pass_zero_cap_evicts_whenever_resident() {
        let store: Store<i32, i32, String> = Store::new();
        store.insert("a".to_string(), active_task(1, 1));
        store.insert("b".to_string(), active_task(2, 2));
        let metrics = Metrics::new();
        let policy = FreeUpMemoryPolicy {
            max_memory_bytes: 0,
            low_water_bytes: 0,
            ..FreeUpMemoryPolicy::default()
        };
        memory_pass(&store, &metrics, &policy);
        assert!(store.snapshot().is_empty());
        assert!(metrics.evictions() > 0);
    }
}
