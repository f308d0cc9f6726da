use flightcache::fingerprint::DefaultFingerprint;
use flightcache::{Cache, CacheConfig, SeedValue};
use serde::Serialize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Serialize, Clone)]
struct Key(String);
impl DefaultFingerprint for Key {}

fn counting_cache() -> (
    Cache<Key, i32, String, impl Fn(Key) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<i32, String>> + Send>>>,
    Arc<AtomicUsize>,
) {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let cache = Cache::new(
        move |_key: Key| {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok::<i32, String>(0)
            })
        },
        CacheConfig::unbounded(),
    );
    (cache, calls)
}

#[tokio::test]
async fn set_resolved_seeds_without_a_fetch() {
    let (cache, calls) = counting_cache();
    cache
        .set(Key("a".to_string()), Some(SeedValue::Resolved(Ok(42))))
        .await
        .unwrap();
    let v = cache.get(Key("a".to_string())).await.unwrap();
    assert_eq!(*v, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn set_pending_shares_the_seeded_future_with_every_waiter() {
    let (cache, calls) = counting_cache();
    let fut: flightcache::BoxFuture<Result<i32, String>> =
        Box::pin(async move { Ok(7) });
    cache.set(Key("a".to_string()), Some(SeedValue::Pending(fut))).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..5 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache.get(Key("a".to_string())).await
        }));
    }
    for h in handles {
        assert_eq!(*h.await.unwrap().unwrap(), 7);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn set_none_clears_an_entry_and_requeues_a_fetch() {
    let (cache, calls) = counting_cache();
    cache.get(Key("a".to_string())).await.unwrap();
    cache.set(Key("a".to_string()), None).await.unwrap();
    cache.get(Key("a".to_string())).await.unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}
