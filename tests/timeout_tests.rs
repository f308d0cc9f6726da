use flightcache::fingerprint::DefaultFingerprint;
use flightcache::{Cache, CacheConfig, CacheError};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize, Clone)]
struct Key(String);
impl DefaultFingerprint for Key {}

#[tokio::test]
async fn slow_fetch_times_out_for_every_waiter() {
    let cache = Cache::new(
        |_key: Key| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<i32, String>(1)
        },
        CacheConfig::builder()
            .fetch_timeout(Duration::from_millis(10))
            .build(),
    );

    let mut handles = Vec::new();
    for _ in 0..5 {
        let cache = cache.clone();
        handles.push(tokio::spawn(async move {
            cache.get(Key("slow".to_string())).await
        }));
    }
    for h in handles {
        let err = h.await.unwrap().unwrap_err();
        assert!(matches!(err, CacheError::Timeout(_)));
    }
}

#[tokio::test]
async fn timeout_does_not_poison_later_attempts() {
    let cache = Cache::new(
        |_key: Key| async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<i32, String>(1)
        },
        CacheConfig::builder()
            .fetch_timeout(Duration::from_millis(10))
            .error_policy(flightcache::ErrorTaskPolicy::Ignore)
            .build(),
    );
    cache.get(Key("slow".to_string())).await.unwrap_err();
    // The driving task removes the expired entry right after resolving it, on its
    // own task; give it a moment to run before asserting it's gone.
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(!cache.has(&Key("slow".to_string())).unwrap());
}
