use flightcache::fingerprint::DefaultFingerprint;
use flightcache::{Cache, CacheConfig, HealthStatus};
use serde::Serialize;

#[derive(Serialize, Clone)]
struct Key(u32);
impl DefaultFingerprint for Key {}

#[tokio::test]
async fn fresh_cache_reports_healthy_with_zeroed_counters() {
    let cache = Cache::new(
        |_key: Key| async move { Ok::<i32, String>(1) },
        CacheConfig::unbounded(),
    );
    let stats = cache.statistics();
    assert_eq!(stats.efficiency.total_reads, 0);
    assert_eq!(stats.efficiency.total_fetches, 0);
    assert_eq!(stats.inventory.total_items, 0);
    assert_eq!(stats.health.status, HealthStatus::Excellent);
}

#[tokio::test]
async fn hits_and_misses_are_reflected_in_efficiency() {
    let cache = Cache::new(
        |_key: Key| async move { Ok::<i32, String>(1) },
        CacheConfig::unbounded(),
    );
    cache.get(Key(1)).await.unwrap();
    cache.get(Key(1)).await.unwrap();
    cache.get(Key(2)).await.unwrap();

    let stats = cache.statistics();
    assert_eq!(stats.efficiency.total_reads, 3);
    assert_eq!(stats.efficiency.total_fetches, 2);
    assert_eq!(stats.efficiency.misses, 2);
    assert_eq!(stats.efficiency.hits, 1);
    assert!(stats.efficiency.hit_rate > 0.0 && stats.efficiency.hit_rate < 1.0);
    assert_eq!(stats.inventory.total_items, 2);
    assert!(stats.memory.current_usage_bytes > 0);
    assert!(!stats.memory.current_usage.is_empty());
    assert!(!stats.memory.limit.is_empty());
}

#[tokio::test]
async fn failed_fetches_degrade_the_health_score() {
    let cache = Cache::new(
        |_key: Key| async move { Err::<i32, String>("boom".to_string()) },
        CacheConfig::builder()
            .error_policy(flightcache::ErrorTaskPolicy::Ignore)
            .build(),
    );
    for i in 0..10 {
        let _ = cache.get(Key(i)).await;
    }
    let stats = cache.statistics();
    assert!(stats.efficiency.total_fetches >= 10);
    assert!(stats.health.score < 90.0);
    assert_ne!(stats.health.status, HealthStatus::Excellent);
}
