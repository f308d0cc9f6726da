use flightcache::fingerprint::DefaultFingerprint;
use flightcache::{Cache, CacheConfig};
use serde::Serialize;
use std::time::Duration;

#[derive(Serialize, Clone)]
struct Key(u32);
impl DefaultFingerprint for Key {}

#[tokio::test]
async fn memory_pressure_evicts_the_least_valuable_entries() {
    let cache = Cache::new(
        |key: Key| async move { Ok::<Vec<u8>, String>(vec![0u8; 32 * (key.0 as usize + 1)]) },
        CacheConfig::builder()
            .max_memory_bytes(64)
            .low_water_bytes(32)
            .sweep_interval(Duration::from_millis(10))
            .build(),
    );

    for i in 0..10 {
        cache.get(Key(i)).await.unwrap();
    }

    tokio::time::sleep(Duration::from_millis(60)).await;

    let stats = cache.statistics();
    assert!(stats.memory.current_usage_bytes <= 32 + 64);
    assert!(stats.memory.cleanup_count > 0);
    assert!(cache.keys().len() < 10);
}
