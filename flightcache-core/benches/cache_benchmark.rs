use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use flightcache_core::fingerprint::DefaultFingerprint;
use flightcache_core::{Cache, CacheConfig};
use serde::Serialize;
use std::sync::Arc;
use tokio::runtime::Runtime;

#[derive(Serialize, Clone)]
struct Key(u64);
impl DefaultFingerprint for Key {}

fn rt() -> Runtime {
    Runtime::new().unwrap()
}

fn bench_fingerprint(c: &mut Criterion) {
    use flightcache_core::Fingerprintable;

    let mut group = c.benchmark_group("fingerprint");
    for size in [1, 100, 10_000].iter() {
        group.bench_with_input(BenchmarkId::new("scalar_key", size), size, |b, &size| {
            let key = Key(size);
            b.iter(|| black_box(key.fingerprint().unwrap()));
        });
    }
    group.finish();
}

fn bench_unique_misses(c: &mut Criterion) {
    let rt = rt();
    let mut group = c.benchmark_group("get_unique_misses");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.to_async(&rt).iter(|| async move {
                let cache = Cache::new(
                    |Key(k)| async move { Ok::<u64, String>(k) },
                    CacheConfig::unbounded(),
                );
                for i in 0..size {
                    black_box(cache.get(Key(i)).await.unwrap());
                }
            });
        });
    }

    group.finish();
}

fn bench_cache_hits(c: &mut Criterion) {
    let rt = rt();
    let mut group = c.benchmark_group("get_cache_hits");

    for size in [10, 100, 1000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let cache = Arc::new(rt.block_on(async {
                let cache = Cache::new(
                    |Key(k)| async move { Ok::<u64, String>(k) },
                    CacheConfig::unbounded(),
                );
                cache.get(Key(0)).await.unwrap();
                cache
            }));
            b.to_async(&rt).iter(|| {
                let cache = cache.clone();
                async move {
                    for _ in 0..size {
                        black_box(cache.get(Key(0)).await.unwrap());
                    }
                }
            });
        });
    }

    group.finish();
}

fn bench_dedup_burst(c: &mut Criterion) {
    let rt = rt();
    let mut group = c.benchmark_group("get_dedup_burst");

    for concurrency in [10, 50, 200].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(concurrency),
            concurrency,
            |b, &concurrency| {
                b.to_async(&rt).iter(|| async move {
                    let cache = Cache::new(
                        |Key(k)| async move {
                            tokio::task::yield_now().await;
                            Ok::<u64, String>(k)
                        },
                        CacheConfig::unbounded(),
                    );
                    let mut handles = Vec::with_capacity(concurrency);
                    for _ in 0..concurrency {
                        let cache = cache.clone();
                        handles.push(tokio::spawn(async move { cache.get(Key(1)).await }));
                    }
                    for h in handles {
                        black_box(h.await.unwrap().unwrap());
                    }
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_fingerprint,
    bench_unique_misses,
    bench_cache_hits,
    bench_dedup_burst
);
criterion_main!(benches);
