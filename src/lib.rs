//! # flightcache
//!
//! An async, single-flight memoizing cache: concurrent requests for the same
//! (fingerprinted) input share one in-flight fetch instead of stampeding the backing
//! resource, resolved values expire and get evicted per policy, and the whole thing
//! exposes a live efficiency/performance/health view.
//!
//! ## Features
//!
//! - **Single-flight deduplication**: N concurrent callers for the same key, one fetch
//! - **Order-independent fingerprinting**: stable keys regardless of field order, via `serde`
//! - **TTL and idle expiration**: entries age out on their own schedule
//! - **Concurrency-limited fetching**: bound how many fetches run at once, with FIFO admission
//! - **Fetch timeouts**: a slow fetch unblocks every waiter with a timeout error, not a hang
//! - **Memory-pressure eviction**: a background sweeper frees the coldest, largest entries first
//! - **Seeding**: install a resolved value, a resolved error, or an already-running future directly
//! - **Observable**: hit rate, latency percentiles, health score, and trend via `statistics()`
//!
//! ## Quick start
//!
//! ```rust
//! use flightcache::{Cache, CacheConfig};
//! use flightcache::fingerprint::DefaultFingerprint;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct Query { user_id: u64 }
//! impl DefaultFingerprint for Query {}
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Cache::new(
//!         |q: Query| async move { Ok::<_, String>(format!("profile-{}", q.user_id)) },
//!         CacheConfig::unbounded(),
//!     );
//!
//!     // First call runs the fetch; a concurrent second call for the same user_id
//!     // would join the same in-flight future instead of fetching again.
//!     let profile = cache.get(Query { user_id: 7 }).await.unwrap();
//!     assert_eq!(*profile, "profile-7");
//! }
//! ```
//!
//! ## Custom fingerprinting
//!
//! Types that don't implement `Serialize`, or whose cache key should differ from
//! their full value, can supply their own fingerprinting function:
//!
//! ```rust
//! use flightcache::{Cache, CacheConfig};
//!
//! struct Request { path: String, admin_override: bool }
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Cache::with_fingerprinter(
//!         |req: Request| async move { Ok::<_, String>(req.path.to_uppercase()) },
//!         CacheConfig::unbounded(),
//!         // the override flag never affects the key: both variants share a fetch
//!         |req: &Request| Ok(req.path.clone()),
//!     );
//!     let a = cache
//!         .get(Request { path: "/health".into(), admin_override: false })
//!         .await
//!         .unwrap();
//!     assert_eq!(*a, "/HEALTH".to_string());
//! }
//! ```
//!
//! ## Policies
//!
//! ```rust
//! use flightcache::CacheConfig;
//! use std::time::Duration;
//!
//! let config = CacheConfig::builder()
//!     .ttl(Duration::from_secs(60))
//!     .idle_timeout(Duration::from_secs(300))
//!     .concurrency_limit(8)
//!     .fetch_timeout(Duration::from_secs(5))
//!     .max_memory_bytes(64 * 1024 * 1024)
//!     .low_water_bytes(48 * 1024 * 1024)
//!     .build();
//! ```
//!
//! ## Error handling
//!
//! `get`/`get_force` return `Result<Arc<O>, CacheError<E>>`: a [`CacheError::Fetch`]
//! wraps whatever error your fetch function produced, [`CacheError::Timeout`] means the
//! configured fetch timeout elapsed, and [`CacheError::Fingerprint`] means the input
//! itself couldn't be turned into a stable key.
//!
//! ```rust
//! use flightcache::{Cache, CacheConfig, CacheError};
//!
//! #[tokio::main]
//! async fn main() {
//!     let cache = Cache::with_fingerprinter(
//!         |n: i32| async move {
//!             if n == 0 { Err("division by zero".to_string()) } else { Ok(100 / n) }
//!         },
//!         CacheConfig::unbounded(),
//!         |n: &i32| Ok(n.to_string()),
//!     );
//!     match cache.get(0).await {
//!         Err(CacheError::Fetch(msg)) => assert_eq!(msg, "division by zero"),
//!         other => panic!("expected a fetch error, got {other:?}"),
//!     }
//! }
//! ```

pub use flightcache_core::*;
