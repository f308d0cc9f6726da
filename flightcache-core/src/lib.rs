//! Async, single-flight memoizing cache.
//!
//! ```
//! use flightcache_core::{Cache, CacheConfig};
//! use flightcache_core::fingerprint::DefaultFingerprint;
//! use serde::Serialize;
//!
//! #[derive(Serialize)]
//! struct UserId(u64);
//! impl DefaultFingerprint for UserId {}
//!
//! # async fn run() {
//! let cache = Cache::new(
//!     |UserId(id)| async move { Ok::<_, String>(format!("user-{id}")) },
//!     CacheConfig::unbounded(),
//! );
//! let name = cache.get(UserId(7)).await.unwrap();
//! assert_eq!(*name, "user-7");
//! # }
//! ```
//!
//! Concurrent [`Cache::get`] calls for the same fingerprinted input share a single
//! in-flight fetch; later calls reuse the resolved (and still fresh) result instead
//! of refetching. See [`CacheConfig`] for TTL, idle-timeout, concurrency, timeout,
//! and memory-pressure eviction knobs, and [`Cache::statistics`] for the resulting
//! efficiency/performance/health view.

pub mod cache;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod metrics;
pub mod scheduler;
pub mod score;
pub mod size;
pub mod slot;
pub mod statistics;
pub mod store;
pub mod sweeper;
pub mod task;

pub use cache::{BoxFuture, Cache, SeedValue};
pub use config::{CacheConfig, CacheConfigBuilder, CachePolicy, ErrorTaskPolicy, FetchingPolicy, FreeUpMemoryPolicy};
pub use error::{CacheError, FingerprintError, TaskError};
pub use fingerprint::{DefaultFingerprint, Fingerprintable, JsonInput};
pub use metrics::{HealthStatus, Trend};
pub use score::{default_score, ScoreFn, ScoreSnapshot};
pub use size::ByteSize;
pub use statistics::Statistics;
pub use task::TaskStatus;
