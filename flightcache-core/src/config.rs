//! User-facing configuration for a [`crate::cache::Cache`] instance.
//!
//! Shaped after the builder + named-constructor pattern the workspace already uses
//! for eviction policies, extended with the validation behavior the spec calls for:
//! an invalid bound falls back to its default rather than producing a constructor
//! error, since misconfiguration should degrade gracefully, not take the cache down.

use crate::score::{ScoreFn, ScoreSnapshot};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// How long an entry may remain resolved before it expires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorTaskPolicy {
    /// A failed fetch is cached like any other result until it expires normally.
    Cache,
    /// A failed fetch is discarded as soon as its current readers have observed it,
    /// so the next caller triggers a fresh attempt.
    Ignore,
}

impl Default for ErrorTaskPolicy {
    fn default() -> Self {
        ErrorTaskPolicy::Ignore
    }
}

/// Expiration and error-retention rules applied to resolved entries.
#[derive(Debug, Clone, Copy)]
pub struct CachePolicy {
    /// Time-to-live measured from resolution. `None` disables TTL-based expiration.
    pub ttl: Option<Duration>,
    /// Idle timeout measured from the last read. `None` disables idle expiration.
    pub idle_timeout: Option<Duration>,
    /// What happens to a task that resolved with an error.
    pub error_policy: ErrorTaskPolicy,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: None,
            idle_timeout: None,
            error_policy: ErrorTaskPolicy::default(),
        }
    }
}

/// Admission rules governing how many fetches may run concurrently and how long any
/// single fetch is allowed to take.
#[derive(Debug, Clone, Copy)]
pub struct FetchingPolicy {
    /// Maximum number of concurrently RUNNING tasks. Zero or negative means unlimited;
    /// represented here as `0` since the field is unsigned.
    pub concurrency_limit: usize,
    /// Maximum duration a single fetch may run before it is treated as timed out.
    /// `None` disables the timeout.
    pub timeout: Option<Duration>,
    /// Whether reads hand back a shared reference to the cached value (cheap) or a
    /// deep copy via `Clone` (isolated from later mutation of the shared value).
    pub use_clones: bool,
}

impl Default for FetchingPolicy {
    fn default() -> Self {
        Self {
            concurrency_limit: 0,
            timeout: None,
            use_clones: false,
        }
    }
}

/// Memory-pressure eviction rules applied by the background sweeper.
#[derive(Clone)]
pub struct FreeUpMemoryPolicy {
    /// Soft ceiling, in bytes, that triggers an eviction pass when exceeded.
    /// Zero means "evict down to `low_water_bytes` whenever any bytes are resident".
    /// Defaults to `u64::MAX`, i.e. no cap.
    pub max_memory_bytes: u64,
    /// Target the eviction pass evicts down to once triggered.
    pub low_water_bytes: u64,
    /// Overrides the default eviction-score formula. `None` uses
    /// [`crate::score::default_score`].
    pub score_fn: Option<ScoreFn>,
}

impl fmt::Debug for FreeUpMemoryPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FreeUpMemoryPolicy")
            .field("max_memory_bytes", &self.max_memory_bytes)
            .field("low_water_bytes", &self.low_water_bytes)
            .field("score_fn", &self.score_fn.as_ref().map(|_| "<custom>"))
            .finish()
    }
}

impl Default for FreeUpMemoryPolicy {
    fn default() -> Self {
        Self {
            max_memory_bytes: u64::MAX,
            low_water_bytes: 0,
            score_fn: None,
        }
    }
}

/// Top-level cache configuration.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub cache_policy: CachePolicy,
    pub fetching_policy: FetchingPolicy,
    pub free_up_memory_policy: FreeUpMemoryPolicy,
    /// How often the background sweeper runs. Enforced to never go below
    /// [`CacheConfig::MIN_SWEEP_INTERVAL`].
    pub sweep_interval: Duration,
}

impl CacheConfig {
    /// The floor below which a configured sweep interval is clamped back to default.
    pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1000);

    /// Start building a configuration from defaults.
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::default()
    }

    /// A cache with no TTL, no idle timeout, no concurrency cap, and no memory cap.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// A cache whose entries expire `ttl` after resolving, otherwise defaulted.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            cache_policy: CachePolicy {
                ttl: Some(ttl),
                ..CachePolicy::default()
            },
            ..Self::default()
        }
    }

    fn validated(mut self) -> Self {
        if self.sweep_interval < Self::MIN_SWEEP_INTERVAL {
            self.sweep_interval = Self::MIN_SWEEP_INTERVAL;
        }
        if self.free_up_memory_policy.low_water_bytes > self.free_up_memory_policy.max_memory_bytes
            && self.free_up_memory_policy.max_memory_bytes != 0
        {
            self.free_up_memory_policy = FreeUpMemoryPolicy::default();
        }
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_policy: CachePolicy::default(),
            fetching_policy: FetchingPolicy::default(),
            free_up_memory_policy: FreeUpMemoryPolicy::default(),
            sweep_interval: Self::MIN_SWEEP_INTERVAL,
        }
        .validated()
    }
}

/// Fluent builder for [`CacheConfig`].
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.config.cache_policy.ttl = Some(ttl);
        self
    }

    pub fn idle_timeout(mut self, idle: Duration) -> Self {
        self.config.cache_policy.idle_timeout = Some(idle);
        self
    }

    pub fn error_policy(mut self, policy: ErrorTaskPolicy) -> Self {
        self.config.cache_policy.error_policy = policy;
        self
    }

    pub fn concurrency_limit(mut self, limit: usize) -> Self {
        self.config.fetching_policy.concurrency_limit = limit;
        self
    }

    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.config.fetching_policy.timeout = Some(timeout);
        self
    }

    pub fn use_clones(mut self, use_clones: bool) -> Self {
        self.config.fetching_policy.use_clones = use_clones;
        self
    }

    pub fn max_memory_bytes(mut self, max: u64) -> Self {
        self.config.free_up_memory_policy.max_memory_bytes = max;
        self
    }

    pub fn low_water_bytes(mut self, low: u64) -> Self {
        self.config.free_up_memory_policy.low_water_bytes = low;
        self
    }

    /// Override the default eviction-score formula. Higher means more valuable
    /// (evicted later); the sweeper evicts ascending by score.
    pub fn score_fn(mut self, f: impl Fn(&ScoreSnapshot) -> f64 + Send + Sync + 'static) -> Self {
        self.config.free_up_memory_policy.score_fn = Some(Arc::new(f));
        self
    }

    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.config.sweep_interval = interval;
        self
    }

    pub fn build(self) -> CacheConfig {
        self.config.validated()
    }
}
