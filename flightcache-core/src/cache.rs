//! The public facade tying fingerprinting, the task store, admission, sweeping, and
//! metrics together into a single async memoizing cache.

use crate::config::{CacheConfig, ErrorTaskPolicy};
use crate::error::{CacheError, FingerprintError};
use crate::fingerprint::Fingerprintable;
use crate::metrics::Metrics;
use crate::scheduler::Scheduler;
use crate::size::ByteSize;
use crate::statistics::{self, Statistics};
use crate::store::Store;
use crate::sweeper::{self, Sweeper};
use crate::task::Task;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// A boxed, type-erased future, used to accept an already-in-flight fetch from
/// [`Cache::set`] without naming its concrete type.
pub type BoxFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;

/// What to seed a fingerprint with via [`Cache::set`].
pub enum SeedValue<O, E> {
    /// Install an already-resolved value or error, as if a fetch had just completed.
    Resolved(Result<O, E>),
    /// Install a fetch that is already running; the cache drives it to completion
    /// exactly as it would one of its own, sharing the result with every waiter.
    Pending(BoxFuture<Result<O, E>>),
}

struct Inner<I, O, E, F> {
    store: Store<I, O, E>,
    scheduler: Scheduler,
    metrics: Metrics,
    sweeper: Sweeper,
    config: CacheConfig,
    fetch: F,
    fingerprint_of: Box<dyn Fn(&I) -> Result<String, FingerprintError> + Send + Sync>,
}

/// An async, single-flight memoizing cache: concurrent requests for the same
/// (fingerprinted) input share one fetch, resolved entries expire and get evicted per
/// [`CacheConfig`], and everything is observable through [`Cache::statistics`].
pub struct Cache<I, O, E, F> {
    inner: Arc<Inner<I, O, E, F>>,
}

impl<I, O, E, F> Clone for Cache<I, O, E, F> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<I, O, E, F, Fut> Cache<I, O, E, F>
where
    I: Fingerprintable + Send + Sync + 'static,
    O: ByteSize + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
{
    /// Build a cache whose fingerprint is derived from `I`'s own
    /// [`Fingerprintable`] implementation.
    pub fn new(fetch: F, config: CacheConfig) -> Self {
        Self::with_fingerprinter(fetch, config, |input: &I| input.fingerprint())
    }
}

impl<I, O, E, F, Fut> Cache<I, O, E, F>
where
    I: Send + Sync + 'static,
    O: ByteSize + Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
{
    /// Build a cache with a custom fingerprinting function, for inputs that don't
    /// implement [`Fingerprintable`] or whose key should differ from their value.
    pub fn with_fingerprinter(
        fetch: F,
        config: CacheConfig,
        fingerprint_of: impl Fn(&I) -> Result<String, FingerprintError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store: Store::new(),
                scheduler: Scheduler::new(config.fetching_policy.concurrency_limit),
                metrics: Metrics::new(),
                sweeper: Sweeper::new(),
                config,
                fetch,
                fingerprint_of: Box::new(fingerprint_of),
            }),
        }
    }

    fn fingerprint(&self, input: &I) -> Result<String, FingerprintError> {
        (self.inner.fingerprint_of)(input)
    }

    async fn ensure_sweeper_started(&self) {
        let interval = self.inner.config.sweep_interval;
        let inner = self.inner.clone();
        self.inner
            .sweeper
            .ensure_started(interval, move || {
                sweeper::sweep_once(
                    &inner.store,
                    &inner.metrics,
                    &inner.config.free_up_memory_policy,
                );
            })
            .await;
    }

    /// Fetch the value for `input`, reusing an in-flight or cached fetch for the same
    /// fingerprint if one exists and hasn't expired.
    pub async fn get(&self, input: I) -> Result<Arc<O>, CacheError<E>> {
        self.get_impl(input, false).await
    }

    /// Like [`Cache::get`], but discards any existing entry first, always triggering
    /// a fresh fetch.
    pub async fn get_force(&self, input: I) -> Result<Arc<O>, CacheError<E>> {
        self.get_impl(input, true).await
    }

    async fn get_impl(&self, input: I, force: bool) -> Result<Arc<O>, CacheError<E>> {
        let fp = self.fingerprint(&input)?;
        self.ensure_sweeper_started().await;

        if force {
            if let Some(old) = self.inner.store.remove(&fp) {
                self.inner.metrics.add_released_bytes(old.bytes());
            }
        } else if let Some(existing) = self.inner.store.get(&fp) {
            if existing.is_expired() {
                self.inner.store.remove_if_same(&fp, &existing);
                self.inner.metrics.add_released_bytes(existing.bytes());
            }
        }

        let (task, is_hit) = match self.inner.store.get(&fp) {
            Some(t) => (t, true),
            None => {
                let task = Arc::new(Task::new(input, self.inner.config.cache_policy));
                let (winner, inserted) = self.inner.store.insert_if_absent(fp.clone(), task);
                if inserted {
                    self.inner.scheduler.enqueue(fp.clone());
                    admit(&self.inner);
                }
                (winner, !inserted)
            }
        };

        if is_hit {
            self.inner.metrics.record_hit();
        } else {
            self.inner.metrics.record_miss();
        }
        tracing::trace!(fingerprint = %fp, hit = is_hit, "cache lookup");

        let started = std::time::Instant::now();
        let result = task.output().await;
        let elapsed = started.elapsed();
        if is_hit {
            self.inner.metrics.record_cached_latency(elapsed);
        } else {
            self.inner.metrics.record_fetch_latency(elapsed);
        }

        match result {
            Ok(value) => Ok(finalize(value, self.inner.config.fetching_policy.use_clones)),
            Err(err) => {
                self.inner.metrics.record_error();
                Err((*err).clone().into_cache_error())
            }
        }
    }

    /// True if the store holds an entry for `input`, in any status (including
    /// expired-but-not-yet-swept). Does not trigger a fetch.
    pub fn has(&self, input: &I) -> Result<bool, FingerprintError> {
        let fp = self.fingerprint(input)?;
        Ok(self.inner.store.contains(&fp))
    }

    /// Remove the entry for `input`, if any. Returns whether an entry was removed.
    pub fn delete(&self, input: &I) -> Result<bool, FingerprintError> {
        let fp = self.fingerprint(input)?;
        match self.inner.store.remove(&fp) {
            Some(old) => {
                self.inner.metrics.add_released_bytes(old.bytes());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Seed the entry for `input` directly, bypassing the fetch function.
    ///
    /// `value = None` clears any existing entry and re-queues a fresh fetch for the
    /// next reader. [`SeedValue::Resolved`] installs an already-completed result as
    /// if a fetch had just finished. [`SeedValue::Pending`] hands the cache an
    /// already-running future to drive to completion and share with every waiter,
    /// exactly like one it started itself.
    pub async fn set(
        &self,
        input: I,
        value: Option<SeedValue<O, E>>,
    ) -> Result<(), FingerprintError> {
        let fp = self.fingerprint(&input)?;
        self.ensure_sweeper_started().await;
        if let Some(old) = self.inner.store.remove(&fp) {
            self.inner.metrics.add_released_bytes(old.bytes());
        }

        match value {
            None => {
                let task = Arc::new(Task::new(input, self.inner.config.cache_policy));
                self.inner.store.insert(fp.clone(), task);
                self.inner.scheduler.enqueue(fp);
                admit(&self.inner);
            }
            Some(SeedValue::Resolved(Ok(v))) => {
                let task = Arc::new(Task::seeded_ok(input, self.inner.config.cache_policy, v));
                self.inner.store.insert(fp, task);
            }
            Some(SeedValue::Resolved(Err(e))) => {
                if self.inner.config.cache_policy.error_policy == ErrorTaskPolicy::Cache {
                    let task =
                        Arc::new(Task::seeded_err(input, self.inner.config.cache_policy, e));
                    self.inner.store.insert(fp, task);
                }
                // Ignore policy: leave no entry behind; the next get() starts fresh.
            }
            Some(SeedValue::Pending(fut)) => {
                let task = Arc::new(Task::pre_started(input, self.inner.config.cache_policy));
                self.inner.store.insert(fp.clone(), task.clone());
                self.inner.scheduler.mark_externally_running();
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    run_fetch(&inner, &fp, &task, fut).await;
                });
            }
        }
        Ok(())
    }

    /// Drop every entry, cancel the background sweeper, and reset metrics. In-flight
    /// fetches already running continue to completion but their results are
    /// discarded by the cache.
    pub async fn clear(&self) {
        self.inner.store.clear();
        self.inner.scheduler.clear();
        self.inner.metrics.reset();
        self.inner.sweeper.stop().await;
    }

    /// Fingerprints of every entry currently tracked, regardless of status.
    pub fn keys(&self) -> Vec<String> {
        self.inner.store.keys()
    }

    /// A point-in-time efficiency, performance, and health snapshot.
    pub fn statistics(&self) -> Statistics {
        let snapshot = self.inner.store.snapshot();
        statistics::compute(
            &snapshot,
            &self.inner.metrics,
            &self.inner.config,
            self.inner.scheduler.running_count(),
            self.inner.scheduler.pending_len(),
        )
    }
}

fn finalize<O: Clone>(value: Arc<O>, use_clones: bool) -> Arc<O> {
    if use_clones {
        Arc::new((*value).clone())
    } else {
        value
    }
}

/// Admit as many queued tasks as the concurrency cap allows and spawn a driver for
/// each newly admitted one.
fn admit<I, O, E, F, Fut>(inner: &Arc<Inner<I, O, E, F>>)
where
    I: Send + Sync + 'static,
    O: ByteSize + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
{
    let admitted = inner.scheduler.admit(|fp| match inner.store.get(fp) {
        Some(t) => t.begin(),
        None => false,
    });
    inner
        .metrics
        .update_peak_concurrency(inner.scheduler.running_count());
    for fp in admitted {
        let Some(task) = inner.store.get(&fp) else {
            continue;
        };
        let inner = inner.clone();
        tokio::spawn(async move {
            drive(inner, fp, task).await;
        });
    }
}

async fn drive<I, O, E, F, Fut>(inner: Arc<Inner<I, O, E, F>>, fingerprint: String, task: Arc<Task<I, O, E>>)
where
    I: Send + Sync + 'static,
    O: ByteSize + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
{
    let input = match task.take_input() {
        Some(i) => i,
        None => {
            // Nothing left to take: another path (e.g. `set`'s Pending seed) already
            // owns driving this task. Nothing to do here.
            finish(&inner);
            return;
        }
    };
    let fut = (inner.fetch)(input);
    run_fetch(&inner, &fingerprint, &task, fut).await;
}

async fn run_fetch<I, O, E, F, Fut, Fut2>(
    inner: &Arc<Inner<I, O, E, F>>,
    fingerprint: &str,
    task: &Arc<Task<I, O, E>>,
    fut: Fut,
) where
    I: Send + Sync + 'static,
    O: ByteSize + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn(I) -> Fut2 + Send + Sync + 'static,
    Fut2: Future<Output = Result<O, E>> + Send + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
{
    let outcome = match inner.config.fetching_policy.timeout {
        Some(budget) => tokio::time::timeout(budget, fut).await,
        None => Ok(fut.await),
    };
    match outcome {
        Ok(Ok(value)) => {
            task.complete_ok(value);
            tracing::trace!(fingerprint, "fetch resolved");
        }
        Ok(Err(error)) => {
            task.complete_err(error);
            inner.metrics.record_error();
            tracing::warn!(fingerprint, "fetch failed");
            drop_if_ignored(inner, fingerprint, task);
        }
        Err(_) => {
            let budget = inner.config.fetching_policy.timeout.unwrap_or_default();
            task.complete_timeout(budget);
            inner.metrics.record_timeout();
            tracing::warn!(fingerprint, ?budget, "fetch timed out");
            drop_if_ignored(inner, fingerprint, task);
        }
    }
    finish(inner);
}

fn drop_if_ignored<I, O, E, F>(inner: &Arc<Inner<I, O, E, F>>, fingerprint: &str, task: &Arc<Task<I, O, E>>) {
    if inner.config.cache_policy.error_policy == ErrorTaskPolicy::Ignore {
        inner.store.remove_if_same(fingerprint, task);
    }
}

fn finish<I, O, E, F, Fut>(inner: &Arc<Inner<I, O, E, F>>)
where
    I: Send + Sync + 'static,
    O: ByteSize + Send + Sync + 'static,
    E: Send + Sync + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, E>> + Send + 'static,
{
    inner.scheduler.on_complete();
    inner
        .metrics
        .update_peak_concurrency(inner.scheduler.running_count());
    admit(inner);
}
