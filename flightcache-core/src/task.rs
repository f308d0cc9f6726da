//! The unit of in-flight and cached work tracked by a [`crate::cache::Cache`].
//!
//! A task's lifecycle state is never stored directly; it is always derived from a
//! handful of timestamps, an error flag, and the configured policy. This keeps the
//! state machine impossible to desynchronize from the data it is computed over.

use crate::config::{CachePolicy, ErrorTaskPolicy};
use crate::error::TaskError;
use crate::score::{default_score, ScoreFn, ScoreSnapshot};
use crate::size::ByteSize;
use crate::slot::{Slot, SlotResult};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const UNSET: u64 = u64::MAX;

/// The derived lifecycle state of a [`Task`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Created, enqueued, not yet admitted to run.
    Queued,
    /// Admitted and fetching.
    Running,
    /// Resolved successfully and still within its freshness window.
    Active,
    /// Resolved with an error, retained per [`ErrorTaskPolicy::Cache`].
    Failed,
    /// Resolved (successfully or not) but past its TTL or idle window.
    Expired,
}

/// A single tracked unit of memoized work for input `I` producing `Result<O, E>`.
///
/// The slot stores [`TaskError<E>`] rather than `E` directly so that a fetch timeout
/// — which has no value of type `E` to report — can still resolve the slot and
/// unblock every waiter instead of leaving them stuck forever.
pub struct Task<I, O, E> {
    input: Mutex<Option<I>>,
    slot: Slot<O, TaskError<E>>,
    created_at: Instant,
    last_access_nanos: AtomicU64,
    fetch_started_nanos: AtomicU64,
    resolved_nanos: AtomicU64,
    started: AtomicBool,
    bytes: AtomicUsize,
    use_count: AtomicU64,
    policy: CachePolicy,
}

impl<I, O, E> Task<I, O, E> {
    /// Create a new, unstarted task wrapping `input`.
    pub fn new(input: I, policy: CachePolicy) -> Self {
        Self {
            input: Mutex::new(Some(input)),
            slot: Slot::new(),
            created_at: Instant::now(),
            last_access_nanos: AtomicU64::new(0),
            fetch_started_nanos: AtomicU64::new(UNSET),
            resolved_nanos: AtomicU64::new(UNSET),
            started: AtomicBool::new(false),
            bytes: AtomicUsize::new(0),
            use_count: AtomicU64::new(0),
            policy,
        }
    }

    /// Create a task that is already resolved with a successful value.
    pub fn seeded_ok(input: I, policy: CachePolicy, value: O) -> Self
    where
        O: ByteSize,
    {
        let task = Self::new(input, policy);
        task.started.store(true, Ordering::Release);
        task.mark_fetch_started();
        task.complete_ok(value);
        task
    }

    /// Create a task that is already resolved with an error.
    pub fn seeded_err(input: I, policy: CachePolicy, error: E) -> Self {
        let task = Self::new(input, policy);
        task.started.store(true, Ordering::Release);
        task.mark_fetch_started();
        task.complete_err(error);
        task
    }

    /// Create a task that is already RUNNING, its input already claimed (used when
    /// seeding a cache entry with an in-flight future rather than the cache's own
    /// fetch function).
    pub fn pre_started(input: I, policy: CachePolicy) -> Self {
        let task = Self::new(input, policy);
        task.started.store(true, Ordering::Release);
        task.mark_fetch_started();
        task
    }

    fn elapsed_nanos(&self) -> u64 {
        self.created_at.elapsed().as_nanos().min(u128::from(UNSET - 1)) as u64
    }

    fn mark_fetch_started(&self) {
        self.fetch_started_nanos
            .store(self.elapsed_nanos(), Ordering::Relaxed);
    }

    /// Attempt to transition this task from not-yet-admitted to RUNNING. Returns
    /// `true` exactly once, for whichever caller wins the race; idempotent.
    pub fn begin(&self) -> bool {
        let won = self
            .started
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.mark_fetch_started();
        }
        won
    }

    /// Take ownership of the input. Consumable exactly once: ownership transfers to
    /// the fetch call that runs this task, so later callers see `None`.
    pub fn take_input(&self) -> Option<I> {
        self.input.lock().take()
    }

    /// Record a successful resolution.
    pub fn complete_ok(&self, value: O)
    where
        O: ByteSize,
    {
        let bytes = value.byte_size();
        self.bytes.store(bytes, Ordering::Relaxed);
        self.resolved_nanos
            .store(self.elapsed_nanos(), Ordering::Relaxed);
        self.slot.resolve(value);
    }

    /// Record a failed fetch.
    pub fn complete_err(&self, error: E) {
        self.resolved_nanos
            .store(self.elapsed_nanos(), Ordering::Relaxed);
        self.slot.reject(TaskError::Fetch(error));
    }

    /// Record a fetch that ran out of time. Still resolves the slot so every
    /// waiter, not just the one driving the fetch, unblocks with the timeout error.
    pub fn complete_timeout(&self, budget: Duration) {
        self.resolved_nanos
            .store(self.elapsed_nanos(), Ordering::Relaxed);
        self.slot.reject(TaskError::Timeout(budget));
    }

    /// Record a read, bumping the use count and refreshing the idle clock.
    pub fn touch(&self) {
        self.use_count.fetch_add(1, Ordering::Relaxed);
        self.last_access_nanos
            .store(self.elapsed_nanos(), Ordering::Relaxed);
    }

    pub fn use_count(&self) -> u64 {
        self.use_count.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> usize {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// Wait for this task's slot, recording the read.
    pub async fn output(&self) -> SlotResult<O, TaskError<E>> {
        self.touch();
        self.slot.wait().await
    }

    /// Return the result immediately if already resolved, without waiting.
    pub fn try_output(&self) -> Option<SlotResult<O, TaskError<E>>> {
        self.slot.try_get()
    }

    /// Whether this task's fetch has already been admitted (RUNNING or later).
    pub fn has_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    fn is_resolved(&self) -> bool {
        self.resolved_nanos.load(Ordering::Relaxed) != UNSET
    }

    fn resolved_is_err(&self) -> bool {
        self.slot.try_get().map(|r| r.is_err()).unwrap_or(false)
    }

    /// Derive this task's current status from its timestamps and the active policy.
    pub fn status(&self) -> TaskStatus {
        if !self.is_resolved() {
            if self.has_started() {
                return TaskStatus::Running;
            }
            return TaskStatus::Queued;
        }
        if self.resolved_is_err() && self.policy.error_policy == ErrorTaskPolicy::Ignore {
            return TaskStatus::Expired;
        }
        if self.is_expired_now() {
            return TaskStatus::Expired;
        }
        if self.resolved_is_err() {
            TaskStatus::Failed
        } else {
            TaskStatus::Active
        }
    }

    fn is_expired_now(&self) -> bool {
        let now = self.elapsed_nanos();
        if let Some(ttl) = self.policy.ttl {
            let resolved = self.resolved_nanos.load(Ordering::Relaxed);
            if resolved != UNSET && now.saturating_sub(resolved) as u128 >= ttl.as_nanos() {
                return true;
            }
        }
        if let Some(idle) = self.policy.idle_timeout {
            let last = self.last_access_nanos.load(Ordering::Relaxed);
            let reference = if last == 0 {
                self.resolved_nanos.load(Ordering::Relaxed)
            } else {
                last
            };
            if reference != UNSET && now.saturating_sub(reference) as u128 >= idle.as_nanos() {
                return true;
            }
        }
        false
    }

    /// True if this task is safe to read from without being replaced: not expired.
    pub fn is_expired(&self) -> bool {
        matches!(self.status(), TaskStatus::Expired)
    }

    /// A monotone eviction score: higher means more valuable, evicted last. Uses
    /// `score_fn` if supplied (a [`crate::config::FreeUpMemoryPolicy::score_fn`]
    /// override), otherwise [`default_score`].
    pub fn eviction_score(&self, score_fn: Option<&ScoreFn>) -> f64 {
        let now = self.elapsed_nanos();
        let last_access = self.last_access_nanos.load(Ordering::Relaxed);
        let idle_for = if last_access == UNSET || last_access == 0 {
            now
        } else {
            now.saturating_sub(last_access)
        };
        let snapshot = ScoreSnapshot {
            use_count: self.use_count(),
            bytes: self.bytes(),
            age: Duration::from_nanos(now),
            idle: Duration::from_nanos(idle_for),
            ttl: self.policy.ttl,
        };
        match score_fn {
            Some(f) => f(&snapshot),
            None => default_score(&snapshot),
        }
    }
}
