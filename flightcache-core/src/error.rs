use std::time::Duration;
use thiserror::Error;

/// Failure modes of the canonicalization pipeline.
///
/// Produced by [`crate::fingerprint::Fingerprintable`] implementations when an input
/// cannot be turned into a stable key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FingerprintError {
    /// The input's structure nested deeper than the canonicalizer is willing to walk.
    #[error("fingerprint depth exceeded limit of {limit}")]
    DepthExceeded {
        /// The configured depth bound that was hit.
        limit: usize,
    },
    /// The input contains a shape the canonicalizer has no rule for (e.g. NaN, a raw pointer).
    #[error("fingerprint unsupported: {reason}")]
    Unsupported {
        /// Human-readable explanation of why the value could not be canonicalized.
        reason: String,
    },
}

/// The error surfaced to callers of [`crate::cache::Cache`]'s public operations.
///
/// Generic over `E`, the error type returned by the caller-supplied fetch function.
/// Double-resolution of a task's slot is a usage bug, not a runtime condition, so it
/// is never represented here: it panics instead (see [`crate::slot::Slot`]).
#[derive(Debug, Error)]
pub enum CacheError<E> {
    /// The input could not be canonicalized into a fingerprint.
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] FingerprintError),
    /// The fetch function returned an error for this input.
    #[error("fetch failed: {0}")]
    Fetch(E),
    /// The task did not complete within its configured timeout.
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),
}

impl<E: Clone> Clone for CacheError<E> {
    fn clone(&self) -> Self {
        match self {
            CacheError::Fingerprint(e) => CacheError::Fingerprint(e.clone()),
            CacheError::Fetch(e) => CacheError::Fetch(e.clone()),
            CacheError::Timeout(d) => CacheError::Timeout(*d),
        }
    }
}

/// The error a [`crate::task::Task`]'s slot resolves with. Distinct from
/// [`CacheError`]: a task never observes a `Fingerprint` failure (that happens
/// before a task is created), so it only needs to distinguish its own fetch from a
/// timeout cutting that fetch short.
#[derive(Debug, Clone)]
pub enum TaskError<E> {
    Fetch(E),
    Timeout(Duration),
}

impl<E> TaskError<E> {
    pub fn into_cache_error(self) -> CacheError<E> {
        match self {
            TaskError::Fetch(e) => CacheError::Fetch(e),
            TaskError::Timeout(d) => CacheError::Timeout(d),
        }
    }
}
