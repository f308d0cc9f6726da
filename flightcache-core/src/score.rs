//! The pluggable eviction-scoring function threaded through
//! [`crate::config::FreeUpMemoryPolicy`].
//!
//! Higher score means more valuable (evicted last); the sweeper sorts active tasks
//! ascending by score and evicts from the front.

use std::sync::Arc;
use std::time::Duration;

/// Everything the default formula reads from a task, exposed so a caller's override
/// can reimplement or adjust it without reaching into task internals.
#[derive(Debug, Clone, Copy)]
pub struct ScoreSnapshot {
    pub use_count: u64,
    pub bytes: usize,
    /// Time since the task was created.
    pub age: Duration,
    /// Time since the task was last read. Equal to `age` if never read.
    pub idle: Duration,
    /// The task's configured TTL, if any.
    pub ttl: Option<Duration>,
}

/// A user-supplied eviction-score function. Held behind an `Arc` so
/// [`crate::config::FreeUpMemoryPolicy`] stays cheaply cloneable.
pub type ScoreFn = Arc<dyn Fn(&ScoreSnapshot) -> f64 + Send + Sync>;

/// `(usedCount * 1024) / max(bytes, 1) / timeScore`, where `timeScore` averages the
/// task's age and idle time against its TTL. A zero `timeScore` (no TTL configured,
/// or a task scored at the instant of creation) is treated as 1, so an entry is
/// scored purely on use count and size until it has a TTL window to age against.
pub fn default_score(snapshot: &ScoreSnapshot) -> f64 {
    let bytes = snapshot.bytes.max(1) as f64;
    let used = snapshot.use_count as f64;
    let time_score = match snapshot.ttl {
        Some(ttl) if ttl.as_millis() > 0 => {
            let age_ms = snapshot.age.as_millis() as f64;
            let idle_ms = snapshot.idle.as_millis() as f64;
            ((age_ms + idle_ms) / 2.0) / ttl.as_millis() as f64
        }
        _ => 0.0,
    };
    let time_score = if time_score == 0.0 { 1.0 } else { time_score };
    (used * 1024.0) / bytes / time_score
}
