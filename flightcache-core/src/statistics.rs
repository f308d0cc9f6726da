//! The read-only statistics view returned by [`crate::cache::Cache::statistics`].
//!
//! Grouped the way an operator actually looks at a cache: efficiency (is it
//! working), performance (is it fast), operations (what's in flight), memory (is it
//! full), inventory (what's inside), health (should I worry), temporal (how long has
//! this been running, is it trending worse).

use crate::config::CacheConfig;
use crate::metrics::{format_bytes, format_uptime, HealthStatus, Metrics, Trend};
use crate::size::ByteSize;
use crate::task::{Task, TaskStatus};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Efficiency {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub miss_rate: f64,
    pub total_reads: u64,
    pub total_fetches: u64,
}

#[derive(Debug, Clone)]
pub struct Performance {
    pub avg_cached_response_time: Duration,
    pub avg_fetch_response_time: Duration,
    pub p95_response_time: Duration,
    pub fastest_response: Duration,
    pub slowest_response: Duration,
    pub performance_gain: f64,
    pub time_saved: Duration,
}

#[derive(Debug, Clone)]
pub struct Operations {
    pub active_requests: usize,
    pub queued_requests: usize,
    pub concurrency_limit: usize,
    pub rejected_requests: u64,
    pub peak_concurrency: usize,
}

#[derive(Debug, Clone)]
pub struct Memory {
    pub current_usage_bytes: u64,
    /// `current_usage_bytes`, human-formatted (e.g. "12.0 KiB").
    pub current_usage: String,
    pub limit_bytes: u64,
    /// `limit_bytes`, human-formatted.
    pub limit: String,
    pub usage_percentage: f64,
    pub cleanup_count: u64,
    pub memory_reclaimed_bytes: u64,
    /// `memory_reclaimed_bytes`, human-formatted.
    pub memory_reclaimed: String,
}

#[derive(Debug, Clone)]
pub struct Inventory {
    pub total_items: usize,
    pub avg_item_usage: f64,
    pub max_item_usage: u64,
    pub min_item_usage: u64,
    pub single_use_items: usize,
    pub high_value_items: usize,
}

#[derive(Debug, Clone)]
pub struct Health {
    pub status: HealthStatus,
    pub score: f64,
    pub issues: Vec<String>,
    pub error_rate: f64,
    pub recent_errors: u64,
    pub timeouts: u64,
}

#[derive(Debug, Clone)]
pub struct Temporal {
    pub uptime: Duration,
    pub uptime_formatted: String,
    pub requests_per_minute: f64,
    pub trend: Trend,
}

/// A point-in-time snapshot of a cache's efficiency, performance, and health.
#[derive(Debug, Clone)]
pub struct Statistics {
    pub efficiency: Efficiency,
    pub performance: Performance,
    pub operations: Operations,
    pub memory: Memory,
    pub inventory: Inventory,
    pub health: Health,
    pub temporal: Temporal,
}

pub(crate) fn compute<I, O, E>(
    snapshot: &[(String, Arc<Task<I, O, E>>)],
    metrics: &Metrics,
    config: &CacheConfig,
    running: usize,
    queued: usize,
) -> Statistics
where
    O: ByteSize,
{
    let active_bytes: u64 = snapshot
        .iter()
        .filter(|(_, t)| t.status() == TaskStatus::Active)
        .map(|(_, t)| t.bytes() as u64)
        .sum();

    let limit = config.free_up_memory_policy.max_memory_bytes;
    let usage_percentage = if limit > 0 {
        (active_bytes as f64 / limit as f64) * 100.0
    } else if active_bytes > 0 {
        100.0
    } else {
        0.0
    };

    let score_fn = config.free_up_memory_policy.score_fn.as_ref();
    let use_counts: Vec<u64> = snapshot.iter().map(|(_, t)| t.use_count()).collect();
    let scores: Vec<f64> = snapshot
        .iter()
        .map(|(_, t)| t.eviction_score(score_fn))
        .collect();
    let mean_score = if scores.is_empty() {
        0.0
    } else {
        scores.iter().sum::<f64>() / scores.len() as f64
    };

    let total_reads = metrics.reads();
    let uptime = metrics.uptime();
    let requests_per_minute = if uptime.as_secs_f64() > 0.0 {
        total_reads as f64 / (uptime.as_secs_f64() / 60.0)
    } else {
        0.0
    };

    let error_rate = if metrics.misses() > 0 {
        metrics.errors() as f64 / metrics.misses() as f64
    } else {
        0.0
    };
    let memory_pressure = if limit > 0 {
        active_bytes as f64 / limit as f64
    } else if active_bytes > 0 {
        1.0
    } else {
        0.0
    };
    let queue_pressure = if config.fetching_policy.concurrency_limit > 0 {
        queued as f64 / config.fetching_policy.concurrency_limit as f64
    } else {
        0.0
    };
    let (status, score, issues) = metrics.health(error_rate, memory_pressure, queue_pressure);

    Statistics {
        efficiency: Efficiency {
            hits: metrics.hits(),
            misses: metrics.misses(),
            hit_rate: metrics.hit_rate(),
            miss_rate: 1.0 - metrics.hit_rate(),
            total_reads,
            total_fetches: metrics.misses(),
        },
        performance: Performance {
            avg_cached_response_time: metrics.avg_cached_latency(),
            avg_fetch_response_time: metrics.avg_fetch_latency(),
            p95_response_time: metrics.p95_latency(),
            fastest_response: metrics.fastest_response(),
            slowest_response: metrics.slowest_response(),
            performance_gain: metrics.performance_gain(),
            time_saved: metrics.time_saved(),
        },
        operations: Operations {
            active_requests: running,
            queued_requests: queued,
            concurrency_limit: config.fetching_policy.concurrency_limit,
            rejected_requests: metrics.rejected(),
            peak_concurrency: metrics.peak_concurrency(),
        },
        memory: Memory {
            current_usage_bytes: active_bytes,
            current_usage: format_bytes(active_bytes),
            limit_bytes: limit,
            limit: format_bytes(limit),
            usage_percentage,
            cleanup_count: metrics.evictions(),
            memory_reclaimed_bytes: metrics.released_bytes(),
            memory_reclaimed: format_bytes(metrics.released_bytes()),
        },
        inventory: Inventory {
            total_items: snapshot.len(),
            avg_item_usage: if use_counts.is_empty() {
                0.0
            } else {
                use_counts.iter().sum::<u64>() as f64 / use_counts.len() as f64
            },
            max_item_usage: use_counts.iter().copied().max().unwrap_or(0),
            min_item_usage: use_counts.iter().copied().min().unwrap_or(0),
            single_use_items: use_counts.iter().filter(|&&c| c == 1).count(),
            high_value_items: scores.iter().filter(|&&s| s > mean_score).count(),
        },
        health: Health {
            status,
            score,
            issues,
            error_rate,
            recent_errors: metrics.errors(),
            timeouts: metrics.timeouts(),
        },
        temporal: Temporal {
            uptime,
            uptime_formatted: format_uptime(uptime),
            requests_per_minute,
            trend: metrics.trend(),
        },
    }
}
