//! Observable counters and derived statistics.
//!
//! Monotone counts live in plain atomics, matching the workspace's existing
//! `CacheStats` style. Latency samples live in two bounded ring buffers (cached vs.
//! fresh fetches) plus a small recent-activity window used only to compute trend.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

const LATENCY_WINDOW: usize = 1000;
const RECENT_WINDOW: usize = 100;

/// Overall health classification derived from error rate, memory pressure, and
/// queue backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Excellent,
    Good,
    Warning,
    Critical,
}

/// Whether recent latency is trending better, worse, or holding steady.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

/// Mutable counters and latency samples accumulated over the life of a cache.
pub struct Metrics {
    created_at: Mutex<Instant>,
    reads: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    errors: AtomicU64,
    timeouts: AtomicU64,
    evictions: AtomicU64,
    released_bytes: AtomicU64,
    rejected: AtomicU64,
    peak_concurrency: AtomicUsize,
    cached_latencies: Mutex<VecDeque<Duration>>,
    fetch_latencies: Mutex<VecDeque<Duration>>,
    recent: Mutex<VecDeque<Duration>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            created_at: Mutex::new(Instant::now()),
            reads: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            timeouts: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            released_bytes: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            peak_concurrency: AtomicUsize::new(0),
            cached_latencies: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)),
            fetch_latencies: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)),
            recent: Mutex::new(VecDeque::with_capacity(RECENT_WINDOW)),
        }
    }

    pub fn record_hit(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_timeout(&self) {
        self.timeouts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_eviction(&self) {
        self.evictions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add_released_bytes(&self, bytes: usize) {
        self.released_bytes
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn update_peak_concurrency(&self, running: usize) {
        self.peak_concurrency.fetch_max(running, Ordering::Relaxed);
    }

    pub fn record_cached_latency(&self, d: Duration) {
        push_bounded(&self.cached_latencies, d, LATENCY_WINDOW);
        push_bounded(&self.recent, d, RECENT_WINDOW);
    }

    pub fn record_fetch_latency(&self, d: Duration) {
        push_bounded(&self.fetch_latencies, d, LATENCY_WINDOW);
        push_bounded(&self.recent, d, RECENT_WINDOW);
    }

    pub fn reset(&self) {
        *self.created_at.lock() = Instant::now();
        self.reads.store(0, Ordering::Relaxed);
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.fetches.store(0, Ordering::Relaxed);
        self.errors.store(0, Ordering::Relaxed);
        self.timeouts.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        self.released_bytes.store(0, Ordering::Relaxed);
        self.rejected.store(0, Ordering::Relaxed);
        self.peak_concurrency.store(0, Ordering::Relaxed);
        self.cached_latencies.lock().clear();
        self.fetch_latencies.lock().clear();
        self.recent.lock().clear();
    }

    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }
    pub fn timeouts(&self) -> u64 {
        self.timeouts.load(Ordering::Relaxed)
    }
    pub fn evictions(&self) -> u64 {
        self.evictions.load(Ordering::Relaxed)
    }
    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
    pub fn released_bytes(&self) -> u64 {
        self.released_bytes.load(Ordering::Relaxed)
    }
    pub fn peak_concurrency(&self) -> usize {
        self.peak_concurrency.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        ratio(self.hits(), self.reads())
    }

    pub fn uptime(&self) -> Duration {
        self.created_at.lock().elapsed()
    }

    pub fn avg_cached_latency(&self) -> Duration {
        average(&self.cached_latencies.lock())
    }

    pub fn avg_fetch_latency(&self) -> Duration {
        average(&self.fetch_latencies.lock())
    }

    pub fn p95_latency(&self) -> Duration {
        let cached = self.cached_latencies.lock();
        let fetch = self.fetch_latencies.lock();
        let mut all: Vec<Duration> = cached.iter().chain(fetch.iter()).copied().collect();
        if all.is_empty() {
            return Duration::ZERO;
        }
        all.sort();
        let idx = ((all.len() as f64 * 0.95).ceil() as usize)
            .saturating_sub(1)
            .min(all.len() - 1);
        all[idx]
    }

    pub fn fastest_response(&self) -> Duration {
        let cached = self.cached_latencies.lock();
        let fetch = self.fetch_latencies.lock();
        cached.iter().chain(fetch.iter()).min().copied().unwrap_or(Duration::ZERO)
    }

    pub fn slowest_response(&self) -> Duration {
        let cached = self.cached_latencies.lock();
        let fetch = self.fetch_latencies.lock();
        cached.iter().chain(fetch.iter()).max().copied().unwrap_or(Duration::ZERO)
    }

    /// Ratio, in `[0, 1]`, of latency saved by serving from cache instead of fetching.
    pub fn performance_gain(&self) -> f64 {
        let fetch = self.avg_fetch_latency().as_secs_f64();
        if fetch <= 0.0 {
            return 0.0;
        }
        let cached = self.avg_cached_latency().as_secs_f64();
        ((fetch - cached) / fetch).max(0.0)
    }

    /// Estimated total latency saved across every cache hit.
    pub fn time_saved(&self) -> Duration {
        let per_hit = self
            .avg_fetch_latency()
            .saturating_sub(self.avg_cached_latency());
        per_hit.saturating_mul(self.hits() as u32)
    }

    /// `Improving`/`Stable`/`Declining` based on comparing the two halves of the
    /// recent-activity window.
    pub fn trend(&self) -> Trend {
        let recent = self.recent.lock();
        if recent.len() < 4 {
            return Trend::Stable;
        }
        let flat: Vec<Duration> = recent.iter().copied().collect();
        let mid = flat.len() / 2;
        let (first, second) = flat.split_at(mid);
        let first_avg = average_slice(first);
        let second_avg = average_slice(second);
        if second_avg < first_avg * 0.9 {
            Trend::Improving
        } else if second_avg > first_avg * 1.1 {
            Trend::Declining
        } else {
            Trend::Stable
        }
    }

    pub fn health(&self, error_rate_input: f64, memory_pressure: f64, queue_pressure: f64) -> (HealthStatus, f64, Vec<String>) {
        let mut score = 100.0;
        let mut issues = Vec::new();
        score -= error_rate_input * 50.0;
        if error_rate_input > 0.1 {
            issues.push("error rate above 10%".to_string());
        }
        let excess_memory = (memory_pressure - 0.8).max(0.0);
        score -= excess_memory * 100.0;
        if memory_pressure > 0.9 {
            issues.push("memory usage above 90% of limit".to_string());
        }
        score -= queue_pressure.min(1.0) * 10.0;
        if queue_pressure > 0.5 {
            issues.push("queue backlog building".to_string());
        }
        score = score.clamp(0.0, 100.0);
        let status = match score {
            s if s >= 90.0 => HealthStatus::Excellent,
            s if s >= 70.0 => HealthStatus::Good,
            s if s >= 40.0 => HealthStatus::Warning,
            _ => HealthStatus::Critical,
        };
        (status, score, issues)
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn ratio(numerator: u64, denominator: u64) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

fn push_bounded(buf: &Mutex<VecDeque<Duration>>, value: Duration, cap: usize) {
    let mut buf = buf.lock();
    if buf.len() >= cap {
        buf.pop_front();
    }
    buf.push_back(value);
}

fn average(buf: &VecDeque<Duration>) -> Duration {
    if buf.is_empty() {
        return Duration::ZERO;
    }
    let total: Duration = buf.iter().sum();
    total / buf.len() as u32
}

fn average_slice(s: &[Duration]) -> f64 {
    if s.is_empty() {
        return 0.0;
    }
    let total: Duration = s.iter().sum();
    total.as_secs_f64() / s.len() as f64
}

/// Format a byte count the way the statistics view presents it, e.g. `"2.50 MB"`.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.2} {}", UNITS[unit])
    }
}

/// Format an uptime duration as `"NdNhNmNs"`-style text, e.g. `"1d 2h 3m 4s"`.
pub fn format_uptime(d: Duration) -> String {
    let total_secs = d.as_secs();
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{days}d {hours}h {minutes}m {seconds}s")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_rate_reflects_hits_over_reads() {
        let m = Metrics::new();
        m.record_hit();
        m.record_hit();
        m.record_miss();
        assert!((m.hit_rate() - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn reset_clears_every_counter() {
        let m = Metrics::new();
        m.record_hit();
        m.record_error();
        m.add_released_bytes(100);
        m.reset();
        assert_eq!(m.reads(), 0);
        assert_eq!(m.errors(), 0);
        assert_eq!(m.released_bytes(), 0);
    }

    #[test]
    fn latency_ring_buffer_is_bounded() {
        let m = Metrics::new();
        for i in 0..(LATENCY_WINDOW + 10) {
            m.record_cached_latency(Duration::from_millis(i as u64));
        }
        assert_eq!(m.cached_latencies.lock().len(), LATENCY_WINDOW);
    }

    #[test]
    fn format_bytes_scales_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2560), "2.50 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.00 MB");
    }

    #[test]
    fn format_uptime_breaks_down_components() {
        let d = Duration::from_secs(90_061);
        assert_eq!(format_uptime(d), "1d 1h 1m 1s");
    }

    #[test]
    fn time_saved_is_zero_with_no_fetch_baseline() {
        let m = Metrics::new();
        m.record_hit();
        assert_eq!(m.time_saved(), Duration::ZERO);
    }

    #[test]
    fn trend_is_stable_with_too_few_samples() {
        let m = Metrics::new();
        m.record_cached_latency(Duration::from_millis(1));
        assert_eq!(m.trend(), Trend::Stable);
    }

    #[test]
    fn health_degrades_with_errors_and_pressure() {
        let m = Metrics::new();
        let (status, score, issues) = m.health(0.5, 0.95, 0.9);
        assert_eq!(status, HealthStatus::Critical);
        assert!(score < 40.0);
        assert!(!issues.is_empty());
    }
}
