//! Metrics collection for harvest batches
//!
//! Atomic counters for API traffic and link resolution, a bounded ring
//! buffer of resolution latencies, and a Prometheus-compatible text export.
//!
//! # Example
//!
//! ```rust
//! use linkfeed::metrics::global_metrics;
//! use std::time::Duration;
//!
//! global_metrics().record_link_resolved(Duration::from_millis(150));
//! let output = global_metrics().to_prometheus_format();
//! assert!(output.contains("linkfeed_links_resolved_total"));
//! ```

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{OnceLock, RwLock};
use std::time::{Duration, Instant};

/// Maximum number of duration samples to keep
const MAX_HISTOGRAM_SAMPLES: usize = 1000;

/// Metrics for one process
///
/// Thread-safe: counters are atomics, breakdowns sit behind RwLocks.
#[derive(Debug)]
pub struct Metrics {
    /// Timeline API requests issued
    pub api_requests_total: AtomicU64,
    /// Responses with status 429
    pub rate_limited_total: AtomicU64,
    /// Responses with a 5xx status
    pub server_errors_total: AtomicU64,
    /// Requests that failed before any status arrived
    pub transport_errors_total: AtomicU64,
    /// Links resolved to a textual page
    pub links_resolved_total: AtomicU64,
    /// Links dropped for any reason
    pub links_skipped_total: AtomicU64,
    /// Pages whose summary could not be produced
    pub summaries_failed_total: AtomicU64,

    resolve_durations: RwLock<RingBuffer<Duration>>,
    skipped_by_reason: RwLock<BTreeMap<String, u64>>,
    start_time: RwLock<Option<Instant>>,
}

/// Fixed-capacity ring buffer of samples
#[derive(Debug)]
struct RingBuffer<T> {
    data: Vec<T>,
    capacity: usize,
    write_pos: usize,
    total_samples: u64,
}

impl<T: Clone + Ord> RingBuffer<T> {
    fn new(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
            capacity,
            write_pos: 0,
            total_samples: 0,
        }
    }

    fn push(&mut self, value: T) {
        if self.data.len() < self.capacity {
            self.data.push(value);
        } else {
            self.data[self.write_pos] = value;
        }
        self.write_pos = (self.write_pos + 1) % self.capacity;
        self.total_samples += 1;
    }

    fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Nearest-rank percentile, `p` in 0.0..=1.0
    fn percentile(&self, p: f64) -> Option<T> {
        if self.data.is_empty() {
            return None;
        }
        let mut sorted = self.data.clone();
        sorted.sort();
        let idx = ((sorted.len() as f64 - 1.0) * p).round() as usize;
        sorted.get(idx).cloned()
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    /// Create an empty metrics set
    pub fn new() -> Self {
        Self {
            api_requests_total: AtomicU64::new(0),
            rate_limited_total: AtomicU64::new(0),
            server_errors_total: AtomicU64::new(0),
            transport_errors_total: AtomicU64::new(0),
            links_resolved_total: AtomicU64::new(0),
            links_skipped_total: AtomicU64::new(0),
            summaries_failed_total: AtomicU64::new(0),
            resolve_durations: RwLock::new(RingBuffer::new(MAX_HISTOGRAM_SAMPLES)),
            skipped_by_reason: RwLock::new(BTreeMap::new()),
            start_time: RwLock::new(None),
        }
    }

    /// Record one timeline API request
    pub fn record_api_request(&self) {
        self.api_requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rate-limited response
    pub fn record_rate_limited(&self) {
        self.rate_limited_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a 5xx response
    pub fn record_server_error(&self) {
        self.server_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a transport failure
    pub fn record_transport_error(&self) {
        self.transport_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a resolved link and how long it took
    pub fn record_link_resolved(&self, duration: Duration) {
        self.links_resolved_total.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut durations) = self.resolve_durations.write() {
            durations.push(duration);
        }
    }

    /// Record a skipped link
    pub fn record_link_skipped(&self, reason: &str) {
        self.links_skipped_total.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut breakdown) = self.skipped_by_reason.write() {
            *breakdown.entry(reason.to_string()).or_insert(0) += 1;
        }
    }

    /// Record a failed summary
    pub fn record_summary_failed(&self) {
        self.summaries_failed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Skipped links broken down by reason
    pub fn skipped_by_reason(&self) -> BTreeMap<String, u64> {
        self.skipped_by_reason
            .read()
            .map(|b| b.clone())
            .unwrap_or_default()
    }

    /// Time since [`init`] was called
    pub fn uptime(&self) -> Option<Duration> {
        self.start_time
            .read()
            .ok()
            .and_then(|start| start.map(|s| s.elapsed()))
    }

    /// Convert metrics to Prometheus text format
    pub fn to_prometheus_format(&self) -> String {
        let mut output = String::new();

        let counters = [
            ("linkfeed_api_requests_total", &self.api_requests_total),
            ("linkfeed_rate_limited_total", &self.rate_limited_total),
            ("linkfeed_server_errors_total", &self.server_errors_total),
            ("linkfeed_transport_errors_total", &self.transport_errors_total),
            ("linkfeed_links_resolved_total", &self.links_resolved_total),
            ("linkfeed_links_skipped_total", &self.links_skipped_total),
            ("linkfeed_summaries_failed_total", &self.summaries_failed_total),
        ];
        for (name, counter) in counters {
            output.push_str(&format!("{} {}\n", name, counter.load(Ordering::Relaxed)));
        }

        for (reason, count) in self.skipped_by_reason() {
            output.push_str(&format!(
                "linkfeed_links_skipped_by_reason{{reason=\"{}\"}} {}\n",
                reason, count
            ));
        }

        if let Ok(durations) = self.resolve_durations.read() {
            if !durations.is_empty() {
                for (label, p) in [("p50", 0.5), ("p95", 0.95), ("p99", 0.99)] {
                    if let Some(value) = durations.percentile(p) {
                        output.push_str(&format!(
                            "linkfeed_link_resolve_duration_{}_ms {}\n",
                            label,
                            value.as_millis()
                        ));
                    }
                }
                output.push_str(&format!(
                    "linkfeed_link_resolve_samples_total {}\n",
                    durations.total_samples
                ));
            }
        }

        if let Some(uptime) = self.uptime() {
            output.push_str(&format!(
                "linkfeed_uptime_seconds {}\n",
                uptime.as_secs()
            ));
        }

        output
    }
}

/// Process-wide metrics instance
pub static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Get or initialize the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    METRICS.get_or_init(Metrics::new)
}

/// Initialize global metrics (call once at startup)
pub fn init() {
    if let Ok(mut start_time) = global_metrics().start_time.write() {
        *start_time = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_recording() {
        let metrics = Metrics::new();

        metrics.record_api_request();
        metrics.record_api_request();
        metrics.record_rate_limited();
        assert_eq!(metrics.api_requests_total.load(Ordering::Relaxed), 2);
        assert_eq!(metrics.rate_limited_total.load(Ordering::Relaxed), 1);

        metrics.record_link_skipped("timeout");
        metrics.record_link_skipped("timeout");
        metrics.record_link_skipped("not_text");
        assert_eq!(metrics.links_skipped_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.skipped_by_reason().get("timeout"), Some(&2));
    }

    #[test]
    fn test_ring_buffer_wraps() {
        let mut buffer = RingBuffer::new(3);
        for i in 0..5u64 {
            buffer.push(i);
        }
        assert_eq!(buffer.data.len(), 3);
        assert_eq!(buffer.total_samples, 5);
        assert_eq!(buffer.percentile(0.0), Some(2));
        assert_eq!(buffer.percentile(1.0), Some(4));
    }

    #[test]
    fn test_prometheus_format() {
        let metrics = Metrics::new();
        metrics.record_link_resolved(Duration::from_millis(120));
        metrics.record_link_skipped("status");

        let output = metrics.to_prometheus_format();
        assert!(output.contains("linkfeed_links_resolved_total 1\n"));
        assert!(output.contains("linkfeed_links_skipped_by_reason{reason=\"status\"} 1\n"));
        assert!(output.contains("linkfeed_link_resolve_duration_p50_ms 120\n"));
        assert!(!output.contains("linkfeed_uptime_seconds"));
    }

    #[test]
    fn test_global_metrics() {
        init();
        let metrics = global_metrics();
        let before = metrics.summaries_failed_total.load(Ordering::Relaxed);
        metrics.record_summary_failed();
        assert!(metrics.summaries_failed_total.load(Ordering::Relaxed) > before);
        assert!(metrics.uptime().is_some());
    }
}
