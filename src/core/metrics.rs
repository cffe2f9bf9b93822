//! Logger metrics for observability
//!
//! Counters for lines written, lines lost to sink failures and events that
//! could not be encoded.

use std::sync::atomic::{AtomicU64, Ordering};

/// Metrics shared by every clone of one root logger
///
/// # Example
///
/// ```
/// use rust_field_logger::LoggerMetrics;
///
/// let metrics = LoggerMetrics::new();
///
/// metrics.record_dropped();
/// metrics.record_logged();
///
/// assert_eq!(metrics.dropped_count(), 1);
/// assert_eq!(metrics.total_logged(), 1);
/// ```
#[derive(Debug)]
pub struct LoggerMetrics {
    /// Lines that at least one sink failed to write
    dropped_count: AtomicU64,

    /// Lines written to every sink
    total_logged: AtomicU64,

    /// Events that failed to encode and were never written
    encode_failures: AtomicU64,

    /// Individual sink write failures (one line can fail on several sinks)
    sink_failures: AtomicU64,
}

impl LoggerMetrics {
    pub const fn new() -> Self {
        Self {
            dropped_count: AtomicU64::new(0),
            total_logged: AtomicU64::new(0),
            encode_failures: AtomicU64::new(0),
            sink_failures: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn total_logged(&self) -> u64 {
        self.total_logged.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn encode_failures(&self) -> u64 {
        self.encode_failures.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn sink_failures(&self) -> u64 {
        self.sink_failures.load(Ordering::Relaxed)
    }

    /// Record a dropped line, returns the previous count
    #[inline]
    pub fn record_dropped(&self) -> u64 {
        self.dropped_count.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_logged(&self) -> u64 {
        self.total_logged.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_encode_failure(&self) -> u64 {
        self.encode_failures.fetch_add(1, Ordering::Relaxed)
    }

    #[inline]
    pub fn record_sink_failures(&self, count: u64) -> u64 {
        self.sink_failures.fetch_add(count, Ordering::Relaxed)
    }

    /// Get drop rate as a percentage (0.0 - 100.0)
    ///
    /// Returns 0.0 if no lines have been processed.
    pub fn drop_rate(&self) -> f64 {
        let dropped = self.dropped_count() as f64;
        let total = self.total_logged() as f64 + dropped;
        if total == 0.0 {
            0.0
        } else {
            (dropped / total) * 100.0
        }
    }

    pub fn reset(&self) {
        self.dropped_count.store(0, Ordering::Relaxed);
        self.total_logged.store(0, Ordering::Relaxed);
        self.encode_failures.store(0, Ordering::Relaxed);
        self.sink_failures.store(0, Ordering::Relaxed);
    }
}

impl Default for LoggerMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for LoggerMetrics {
    /// Create a snapshot of the current metrics values
    fn clone(&self) -> Self {
        Self {
            dropped_count: AtomicU64::new(self.dropped_count()),
            total_logged: AtomicU64::new(self.total_logged()),
            encode_failures: AtomicU64::new(self.encode_failures()),
            sink_failures: AtomicU64::new(self.sink_failures()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_new() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.total_logged(), 0);
        assert_eq!(metrics.encode_failures(), 0);
        assert_eq!(metrics.sink_failures(), 0);
    }

    #[test]
    fn test_metrics_record_dropped() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.record_dropped(), 0); // Returns previous value
        assert_eq!(metrics.dropped_count(), 1);
        metrics.record_dropped();
        assert_eq!(metrics.dropped_count(), 2);
    }

    #[test]
    fn test_metrics_drop_rate() {
        let metrics = LoggerMetrics::new();
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..100 {
            metrics.record_logged();
        }
        assert_eq!(metrics.drop_rate(), 0.0);

        for _ in 0..10 {
            metrics.record_dropped();
        }
        let rate = metrics.drop_rate();
        assert!(rate > 9.0 && rate < 10.0, "Drop rate was {}", rate);
    }

    #[test]
    fn test_metrics_reset() {
        let metrics = LoggerMetrics::new();
        metrics.record_dropped();
        metrics.record_logged();
        metrics.record_encode_failure();
        metrics.record_sink_failures(3);

        metrics.reset();

        assert_eq!(metrics.dropped_count(), 0);
        assert_eq!(metrics.total_logged(), 0);
        assert_eq!(metrics.encode_failures(), 0);
        assert_eq!(metrics.sink_failures(), 0);
    }

    #[test]
    fn test_metrics_clone_is_snapshot() {
        let metrics = LoggerMetrics::new();
        metrics.record_dropped();
        metrics.record_logged();
        metrics.record_logged();

        let snapshot = metrics.clone();
        assert_eq!(snapshot.dropped_count(), 1);
        assert_eq!(snapshot.total_logged(), 2);

        metrics.record_dropped();
        assert_eq!(metrics.dropped_count(), 2);
        assert_eq!(snapshot.dropped_count(), 1);
    }
}
