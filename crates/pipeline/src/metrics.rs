//! Pipeline metrics
//!
//! Atomic counters for per-event processing outcomes.
//! All operations use relaxed ordering; values are eventually consistent.

use std::sync::atomic::{AtomicU64, Ordering};

use pulse_protocol::Category;

/// Counters for the processing pipeline
///
/// All methods are safe to call from multiple threads concurrently.
#[derive(Debug, Default)]
pub struct PipelineMetrics {
    /// Events handed to the pipeline
    events_processed: AtomicU64,

    performance_events: AtomicU64,
    behavior_events: AtomicU64,
    error_events: AtomicU64,

    /// Events whose type matched no category
    uncategorized_events: AtomicU64,

    /// Events whose payload failed its category schema
    invalid_payloads: AtomicU64,

    /// Category or aggregate store failures
    store_errors: AtomicU64,

    /// Windows assessed by the anomaly detector
    windows_assessed: AtomicU64,

    /// Windows flagged anomalous
    anomalies_detected: AtomicU64,
}

impl PipelineMetrics {
    #[inline]
    pub const fn new() -> Self {
        Self {
            events_processed: AtomicU64::new(0),
            performance_events: AtomicU64::new(0),
            behavior_events: AtomicU64::new(0),
            error_events: AtomicU64::new(0),
            uncategorized_events: AtomicU64::new(0),
            invalid_payloads: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
            windows_assessed: AtomicU64::new(0),
            anomalies_detected: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn record_processed(&self) {
        self.events_processed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a routed event under its category, or as uncategorized
    #[inline]
    pub fn record_routed(&self, category: Option<Category>) {
        let counter = match category {
            Some(Category::Performance) => &self.performance_events,
            Some(Category::Behavior) => &self.behavior_events,
            Some(Category::Error) => &self.error_events,
            _ => &self.uncategorized_events,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_invalid_payload(&self) {
        self.invalid_payloads.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_store_error(&self) {
        self.store_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an assessed window and whether it was flagged
    #[inline]
    pub fn record_assessment(&self, anomalous: bool) {
        self.windows_assessed.fetch_add(1, Ordering::Relaxed);
        if anomalous {
            self.anomalies_detected.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get a point-in-time copy of all counters
    #[inline]
    pub fn snapshot(&self) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            events_processed: self.events_processed.load(Ordering::Relaxed),
            performance_events: self.performance_events.load(Ordering::Relaxed),
            behavior_events: self.behavior_events.load(Ordering::Relaxed),
            error_events: self.error_events.load(Ordering::Relaxed),
            uncategorized_events: self.uncategorized_events.load(Ordering::Relaxed),
            invalid_payloads: self.invalid_payloads.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
            windows_assessed: self.windows_assessed.load(Ordering::Relaxed),
            anomalies_detected: self.anomalies_detected.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time snapshot of pipeline metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineMetricsSnapshot {
    pub events_processed: u64,
    pub performance_events: u64,
    pub behavior_events: u64,
    pub error_events: u64,
    pub uncategorized_events: u64,
    pub invalid_payloads: u64,
    pub store_errors: u64,
    pub windows_assessed: u64,
    pub anomalies_detected: u64,
}

impl PipelineMetricsSnapshot {
    /// Events that failed processing
    #[inline]
    pub fn failed(&self) -> u64 {
        self.invalid_payloads + self.store_errors
    }

    /// Share of assessed windows flagged anomalous (0.0 - 1.0)
    ///
    /// Returns None if nothing has been assessed.
    #[inline]
    pub fn anomaly_rate(&self) -> Option<f64> {
        if self.windows_assessed == 0 {
            None
        } else {
            Some(self.anomalies_detected as f64 / self.windows_assessed as f64)
        }
    }

    /// Difference from an earlier snapshot
    #[inline]
    pub fn diff(&self, previous: &PipelineMetricsSnapshot) -> PipelineMetricsSnapshot {
        PipelineMetricsSnapshot {
            events_processed: self.events_processed.saturating_sub(previous.events_processed),
            performance_events: self
                .performance_events
                .saturating_sub(previous.performance_events),
            behavior_events: self.behavior_events.saturating_sub(previous.behavior_events),
            error_events: self.error_events.saturating_sub(previous.error_events),
            uncategorized_events: self
                .uncategorized_events
                .saturating_sub(previous.uncategorized_events),
            invalid_payloads: self.invalid_payloads.saturating_sub(previous.invalid_payloads),
            store_errors: self.store_errors.saturating_sub(previous.store_errors),
            windows_assessed: self.windows_assessed.saturating_sub(previous.windows_assessed),
            anomalies_detected: self
                .anomalies_detected
                .saturating_sub(previous.anomalies_detected),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routed_counts_by_category() {
        let metrics = PipelineMetrics::new();
        metrics.record_routed(Some(Category::Performance));
        metrics.record_routed(Some(Category::Error));
        metrics.record_routed(Some(Category::Error));
        metrics.record_routed(None);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.performance_events, 1);
        assert_eq!(snapshot.error_events, 2);
        assert_eq!(snapshot.behavior_events, 0);
        assert_eq!(snapshot.uncategorized_events, 1);
    }

    #[test]
    fn test_anomaly_rate() {
        let metrics = PipelineMetrics::new();
        assert_eq!(metrics.snapshot().anomaly_rate(), None);

        metrics.record_assessment(false);
        metrics.record_assessment(true);
        metrics.record_assessment(false);
        metrics.record_assessment(true);
        assert_eq!(metrics.snapshot().anomaly_rate(), Some(0.5));
    }

    #[test]
    fn test_diff_and_failed() {
        let metrics = PipelineMetrics::new();
        metrics.record_processed();
        metrics.record_invalid_payload();
        let before = metrics.snapshot();

        metrics.record_processed();
        metrics.record_processed();
        metrics.record_store_error();
        let after = metrics.snapshot();

        let delta = after.diff(&before);
        assert_eq!(delta.events_processed, 2);
        assert_eq!(delta.store_errors, 1);
        assert_eq!(delta.invalid_payloads, 0);
        assert_eq!(after.failed(), 2);
    }
}
