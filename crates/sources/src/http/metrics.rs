//! HTTP source metrics
//!
//! Atomic counters for tracking HTTP ingestion.

use std::sync::atomic::{AtomicU64, Ordering};

/// HTTP source metrics
#[derive(Debug, Default)]
pub struct HttpSourceMetrics {
    /// Total ingestion requests received
    requests_total: AtomicU64,

    /// Successful requests (2xx)
    requests_success: AtomicU64,

    /// Client errors (4xx)
    requests_client_error: AtomicU64,

    /// Server errors (5xx)
    requests_server_error: AtomicU64,

    /// Events committed to the log
    events_accepted: AtomicU64,

    /// Events that failed validation
    events_rejected: AtomicU64,

    /// Committed events the pipeline could not process
    pipeline_errors: AtomicU64,

    /// Request body bytes received
    bytes_received: AtomicU64,
}

impl HttpSourceMetrics {
    /// Create new metrics instance
    pub const fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            requests_success: AtomicU64::new(0),
            requests_client_error: AtomicU64::new(0),
            requests_server_error: AtomicU64::new(0),
            events_accepted: AtomicU64::new(0),
            events_rejected: AtomicU64::new(0),
            pipeline_errors: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn request_received(&self, bytes: usize) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    #[inline]
    pub fn request_success(&self) {
        self.requests_success.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn request_client_error(&self) {
        self.requests_client_error.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn request_server_error(&self) {
        self.requests_server_error.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed request by status class
    #[inline]
    pub fn request_failed(&self, server_error: bool) {
        if server_error {
            self.request_server_error();
        } else {
            self.request_client_error();
        }
    }

    #[inline]
    pub fn event_accepted(&self) {
        self.events_accepted.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn event_rejected(&self) {
        self.events_rejected.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn pipeline_error(&self) {
        self.pipeline_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a point-in-time copy of all counters
    pub fn snapshot(&self) -> HttpMetricsSnapshot {
        HttpMetricsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            requests_success: self.requests_success.load(Ordering::Relaxed),
            requests_client_error: self.requests_client_error.load(Ordering::Relaxed),
            requests_server_error: self.requests_server_error.load(Ordering::Relaxed),
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            events_rejected: self.events_rejected.load(Ordering::Relaxed),
            pipeline_errors: self.pipeline_errors.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of HTTP source metrics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HttpMetricsSnapshot {
    pub requests_total: u64,
    pub requests_success: u64,
    pub requests_client_error: u64,
    pub requests_server_error: u64,
    pub events_accepted: u64,
    pub events_rejected: u64,
    pub pipeline_errors: u64,
    pub bytes_received: u64,
}

impl HttpMetricsSnapshot {
    /// Calculate request success rate (0.0 - 1.0)
    ///
    /// Returns None if no requests have been received.
    pub fn success_rate(&self) -> Option<f64> {
        if self.requests_total == 0 {
            None
        } else {
            Some(self.requests_success as f64 / self.requests_total as f64)
        }
    }
}
