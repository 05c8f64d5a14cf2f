//! Producer-side batching transport configuration

use serde::Deserialize;
use std::time::Duration;

/// Backoff strategy between delivery attempts
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RetryStrategy {
    /// `base_delay * (attempt + 1)`
    Linear,
    /// `base_delay * 2^attempt` plus up to one second of jitter (default)
    #[default]
    Exponential,
}

/// Batching transport configuration
///
/// ```toml
/// [transport]
/// endpoint = "http://localhost:3001/v1/collect"
/// batch_size = 100
/// max_retries = 3
/// retry_strategy = "exponential"
/// base_delay = "1s"
/// max_delay = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Ingestion URL the batches are POSTed to
    /// Default: "http://localhost:3001/v1/collect"
    pub endpoint: String,

    /// Queue length that triggers a flush, and the largest batch sent
    /// Default: 100
    pub batch_size: usize,

    /// Delivery attempts per batch before it is re-queued
    /// Default: 3
    pub max_retries: u32,

    /// Default: exponential
    pub retry_strategy: RetryStrategy,

    /// Default: 1s
    #[serde(with = "humantime_serde")]
    pub base_delay: Duration,

    /// Upper bound for any single backoff
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,

    /// Per-request timeout for a delivery attempt
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,

    /// Hard cap on draining the queue at shutdown
    /// Default: 10s
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3001/v1/collect".into(),
            batch_size: 100,
            max_retries: 3,
            retry_strategy: RetryStrategy::Exponential,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            request_timeout: Duration::from_secs(10),
            shutdown_timeout: Duration::from_secs(10),
        }
    }
}
