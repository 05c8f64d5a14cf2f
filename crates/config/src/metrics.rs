//! Metrics reporting configuration
//!
//! When enabled, `pulse serve` logs a snapshot of its ingestion, pipeline and
//! fan-out counters at a fixed interval.

use serde::Deserialize;
use std::time::Duration;

/// Metrics configuration
///
/// ```toml
/// [metrics]
/// enabled = true
/// interval = "60s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Default: true
    pub enabled: bool,

    /// Reporting interval
    /// Default: 60s
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = MetricsConfig::default();
        assert!(config.enabled);
        assert_eq!(config.interval, Duration::from_secs(60));
    }

    #[test]
    fn test_humantime_interval() {
        let config: MetricsConfig = toml::from_str("interval = \"5m\"").unwrap();
        assert_eq!(config.interval, Duration::from_secs(300));
    }
}
