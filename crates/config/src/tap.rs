//! Live broadcast fan-out configuration

use serde::Deserialize;
use std::time::Duration;

/// Tap (live feed) configuration
///
/// ```toml
/// [tap]
/// max_subscribers = 100
/// channel_capacity = 1024
/// cleanup_interval = "5s"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TapConfig {
    /// Maximum concurrent live subscribers
    /// Default: 100
    pub max_subscribers: usize,

    /// Per-subscriber buffered events before copies are dropped
    /// Default: 1024
    pub channel_capacity: usize,

    /// How often disconnected subscribers are removed
    /// Default: 5s
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            max_subscribers: 100,
            channel_capacity: 1024,
            cleanup_interval: Duration::from_secs(5),
        }
    }
}
