//! Pulse Configuration
//!
//! TOML-based configuration loading with sensible defaults.
//! Minimal config should just work - only specify what you need to change.
//!
//! # Parsing
//!
//! Use the `FromStr` trait to parse configuration:
//!
//! ```
//! use pulse_config::Config;
//! use std::str::FromStr;
//!
//! let config = Config::from_str("[server]\nport = 9000").unwrap();
//! assert_eq!(config.server.port, 9000);
//! ```
//!
//! # Example Config
//!
//! ```toml
//! [log]
//! level = "info"
//!
//! [server]
//! port = 3001
//!
//! [log_store]
//! kind = "file"
//! path = "data/events.jsonl"
//!
//! [transport]
//! endpoint = "http://localhost:3001/v1/collect"
//! batch_size = 100
//! retry_strategy = "exponential"
//! ```

mod error;
mod logging;
mod metrics;
mod pipeline;
mod server;
mod store;
mod tap;
mod transport;
mod validation;

use std::fs;
use std::path::Path;
use std::str::FromStr;

pub use error::{ConfigError, Result};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use metrics::MetricsConfig;
pub use pipeline::PipelineConfig;
pub use server::ServerConfig;
pub use store::{LogStoreConfig, LogStoreKind};
pub use tap::TapConfig;
pub use transport::{RetryStrategy, TransportConfig};

use serde::Deserialize;

/// Main configuration structure
///
/// All sections are optional with sensible defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub log: LogConfig,

    /// Periodic metrics reporting
    pub metrics: MetricsConfig,

    /// Ingestion HTTP server
    pub server: ServerConfig,

    /// Durable append log backend
    pub log_store: LogStoreConfig,

    /// Live broadcast fan-out
    pub tap: TapConfig,

    /// Producer-side batching transport (used by `pulse test`)
    pub transport: TransportConfig,

    /// Category routing, aggregation and anomaly features
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read, contains invalid TOML, or fails validation.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// Prefer using the `FromStr` trait implementation.
    fn parse(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

impl FromStr for Config {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use std::time::Duration;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = Config::from_str("").unwrap();
        assert_eq!(config.server.port, 3001);
        assert_eq!(config.log_store.kind, LogStoreKind::Memory);
        assert_eq!(config.transport.batch_size, 100);
        assert_eq!(config.transport.max_retries, 3);
        assert_eq!(config.pipeline.anomaly_window, 10);
    }

    #[test]
    fn test_full_config_parse() {
        let toml = r#"
[log]
level = "debug"
format = "json"

[metrics]
enabled = false
interval = "30s"

[server]
address = "127.0.0.1"
port = 8080
max_payload_size = 1048576

[log_store]
kind = "file"
path = "/var/lib/pulse/events.jsonl"
fsync = true

[tap]
max_subscribers = 5
channel_capacity = 64
cleanup_interval = "1s"

[transport]
endpoint = "http://collector:8080/v1/collect"
batch_size = 50
max_retries = 5
retry_strategy = "linear"
base_delay = "250ms"
max_delay = "2s"
shutdown_timeout = "30s"

[pipeline]
anomaly_detection = true
anomaly_window = 20
anomaly_threshold = 0.25
"#;
        let config = Config::from_str(toml).unwrap();

        assert_eq!(config.log.level, LogLevel::Debug);
        assert_eq!(config.log.format, LogFormat::Json);
        assert!(!config.metrics.enabled);
        assert_eq!(config.server.address, "127.0.0.1");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.max_payload_size, 1_048_576);
        assert_eq!(config.log_store.kind, LogStoreKind::File);
        assert!(config.log_store.fsync);
        assert_eq!(config.tap.max_subscribers, 5);
        assert_eq!(config.tap.cleanup_interval, Duration::from_secs(1));
        assert_eq!(config.transport.batch_size, 50);
        assert_eq!(config.transport.retry_strategy, RetryStrategy::Linear);
        assert_eq!(config.transport.base_delay, Duration::from_millis(250));
        assert_eq!(config.transport.shutdown_timeout, Duration::from_secs(30));
        assert!(config.pipeline.anomaly_detection);
        assert_eq!(config.pipeline.anomaly_window, 20);
    }

    #[test]
    fn test_invalid_toml() {
        let result = Config::from_str("invalid { toml");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_unknown_store_kind_rejected() {
        let result = Config::from_str("[log_store]\nkind = \"redis\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_from_file_missing() {
        let result = Config::from_file("/nonexistent/pulse.toml");
        assert!(matches!(result, Err(ConfigError::IoError { .. })));
    }
}
