//! Ingestion server configuration

use serde::Deserialize;

/// HTTP ingestion server
///
/// Serves `POST /v1/collect`, the `GET /v1/live` feed and snapshot reads.
///
/// ```toml
/// [server]
/// address = "0.0.0.0"
/// port = 3001
/// max_payload_size = 10485760
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address
    /// Default: "0.0.0.0"
    pub address: String,

    /// Listen port
    /// Default: 3001
    pub port: u16,

    /// Maximum request body size in bytes; larger bodies get 413
    /// Default: 10MB
    pub max_payload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: 3001,
            max_payload_size: 10 * 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// `address:port` string suitable for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}
