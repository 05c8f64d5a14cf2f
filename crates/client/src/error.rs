//! Client error types

use thiserror::Error;

/// Result type for client construction
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors raised while constructing a collector
///
/// These are the only errors a producer ever sees; delivery problems are
/// absorbed by the transport.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No ingestion endpoint configured
    #[error("collector endpoint is required")]
    MissingEndpoint,

    /// Endpoint is not a usable URL
    #[error("invalid collector endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    /// HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// Errors from delivering a batch
#[derive(Debug, Error)]
pub enum TransportError {
    /// Connection, timeout or other network failure
    #[error("network error: {0}")]
    Network(String),

    /// The endpoint answered with a non-2xx status
    #[error("endpoint returned HTTP {0}")]
    Status(u16),

    /// Batch could not be encoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The queue could not be drained before the shutdown deadline
    #[error("shutdown timed out with {remaining} events still queued")]
    ShutdownTimeout { remaining: usize },
}

impl TransportError {
    /// Whether the failure came from the server rejecting the batch
    pub fn is_status(&self) -> bool {
        matches!(self, Self::Status(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let err = TransportError::Status(503);
        assert!(err.to_string().contains("503"));
        assert!(err.is_status());
        assert!(!TransportError::Network("refused".into()).is_status());
    }

    #[test]
    fn test_shutdown_timeout_display() {
        let err = TransportError::ShutdownTimeout { remaining: 7 };
        assert!(err.to_string().contains("7 events"));
    }

    #[test]
    fn test_invalid_endpoint_display() {
        let err = ClientError::InvalidEndpoint {
            endpoint: "nope".into(),
            message: "relative URL without a base".into(),
        };
        assert!(err.to_string().contains("'nope'"));
    }
}
