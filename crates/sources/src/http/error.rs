//! HTTP source error types

use axum::http::StatusCode;
use pulse_pipeline::PipelineError;
use pulse_protocol::ValidationError;
use pulse_store::StoreError;

/// HTTP source errors
#[derive(Debug, thiserror::Error)]
pub enum HttpSourceError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Server error
    #[error("HTTP error: {0}")]
    Http(String),

    /// Payload too large
    #[error("payload exceeds limit of {limit} bytes")]
    PayloadTooLarge { limit: usize },

    /// Body could not be read
    #[error("failed to read request body: {0}")]
    Body(String),

    /// Body is not JSON
    #[error("invalid JSON: {0}")]
    InvalidJson(String),

    /// An event in the request failed validation
    #[error("event {index}: {source}")]
    Validation {
        index: usize,
        #[source]
        source: ValidationError,
    },

    /// Path or query parameter could not be parsed
    #[error("invalid {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    /// Log of record failed
    #[error("failed to store event: {0}")]
    Store(#[from] StoreError),

    /// Aggregate read failed
    #[error("failed to read aggregates: {0}")]
    Pipeline(#[from] PipelineError),
}

impl HttpSourceError {
    /// Status code reported to the client
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Body(_)
            | Self::InvalidJson(_)
            | Self::Validation { .. }
            | Self::InvalidParameter { .. } => StatusCode::BAD_REQUEST,
            Self::Bind { .. } | Self::Http(_) | Self::Store(_) | Self::Pipeline(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn invalid_parameter(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let err = HttpSourceError::Validation {
            index: 2,
            source: ValidationError::missing_field("type"),
        };
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "event 2: missing required field: type");

        assert_eq!(
            HttpSourceError::PayloadTooLarge { limit: 10 }.status(),
            StatusCode::PAYLOAD_TOO_LARGE
        );
        assert_eq!(
            HttpSourceError::from(StoreError::invalid_delta("x", -1.0)).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
