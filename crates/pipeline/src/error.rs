//! Pipeline error types

use pulse_protocol::Category;
use pulse_store::StoreError;
use thiserror::Error;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Payload does not match its category's schema
    #[error("invalid {category} payload: {message}")]
    InvalidPayload { category: Category, message: String },

    /// Timestamp does not map to a calendar date
    #[error("timestamp {0} is outside the representable date range")]
    TimestampOutOfRange(i64),

    /// Backing store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl PipelineError {
    pub fn invalid_payload(category: Category, message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            category,
            message: message.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
