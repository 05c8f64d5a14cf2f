//! Validation error types
//!
//! Errors raised when an incoming event does not match the event schema.

use thiserror::Error;

/// Errors that can occur while validating an incoming event
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The event is not a JSON object
    #[error("event must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// A required field is absent
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field is present but has the wrong shape
    #[error("invalid value for field '{field}': {message}")]
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl ValidationError {
    /// Create a missing field error
    #[inline]
    pub fn missing_field(field: &'static str) -> Self {
        Self::MissingField(field)
    }

    /// Create an invalid field error
    #[inline]
    pub fn invalid_field(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_field_display() {
        let err = ValidationError::missing_field("timestamp");
        assert_eq!(err.to_string(), "missing required field: timestamp");
    }

    #[test]
    fn test_invalid_field_display() {
        let err = ValidationError::invalid_field("type", "must not be empty");
        assert!(err.to_string().contains("'type'"));
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_not_an_object_display() {
        let err = ValidationError::NotAnObject("array");
        assert!(err.to_string().contains("array"));
    }
}
