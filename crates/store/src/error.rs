//! Storage error types

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for storage operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage backends
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure on the backing file
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Entry could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Accumulators only grow
    #[error("invalid delta {delta} for field '{field}': must be a non-negative finite number")]
    InvalidDelta { field: String, delta: f64 },

    /// A stored line is unreadable and is not the final line
    #[error("corrupt log entry at line {line} of {path}: {message}")]
    Corrupt {
        path: PathBuf,
        line: usize,
        message: String,
    },
}

impl StoreError {
    /// Create an I/O error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an invalid delta error
    pub fn invalid_delta(field: impl Into<String>, delta: f64) -> Self {
        Self::InvalidDelta {
            field: field.into(),
            delta,
        }
    }
}
