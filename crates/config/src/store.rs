//! Durable append log configuration

use serde::Deserialize;
use std::path::PathBuf;

/// Append log backend
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogStoreKind {
    /// In-process log; contents are lost on restart (default)
    #[default]
    Memory,
    /// JSON Lines file; positions survive restarts
    File,
}

/// Append log configuration
///
/// ```toml
/// [log_store]
/// kind = "file"
/// path = "data/events.jsonl"
/// fsync = false
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LogStoreConfig {
    pub kind: LogStoreKind,

    /// File path, required when `kind = "file"`
    pub path: Option<PathBuf>,

    /// Sync file data to disk after every append
    /// Default: false
    pub fsync: bool,
}
