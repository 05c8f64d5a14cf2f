//! Durable append log
//!
//! The log is the single source of truth: every accepted event is appended
//! here before anything else happens to it. Positions are assigned by the log,
//! start at 1, increase strictly and are never reused.
//!
//! Readers (aggregation backfills, model training) consume it through
//! [`AppendLog::range`] and [`AppendLog::range_by_time`], which both return
//! entries in log order.

mod file;
mod memory;

use async_trait::async_trait;
use pulse_protocol::Event;
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use file::FileLog;
pub use memory::MemoryLog;

/// One committed log record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub position: u64,
    pub event: Event,
}

/// Append-only, totally ordered event log
#[async_trait]
pub trait AppendLog: Send + Sync {
    /// Append an event and return its position
    ///
    /// Concurrent appends are linearized: the order positions are handed out
    /// is the order entries are stored.
    async fn append(&self, event: &Event) -> Result<u64>;

    /// Entries with `from <= position <= to`, in log order
    async fn range(&self, from: u64, to: u64) -> Result<Vec<LogEntry>>;

    /// Entries whose event timestamp is within `[from_ms, to_ms]`, in log order
    async fn range_by_time(&self, from_ms: i64, to_ms: i64) -> Result<Vec<LogEntry>>;

    /// The first `limit` entries of [`AppendLog::range_by_time`]
    async fn range_by_time_limited(
        &self,
        from_ms: i64,
        to_ms: i64,
        limit: usize,
    ) -> Result<Vec<LogEntry>> {
        let mut entries = self.range_by_time(from_ms, to_ms).await?;
        entries.truncate(limit);
        Ok(entries)
    }

    /// Position of the newest entry, 0 when the log is empty
    async fn last_position(&self) -> Result<u64>;
}

/// Entries of a position-sorted slice that fall inside `[from, to]`
fn slice_by_position(entries: &[LogEntry], from: u64, to: u64) -> &[LogEntry] {
    if from > to {
        return &[];
    }
    let start = entries.partition_point(|e| e.position < from);
    let end = entries.partition_point(|e| e.position <= to);
    &entries[start..end]
}

fn within_time(entry: &LogEntry, from_ms: i64, to_ms: i64) -> bool {
    let ts = entry.event.timestamp();
    ts >= from_ms && ts <= to_ms
}
