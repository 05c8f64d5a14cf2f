//! In-process append log

use async_trait::async_trait;
use parking_lot::RwLock;
use pulse_protocol::Event;

use super::{AppendLog, LogEntry, slice_by_position, within_time};
use crate::error::Result;

/// Append log held in memory
///
/// Contents do not survive a restart. Used for tests and single-process
/// deployments that treat the live feed as the only consumer.
#[derive(Debug, Default)]
pub struct MemoryLog {
    entries: RwLock<Vec<LogEntry>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl AppendLog for MemoryLog {
    async fn append(&self, event: &Event) -> Result<u64> {
        let mut entries = self.entries.write();
        let position = entries.last().map_or(1, |e| e.position + 1);
        entries.push(LogEntry {
            position,
            event: event.clone(),
        });
        Ok(position)
    }

    async fn range(&self, from: u64, to: u64) -> Result<Vec<LogEntry>> {
        let entries = self.entries.read();
        Ok(slice_by_position(&entries, from, to).to_vec())
    }

    async fn range_by_time(&self, from_ms: i64, to_ms: i64) -> Result<Vec<LogEntry>> {
        let entries = self.entries.read();
        Ok(entries
            .iter()
            .filter(|e| within_time(e, from_ms, to_ms))
            .cloned()
            .collect())
    }

    async fn last_position(&self) -> Result<u64> {
        Ok(self.entries.read().last().map_or(0, |e| e.position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    fn event(ts: i64) -> Event {
        Event::with_timestamp(ts, "performance", json!({"cpu": 1, "memory": 2}))
    }

    #[tokio::test]
    async fn test_positions_start_at_one() {
        let log = MemoryLog::new();
        assert_eq!(log.last_position().await.unwrap(), 0);
        assert_eq!(log.append(&event(1)).await.unwrap(), 1);
        assert_eq!(log.append(&event(2)).await.unwrap(), 2);
        assert_eq!(log.last_position().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_range_is_inclusive() {
        let log = MemoryLog::new();
        for ts in 0..5 {
            log.append(&event(ts)).await.unwrap();
        }

        let entries = log.range(2, 4).await.unwrap();
        let positions: Vec<u64> = entries.iter().map(|e| e.position).collect();
        assert_eq!(positions, vec![2, 3, 4]);

        assert!(log.range(4, 2).await.unwrap().is_empty());
        assert_eq!(log.range(0, 100).await.unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_range_by_time_keeps_log_order() {
        let log = MemoryLog::new();
        // Out-of-order timestamps: the log keeps arrival order
        for ts in [300, 100, 200, 900] {
            log.append(&event(ts)).await.unwrap();
        }

        let entries = log.range_by_time(100, 300).await.unwrap();
        let timestamps: Vec<i64> = entries.iter().map(|e| e.event.timestamp()).collect();
        assert_eq!(timestamps, vec![300, 100, 200]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_appends_get_unique_positions() {
        let log = Arc::new(MemoryLog::new());
        let mut handles = Vec::new();
        for task in 0..8 {
            let log = Arc::clone(&log);
            handles.push(tokio::spawn(async move {
                let mut positions = Vec::new();
                for i in 0..50 {
                    positions.push(log.append(&event(task * 100 + i)).await.unwrap());
                }
                positions
            }));
        }

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.await.unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (1..=400).collect::<Vec<u64>>());
        assert_eq!(log.len(), 400);
    }
}
