//! Raw per-category record storage
//!
//! The category router writes each categorized payload here in the shape its
//! category calls for:
//! - performance: one record per exact timestamp per day, fields merged
//! - behavior: an ordered sequence per session
//! - error: a set ordered by timestamp, unique by payload

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::error::Result;

/// Per-category record storage used by the category router
#[async_trait]
pub trait CategoryStore: Send + Sync {
    /// Merge fields into the performance record for `(date, timestamp)`
    async fn merge_performance(
        &self,
        date: NaiveDate,
        timestamp: i64,
        fields: Map<String, Value>,
    ) -> Result<()>;

    /// Append a record to a session's sequence and return the new length
    async fn append_behavior(&self, session_id: &str, record: Value) -> Result<usize>;

    /// Add a report to the error set scored by `timestamp`
    ///
    /// Re-recording an identical report moves it to the new timestamp.
    async fn record_error(&self, timestamp: i64, report: Value) -> Result<()>;

    /// Performance records for one day, ordered by timestamp
    async fn performance_records(&self, date: NaiveDate) -> Result<Vec<(i64, Map<String, Value>)>>;

    /// A session's records in arrival order
    async fn behavior_sequence(&self, session_id: &str) -> Result<Vec<Value>>;

    /// Error reports with `from_ms <= timestamp <= to_ms`, ordered by timestamp
    async fn errors_between(&self, from_ms: i64, to_ms: i64) -> Result<Vec<(i64, Value)>>;
}

/// Category store held in memory
#[derive(Debug, Default)]
pub struct MemoryCategoryStore {
    performance: DashMap<NaiveDate, BTreeMap<i64, Map<String, Value>>>,
    behavior: DashMap<String, Vec<Value>>,
    errors: Mutex<ErrorSet>,
}

/// Sorted set of serialized reports
#[derive(Debug, Default)]
struct ErrorSet {
    by_score: BTreeSet<(i64, String)>,
    scores: HashMap<String, i64>,
}

impl ErrorSet {
    fn insert(&mut self, score: i64, member: String) {
        if let Some(previous) = self.scores.insert(member.clone(), score) {
            self.by_score.remove(&(previous, member.clone()));
        }
        self.by_score.insert((score, member));
    }
}

impl MemoryCategoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CategoryStore for MemoryCategoryStore {
    async fn merge_performance(
        &self,
        date: NaiveDate,
        timestamp: i64,
        fields: Map<String, Value>,
    ) -> Result<()> {
        let mut day = self.performance.entry(date).or_default();
        day.entry(timestamp).or_default().extend(fields);
        Ok(())
    }

    async fn append_behavior(&self, session_id: &str, record: Value) -> Result<usize> {
        let mut sequence = self.behavior.entry(session_id.to_string()).or_default();
        sequence.push(record);
        Ok(sequence.len())
    }

    async fn record_error(&self, timestamp: i64, report: Value) -> Result<()> {
        let member = serde_json::to_string(&report)?;
        self.errors.lock().insert(timestamp, member);
        Ok(())
    }

    async fn performance_records(&self, date: NaiveDate) -> Result<Vec<(i64, Map<String, Value>)>> {
        Ok(self
            .performance
            .get(&date)
            .map(|day| day.iter().map(|(ts, fields)| (*ts, fields.clone())).collect())
            .unwrap_or_default())
    }

    async fn behavior_sequence(&self, session_id: &str) -> Result<Vec<Value>> {
        Ok(self
            .behavior
            .get(session_id)
            .map(|sequence| sequence.value().clone())
            .unwrap_or_default())
    }

    async fn errors_between(&self, from_ms: i64, to_ms: i64) -> Result<Vec<(i64, Value)>> {
        if from_ms > to_ms {
            return Ok(Vec::new());
        }
        let errors = self.errors.lock();
        errors
            .by_score
            .range((from_ms, String::new())..)
            .take_while(|(score, _)| *score <= to_ms)
            .map(|(score, member)| Ok((*score, serde_json::from_str(member)?)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[tokio::test]
    async fn test_performance_merges_by_timestamp() {
        let store = MemoryCategoryStore::new();
        store
            .merge_performance(day(), 1000, fields(json!({"cpu": 10, "memory": 20})))
            .await
            .unwrap();
        store
            .merge_performance(day(), 1000, fields(json!({"cpu": 15, "fps": 60})))
            .await
            .unwrap();
        store
            .merge_performance(day(), 500, fields(json!({"cpu": 1, "memory": 1})))
            .await
            .unwrap();

        let records = store.performance_records(day()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].0, 500);
        assert_eq!(records[1].1["cpu"], 15);
        assert_eq!(records[1].1["memory"], 20);
        assert_eq!(records[1].1["fps"], 60);
    }

    #[tokio::test]
    async fn test_behavior_sequence_keeps_order() {
        let store = MemoryCategoryStore::new();
        assert_eq!(store.append_behavior("s1", json!({"i": 1})).await.unwrap(), 1);
        assert_eq!(store.append_behavior("s1", json!({"i": 2})).await.unwrap(), 2);
        store.append_behavior("s2", json!({"i": 3})).await.unwrap();

        let sequence = store.behavior_sequence("s1").await.unwrap();
        assert_eq!(sequence, vec![json!({"i": 1}), json!({"i": 2})]);
        assert!(store.behavior_sequence("missing").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_errors_are_scored_by_timestamp() {
        let store = MemoryCategoryStore::new();
        store.record_error(300, json!({"type": "C"})).await.unwrap();
        store.record_error(100, json!({"type": "A"})).await.unwrap();
        store.record_error(200, json!({"type": "B"})).await.unwrap();

        let errors = store.errors_between(100, 250).await.unwrap();
        let types: Vec<&str> = errors.iter().map(|(_, v)| v["type"].as_str().unwrap()).collect();
        assert_eq!(types, vec!["A", "B"]);
    }

    #[tokio::test]
    async fn test_identical_error_moves_to_new_score() {
        let store = MemoryCategoryStore::new();
        store.record_error(100, json!({"type": "A"})).await.unwrap();
        store.record_error(900, json!({"type": "A"})).await.unwrap();

        let errors = store.errors_between(0, 1000).await.unwrap();
        assert_eq!(errors, vec![(900, json!({"type": "A"}))]);
    }
}
