//! Aggregate accumulator storage
//!
//! Aggregates are kept per [`BucketKey`] (category + UTC day) as a flat map of
//! numeric accumulators. Accumulators only ever grow; averages are derived at
//! read time and never stored.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use pulse_protocol::Category;

use crate::error::{Result, StoreError};

/// Identifies one category's aggregates for one UTC day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub category: Category,
    pub date: NaiveDate,
}

impl BucketKey {
    pub fn new(category: Category, date: NaiveDate) -> Self {
        Self { category, date }
    }
}

impl fmt::Display for BucketKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "aggregated:{}:{}",
            self.category.bucket_name(),
            self.date.format("%Y-%m-%d")
        )
    }
}

/// Numeric accumulators keyed by bucket
#[async_trait]
pub trait AggregateStore: Send + Sync {
    /// Add `delta` to one field and return the new value
    async fn increment(&self, key: &BucketKey, field: &str, delta: f64) -> Result<f64> {
        self.increment_many(key, &[(field, delta)]).await?;
        let fields = self.read_all(key).await?;
        Ok(fields.get(field).copied().unwrap_or_default())
    }

    /// Add several deltas to one bucket as a single atomic update
    ///
    /// Either every delta is applied or none is.
    async fn increment_many(&self, key: &BucketKey, deltas: &[(&str, f64)]) -> Result<()>;

    /// Every accumulator in the bucket; empty for a bucket never written
    async fn read_all(&self, key: &BucketKey) -> Result<HashMap<String, f64>>;
}

/// Aggregate store held in a sharded concurrent map
///
/// Each update holds the bucket's shard lock for its whole duration, so
/// concurrent increments to the same bucket are never lost and readers never
/// see half of a multi-field update.
#[derive(Debug, Default)]
pub struct MemoryAggregateStore {
    buckets: DashMap<BucketKey, HashMap<String, f64>>,
}

impl MemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of buckets that have been written
    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }
}

#[async_trait]
impl AggregateStore for MemoryAggregateStore {
    async fn increment(&self, key: &BucketKey, field: &str, delta: f64) -> Result<f64> {
        check_delta(field, delta)?;
        let mut bucket = self.buckets.entry(*key).or_default();
        let value = bucket.entry(field.to_string()).or_insert(0.0);
        *value += delta;
        Ok(*value)
    }

    async fn increment_many(&self, key: &BucketKey, deltas: &[(&str, f64)]) -> Result<()> {
        for (field, delta) in deltas {
            check_delta(field, *delta)?;
        }

        let mut bucket = self.buckets.entry(*key).or_default();
        for (field, delta) in deltas {
            *bucket.entry((*field).to_string()).or_insert(0.0) += delta;
        }
        Ok(())
    }

    async fn read_all(&self, key: &BucketKey) -> Result<HashMap<String, f64>> {
        Ok(self
            .buckets
            .get(key)
            .map(|bucket| bucket.value().clone())
            .unwrap_or_default())
    }
}

fn check_delta(field: &str, delta: f64) -> Result<()> {
    if delta.is_finite() && delta >= 0.0 {
        Ok(())
    } else {
        Err(StoreError::invalid_delta(field, delta))
    }
}

#[cfg(test)]
#[path = "aggregate_test.rs"]
mod tests;
