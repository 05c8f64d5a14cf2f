//! Incremental aggregator
//!
//! Keeps running totals per `(category, UTC day)` bucket in an
//! [`AggregateStore`]. Each categorized event contributes one atomic
//! multi-field increment, so a snapshot never observes half of an event.
//!
//! Performance buckets hold sums (`cpu_sum`, `memory_sum`); averages are
//! derived at read time by dividing by `total_requests`.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use pulse_protocol::Category;
use pulse_store::{AggregateStore, BucketKey};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::router::Routed;

pub const TOTAL_REQUESTS: &str = "total_requests";
pub const CPU_SUM: &str = "cpu_sum";
pub const MEMORY_SUM: &str = "memory_sum";
pub const TOTAL_SESSIONS: &str = "total_sessions";
pub const TOTAL_INTERACTIONS: &str = "total_interactions";
pub const TOTAL_ERRORS: &str = "total_errors";
pub const ERROR_TYPE_PREFIX: &str = "error_type:";

/// Folds categorized events into daily accumulators
pub struct Aggregator {
    store: Arc<dyn AggregateStore>,
}

impl Aggregator {
    pub fn new(store: Arc<dyn AggregateStore>) -> Self {
        Self { store }
    }

    /// Apply one event's contribution to its bucket for `date`
    ///
    /// Returns the bucket touched, or `None` for uncategorized events.
    pub async fn aggregate(&self, routed: &Routed, date: NaiveDate) -> Result<Option<BucketKey>> {
        let key = match routed {
            Routed::Performance(sample) => {
                let key = BucketKey::new(Category::Performance, date);
                self.store
                    .increment_many(
                        &key,
                        &[(TOTAL_REQUESTS, 1.0), (CPU_SUM, sample.cpu), (MEMORY_SUM, sample.memory)],
                    )
                    .await?;
                key
            }
            Routed::Behavior(record) => {
                let key = BucketKey::new(Category::Behavior, date);
                self.store
                    .increment_many(
                        &key,
                        &[
                            (TOTAL_SESSIONS, 1.0),
                            (TOTAL_INTERACTIONS, record.interaction_count() as f64),
                        ],
                    )
                    .await?;
                key
            }
            Routed::Error(report) => {
                let key = BucketKey::new(Category::Error, date);
                let by_type = format!("{ERROR_TYPE_PREFIX}{}", report.error_type);
                self.store
                    .increment_many(&key, &[(TOTAL_ERRORS, 1.0), (by_type.as_str(), 1.0)])
                    .await?;
                key
            }
            Routed::Uncategorized => return Ok(None),
        };

        Ok(Some(key))
    }

    /// Read the summary for one day
    ///
    /// A day with no events yields zero totals and absent averages.
    pub async fn snapshot(&self, date: NaiveDate) -> Result<Snapshot> {
        let performance = self
            .store
            .read_all(&BucketKey::new(Category::Performance, date))
            .await?;
        let behavior = self
            .store
            .read_all(&BucketKey::new(Category::Behavior, date))
            .await?;
        let errors = self
            .store
            .read_all(&BucketKey::new(Category::Error, date))
            .await?;

        let field = |fields: &std::collections::HashMap<String, f64>, name: &str| {
            fields.get(name).copied().unwrap_or(0.0)
        };

        let total_requests = field(&performance, TOTAL_REQUESTS);
        let total_sessions = field(&behavior, TOTAL_SESSIONS);
        let total_interactions = field(&behavior, TOTAL_INTERACTIONS);

        let by_type = errors
            .iter()
            .filter_map(|(name, count)| {
                name.strip_prefix(ERROR_TYPE_PREFIX)
                    .map(|error_type| (error_type.to_string(), as_count(*count)))
            })
            .collect();

        Ok(Snapshot {
            date,
            performance: PerformanceSummary {
                total_requests: as_count(total_requests),
                avg_cpu: mean(field(&performance, CPU_SUM), total_requests),
                avg_memory: mean(field(&performance, MEMORY_SUM), total_requests),
            },
            behavior: BehaviorSummary {
                total_sessions: as_count(total_sessions),
                total_interactions: as_count(total_interactions),
                avg_interactions_per_session: mean(total_interactions, total_sessions),
            },
            errors: ErrorSummary {
                total: as_count(field(&errors, TOTAL_ERRORS)),
                by_type,
            },
        })
    }

    pub fn store(&self) -> &Arc<dyn AggregateStore> {
        &self.store
    }
}

/// Aggregated summary of one UTC day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub date: NaiveDate,
    pub performance: PerformanceSummary,
    pub behavior: BehaviorSummary,
    pub errors: ErrorSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total_requests: u64,
    /// `None` when no samples were recorded
    pub avg_cpu: Option<f64>,
    pub avg_memory: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorSummary {
    pub total_sessions: u64,
    pub total_interactions: u64,
    pub avg_interactions_per_session: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorSummary {
    pub total: u64,
    pub by_type: BTreeMap<String, u64>,
}

#[inline]
fn mean(sum: f64, count: f64) -> Option<f64> {
    (count > 0.0).then(|| sum / count)
}

#[inline]
fn as_count(value: f64) -> u64 {
    value.round() as u64
}

#[cfg(test)]
#[path = "aggregator_test.rs"]
mod tests;
