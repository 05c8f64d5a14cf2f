//! Category router
//!
//! Classifies an event by its declared type, parses the payload against the
//! category's schema and writes it to the category store:
//!
//! | type          | store operation                                   |
//! |---------------|---------------------------------------------------|
//! | `performance` | merge fields into the day's record for timestamp  |
//! | `behavior`    | append to the session's ordered sequence          |
//! | `error`       | add to the error set scored by timestamp          |
//! | anything else | nothing; the event is uncategorized               |

use std::sync::Arc;

use pulse_protocol::{BehaviorRecord, Category, ErrorReport, Event, PerformanceSample};
use pulse_store::CategoryStore;
use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{PipelineError, Result};

/// An event's payload parsed for its category
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Performance(PerformanceSample),
    Behavior(BehaviorRecord),
    Error(ErrorReport),
    /// No category-specific processing applies
    Uncategorized,
}

impl Routed {
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Performance(_) => Some(Category::Performance),
            Self::Behavior(_) => Some(Category::Behavior),
            Self::Error(_) => Some(Category::Error),
            Self::Uncategorized => None,
        }
    }
}

/// Parse an event's payload for its category without storing anything
pub fn classify(event: &Event) -> Result<Routed> {
    let Some(category) = event.category() else {
        return Ok(Routed::Uncategorized);
    };
    let payload = event.payload();
    let invalid = |e: serde_json::Error| PipelineError::invalid_payload(category, e.to_string());

    let routed = match category {
        Category::Performance => {
            let sample = PerformanceSample::from_payload(payload).map_err(invalid)?;
            for (field, value) in [("cpu", sample.cpu), ("memory", sample.memory)] {
                if !value.is_finite() || value < 0.0 {
                    return Err(PipelineError::invalid_payload(
                        category,
                        format!("{field} must be a non-negative number, got {value}"),
                    ));
                }
            }
            Routed::Performance(sample)
        }
        Category::Behavior => Routed::Behavior(BehaviorRecord::from_payload(payload).map_err(invalid)?),
        Category::Error => Routed::Error(ErrorReport::from_payload(payload).map_err(invalid)?),
        // Categories added later get no processing until they are wired here
        _ => Routed::Uncategorized,
    };

    Ok(routed)
}

/// Writes categorized payloads to the category store
pub struct CategoryRouter {
    store: Arc<dyn CategoryStore>,
}

impl CategoryRouter {
    pub fn new(store: Arc<dyn CategoryStore>) -> Self {
        Self { store }
    }

    /// Classify an event and dispatch it to its category's store
    pub async fn route(&self, event: &Event) -> Result<Routed> {
        let routed = classify(event)?;

        match &routed {
            Routed::Performance(_) => {
                let date = event
                    .date()
                    .ok_or(PipelineError::TimestampOutOfRange(event.timestamp()))?;
                self.store
                    .merge_performance(date, event.timestamp(), payload_fields(event.payload()))
                    .await?;
            }
            Routed::Behavior(record) => {
                let length = self
                    .store
                    .append_behavior(record.session_key(), event.payload().clone())
                    .await?;
                trace!(session = record.session_key(), length, "behavior appended");
            }
            Routed::Error(_) => {
                self.store
                    .record_error(event.timestamp(), event.payload().clone())
                    .await?;
            }
            Routed::Uncategorized => {
                trace!(event_type = event.event_type(), "uncategorized event");
            }
        }

        Ok(routed)
    }

    pub fn store(&self) -> &Arc<dyn CategoryStore> {
        &self.store
    }
}

fn payload_fields(payload: &Value) -> Map<String, Value> {
    payload.as_object().cloned().unwrap_or_default()
}

#[cfg(test)]
#[path = "router_test.rs"]
mod tests;
