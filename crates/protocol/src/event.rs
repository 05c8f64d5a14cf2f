//! Telemetry event
//!
//! An `Event` is immutable once built. Producers construct events with
//! [`Event::new`]; the ingestion side constructs them from untrusted JSON with
//! [`Event::from_value`], which enforces the event schema.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::category::Category;
use crate::error::ValidationError;

/// A single timestamped telemetry record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Epoch milliseconds
    timestamp: i64,

    /// Declared type, which doubles as the category name
    #[serde(rename = "type")]
    event_type: String,

    /// Opaque structured payload
    #[serde(default)]
    payload: Value,
}

impl Event {
    /// Create an event stamped with the current time
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self::with_timestamp(Utc::now().timestamp_millis(), event_type, payload)
    }

    /// Create an event with an explicit timestamp
    pub fn with_timestamp(timestamp: i64, event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            timestamp,
            event_type: event_type.into(),
            payload,
        }
    }

    /// Validate an untrusted JSON value against the event schema
    ///
    /// - `timestamp` must be a number that maps to a calendar date
    /// - `type` must be a non-empty string
    /// - `payload` may be any JSON value (absent means `null`)
    pub fn from_value(value: Value) -> Result<Self> {
        let mut map = match value {
            Value::Object(map) => map,
            other => return Err(ValidationError::NotAnObject(json_kind(&other))),
        };

        let timestamp = match map.get("timestamp") {
            None => return Err(ValidationError::missing_field("timestamp")),
            Some(Value::Number(n)) => {
                if let Some(ms) = n.as_i64() {
                    ms
                } else {
                    match n.as_f64() {
                        Some(f) if f.is_finite() => f as i64,
                        _ => {
                            return Err(ValidationError::invalid_field(
                                "timestamp",
                                "must be a finite number",
                            ));
                        }
                    }
                }
            }
            Some(other) => {
                return Err(ValidationError::invalid_field(
                    "timestamp",
                    format!("expected number, got {}", json_kind(other)),
                ));
            }
        };

        if utc_date(timestamp).is_none() {
            return Err(ValidationError::invalid_field(
                "timestamp",
                format!("{timestamp} is outside the representable date range"),
            ));
        }

        let event_type = match map.remove("type") {
            None => return Err(ValidationError::missing_field("type")),
            Some(Value::String(s)) if s.trim().is_empty() => {
                return Err(ValidationError::invalid_field("type", "must not be empty"));
            }
            Some(Value::String(s)) => s,
            Some(other) => {
                return Err(ValidationError::invalid_field(
                    "type",
                    format!("expected string, got {}", json_kind(&other)),
                ));
            }
        };

        let payload = map.remove("payload").unwrap_or(Value::Null);

        Ok(Self {
            timestamp,
            event_type,
            payload,
        })
    }

    /// Epoch milliseconds
    #[inline]
    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Declared event type
    #[inline]
    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    /// Opaque payload
    #[inline]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Category declared by the event type, if it is a known one
    #[inline]
    pub fn category(&self) -> Option<Category> {
        Category::from_type(&self.event_type)
    }

    /// Calendar date (UTC) of the event timestamp
    #[inline]
    pub fn date(&self) -> Option<NaiveDate> {
        utc_date(self.timestamp)
    }

    /// Serialize to a compact JSON string
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl TryFrom<Value> for Event {
    type Error = ValidationError;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// UTC calendar date for an epoch-millisecond timestamp
pub fn utc_date(timestamp_ms: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp_millis(timestamp_ms).map(|dt| dt.date_naive())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
#[path = "event_test.rs"]
mod tests;
