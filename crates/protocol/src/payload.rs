//! Per-category payload schemas
//!
//! Payloads arrive as opaque JSON. The category router parses them into these
//! types once an event's category is known. Fields that are not part of the
//! schema are preserved in `extra` so raw category stores keep the whole
//! payload.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::{ANONYMOUS_SESSION, UNKNOWN_ERROR_TYPE};

/// Resource usage sample carried by `performance` events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSample {
    pub cpu: f64,
    pub memory: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<NetworkSample>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fps: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Network section of a performance sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkSample {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PerformanceSample {
    /// Parse a payload against the performance schema
    pub fn from_payload(payload: &Value) -> serde_json::Result<Self> {
        Self::deserialize(payload)
    }

    /// Network latency, if reported
    #[inline]
    pub fn latency(&self) -> Option<f64> {
        self.network.as_ref().and_then(|n| n.latency)
    }
}

/// User interaction record carried by `behavior` events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BehaviorRecord {
    #[serde(
        rename = "sessionId",
        alias = "session_id",
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub session_id: Option<String>,

    /// `null` and absent are both treated as no interactions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactions: Option<Vec<Value>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BehaviorRecord {
    /// Parse a payload against the behavior schema
    pub fn from_payload(payload: &Value) -> serde_json::Result<Self> {
        Self::deserialize(payload)
    }

    /// Session key; records without one share the anonymous session
    pub fn session_key(&self) -> &str {
        self.session_id.as_deref().unwrap_or(ANONYMOUS_SESSION)
    }

    /// Number of interactions in this record
    #[inline]
    pub fn interaction_count(&self) -> usize {
        self.interactions.as_ref().map_or(0, Vec::len)
    }
}

/// Fault report carried by `error` events
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    #[serde(
        rename = "type",
        default = "unknown_error_type",
        deserialize_with = "error_type"
    )]
    pub error_type: String,

    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub message: Option<String>,

    #[serde(
        default,
        deserialize_with = "scalar_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub stack: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ErrorReport {
    /// Parse a payload against the error schema
    pub fn from_payload(payload: &Value) -> serde_json::Result<Self> {
        Self::deserialize(payload)
    }
}

fn unknown_error_type() -> String {
    UNKNOWN_ERROR_TYPE.to_string()
}

/// Identifier-like field: any JSON scalar, kept in its text form
///
/// Producers send numeric session ids and error codes; `null` counts as absent.
fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(v @ (Value::Number(_) | Value::Bool(_))) => Ok(Some(v.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected a string or scalar, found {other}"
        ))),
    }
}

fn error_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(scalar_string(deserializer)?.unwrap_or_else(unknown_error_type))
}

#[cfg(test)]
#[path = "payload_test.rs"]
mod tests;
