//! Pulse Protocol - Core types for the Pulse telemetry pipeline
//!
//! This crate provides the foundational types that flow through the pipeline:
//! - `Event` - A single timestamped telemetry record
//! - `Category` - The metric category declared by an event's `type`
//! - `PerformanceSample`, `BehaviorRecord`, `ErrorReport` - Strict per-category payload schemas
//! - `ValidationError` - Why an incoming event was rejected
//!
//! # Wire Format
//!
//! Events travel as JSON objects:
//!
//! ```text
//! {"timestamp": 1718000000000, "type": "performance", "payload": {"cpu": 12.5, "memory": 512}}
//! ```
//!
//! The `payload` is opaque at ingestion time. It only gets a typed shape when
//! the pipeline classifies the event by category.

mod category;
mod error;
mod event;
mod payload;

pub use category::Category;
pub use error::ValidationError;
pub use event::{Event, utc_date};
pub use payload::{BehaviorRecord, ErrorReport, NetworkSample, PerformanceSample};

/// Result type for validation operations
pub type Result<T> = std::result::Result<T, ValidationError>;

/// Session key used for behavior records that carry no session id
pub const ANONYMOUS_SESSION: &str = "anonymous";

/// Error type recorded for error reports that carry no type
pub const UNKNOWN_ERROR_TYPE: &str = "unknown";
