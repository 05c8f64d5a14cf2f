//! Pulse Pipeline - Processing of stored events
//!
//! Every event accepted by the ingestion endpoint is first appended to the log
//! of record, then handed here:
//!
//! ```text
//! Event ──→ [CategoryRouter] ──→ CategoryStore (raw records per category)
//!                 │
//!                 └─ Routed ──→ [Aggregator] ──→ AggregateStore (daily sums)
//!                                   │
//!                 performance only  └──→ [WindowBuffer] ──→ AnomalyDetector
//! ```
//!
//! Failures here never un-commit an event: the caller logs them and moves on.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pulse_pipeline::Pipeline;
//! use pulse_store::{MemoryAggregateStore, MemoryCategoryStore};
//!
//! let pipeline = Pipeline::new(
//!     Arc::new(MemoryCategoryStore::new()),
//!     Arc::new(MemoryAggregateStore::new()),
//!     &config.pipeline,
//! );
//! let outcome = pipeline.process(&event).await?;
//! let today = pipeline.snapshot(event.date().unwrap()).await?;
//! ```

pub mod aggregator;
pub mod anomaly;
mod error;
mod metrics;
mod pipeline;
pub mod router;

pub use aggregator::{Aggregator, BehaviorSummary, ErrorSummary, PerformanceSummary, Snapshot};
pub use anomaly::{AnomalyDetector, AnomalyVerdict, DisabledDetector, FeatureWindow, PredictionDetector};
pub use error::{PipelineError, Result};
pub use metrics::{PipelineMetrics, PipelineMetricsSnapshot};
pub use pipeline::{Pipeline, ProcessOutcome};
pub use router::{CategoryRouter, Routed};
