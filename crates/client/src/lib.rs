//! Pulse Client Library
//!
//! Producer-side half of the pipeline:
//!
//! - [`Collector`] - the collection core a host application talks to
//! - [`Transport`] - FIFO buffering, batching and retrying delivery
//! - [`Deliver`] / [`HttpDeliver`] - how a batch reaches the ingestion endpoint
//!
//! # Quick Start
//!
//! ```no_run
//! use pulse_client::{Collector, CollectorConfig};
//! use pulse_config::TransportConfig;
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), pulse_client::ClientError> {
//! let collector = Collector::new(CollectorConfig::from(TransportConfig {
//!     endpoint: "http://localhost:3001/v1/collect".into(),
//!     ..TransportConfig::default()
//! }))?;
//! collector.initialize();
//!
//! collector.track("performance", json!({"cpu": 12.5, "memory": 512}));
//! collector.shutdown().await;
//! # Ok(())
//! # }
//! ```
//!
//! # Delivery Guarantees
//!
//! At-least-once. A batch whose retries are exhausted goes back to the front
//! of the queue and is sent again on a later flush, so the endpoint may see
//! the same events more than once.

mod backoff;
mod collector;
mod deliver;
mod error;
mod transport;

pub use backoff::Backoff;
pub use collector::{Collector, CollectorConfig, FAULT_EVENT_TYPE, FaultHandle};
pub use deliver::{BATCH_SIZE_HEADER, Deliver, HttpDeliver};
pub use error::{ClientError, Result, TransportError};
pub use transport::{FlushOutcome, Transport, TransportMetrics, TransportMetricsSnapshot};
