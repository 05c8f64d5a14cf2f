//! Pulse Sources - Network ingestion
//!
//! The HTTP source accepts telemetry batches from producers, commits each
//! event to the append log, fans it out to live subscribers and hands it to
//! the processing pipeline.
//!
//! # Example
//!
//! ```ignore
//! use pulse_sources::http::HttpSource;
//! use tokio_util::sync::CancellationToken;
//!
//! let source = HttpSource::new(config.server.clone(), log, tap, pipeline);
//! source.run(CancellationToken::new()).await?;
//! ```

pub mod http;

pub use http::{HttpMetricsSnapshot, HttpSource, HttpSourceError, HttpSourceMetrics};
