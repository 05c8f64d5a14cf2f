//! Pulse Store - Storage collaborators for the telemetry pipeline
//!
//! Three storage concerns live here, each behind an `async_trait` so the
//! server can be wired to a different backend without touching the pipeline:
//!
//! - [`AppendLog`] - the durable, totally ordered log of record
//!   ([`MemoryLog`], [`FileLog`])
//! - [`AggregateStore`] - numeric accumulators per category bucket
//!   ([`MemoryAggregateStore`])
//! - [`CategoryStore`] - raw per-category records written by the router
//!   ([`MemoryCategoryStore`])

mod aggregate;
mod category;
mod error;
pub mod log;

pub use aggregate::{AggregateStore, BucketKey, MemoryAggregateStore};
pub use category::{CategoryStore, MemoryCategoryStore};
pub use error::{Result, StoreError};
pub use log::{AppendLog, FileLog, LogEntry, MemoryLog};
