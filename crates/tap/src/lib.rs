//! Pulse Tap - Live broadcast fan-out
//!
//! Every event accepted by the ingestion endpoint is pushed to the currently
//! connected live subscribers. The tap:
//!
//! - serializes each event once and shares the frame between subscribers
//! - never blocks ingestion: a slow subscriber loses copies, nobody else does
//! - skips subscribers whose connection has closed and cleans them up later
//! - does nothing at all when no one is listening
//!
//! There is no replay: a subscriber sees only events broadcast after it
//! registered.
//!
//! # Architecture
//!
//! ```text
//! POST /v1/collect
//!     │
//!     ├──→ AppendLog.append()
//!     │
//!     └──→ TapPoint.broadcast(&event)
//!               │  serialize once → Arc<str>
//!               ▼
//!         SubscriberManager ──try_send──→ per-subscriber mpsc
//!                                              │
//!                                              ▼
//!                                     GET /v1/live (WebSocket)
//! ```

mod error;
pub mod subscriber;
pub mod tap_point;
pub mod ws;

pub use error::{Result, TapError};
pub use subscriber::{BroadcastReport, Frame, Subscriber, SubscriberManager};
pub use tap_point::{TapPoint, TapStats};
