//! TapPoint - the broadcast point for live streaming
//!
//! `TapPoint` sits between the ingestion endpoint and the live feed:
//!
//! - Zero cost when no subscribers (atomic flag check)
//! - One serialization per event, shared by all subscribers
//! - Automatic cleanup of disconnected subscribers
//!
//! # Usage
//!
//! ```ignore
//! let tap = Arc::new(TapPoint::new(&TapConfig::default()));
//! tap.spawn_maintenance(cancel.clone());
//!
//! // In the ingest path:
//! tap.broadcast(&event);  // No-op if no subscribers
//!
//! // For new connections:
//! let (id, rx) = tap.subscribe()?;
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use pulse_config::TapConfig;
use pulse_protocol::Event;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::error::Result;
use crate::subscriber::{Frame, SubscriberManager};

/// The broadcast point for live subscribers
#[derive(Debug)]
pub struct TapPoint {
    subscribers: SubscriberManager,
    /// Quick check flag for the ingest path
    has_subscribers: AtomicBool,
    cleanup_interval: Duration,
    /// Events offered while at least one subscriber existed
    broadcast_count: AtomicU64,
    /// Frames handed to subscriber channels
    sent_count: AtomicU64,
    /// Frames lost to full subscriber channels
    dropped_count: AtomicU64,
}

impl TapPoint {
    pub fn new(config: &TapConfig) -> Self {
        Self {
            subscribers: SubscriberManager::new(config.max_subscribers, config.channel_capacity),
            has_subscribers: AtomicBool::new(false),
            cleanup_interval: config.cleanup_interval,
            broadcast_count: AtomicU64::new(0),
            sent_count: AtomicU64::new(0),
            dropped_count: AtomicU64::new(0),
        }
    }

    /// Push an event to every live subscriber
    ///
    /// Never blocks and never fails; returns how many subscribers got it.
    #[inline]
    pub fn broadcast(&self, event: &Event) -> usize {
        if !self.has_subscribers.load(Ordering::Relaxed) {
            return 0;
        }

        let frame: Frame = match event.to_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                warn!(error = %e, "failed to serialize event for live feed");
                return 0;
            }
        };

        self.broadcast_count.fetch_add(1, Ordering::Relaxed);
        let report = self.subscribers.broadcast(&frame);

        if report.sent > 0 {
            self.sent_count
                .fetch_add(report.sent as u64, Ordering::Relaxed);
        }
        if report.dropped > 0 {
            self.dropped_count
                .fetch_add(report.dropped as u64, Ordering::Relaxed);
            debug!(dropped = report.dropped, "live subscribers too slow, frames dropped");
        }
        trace!(sent = report.sent, closed = report.closed, "broadcast event");

        report.sent
    }

    /// Register a live subscriber
    pub fn subscribe(&self) -> Result<(u64, mpsc::Receiver<Frame>)> {
        let (id, receiver) = self.subscribers.subscribe()?;
        self.has_subscribers.store(true, Ordering::SeqCst);
        debug!(id, "new live subscriber");
        Ok((id, receiver))
    }

    pub fn unsubscribe(&self, id: u64) -> Result<()> {
        self.subscribers.unsubscribe(id)?;
        self.refresh_flag();
        debug!(id, "live subscriber removed");
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.count()
    }

    #[inline]
    pub fn has_subscribers(&self) -> bool {
        self.has_subscribers.load(Ordering::Relaxed)
    }

    pub fn stats(&self) -> TapStats {
        TapStats {
            broadcast_count: self.broadcast_count.load(Ordering::Relaxed),
            sent_count: self.sent_count.load(Ordering::Relaxed),
            dropped_count: self.dropped_count.load(Ordering::Relaxed),
            subscriber_count: self.subscribers.count(),
        }
    }

    /// Remove disconnected subscribers
    ///
    /// Called periodically by the maintenance task.
    pub fn cleanup(&self) -> usize {
        let removed = self.subscribers.cleanup_disconnected();
        if removed > 0 {
            debug!(removed, "cleaned up disconnected subscribers");
            self.refresh_flag();
        }
        removed
    }

    /// Spawn the cleanup task; it stops when `cancel` fires
    pub fn spawn_maintenance(
        self: &Arc<Self>,
        cancel: CancellationToken,
    ) -> tokio::task::JoinHandle<()> {
        let tap = Arc::clone(self);

        tokio::spawn(async move {
            let mut cleanup_interval = tokio::time::interval(tap.cleanup_interval);
            cleanup_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = cleanup_interval.tick() => {
                        tap.cleanup();
                    }
                }
            }
            debug!("tap maintenance stopped");
        })
    }

    fn refresh_flag(&self) {
        if !self.subscribers.has_subscribers() {
            self.has_subscribers.store(false, Ordering::SeqCst);
            // A concurrent subscribe may have landed between the check and the store
            if self.subscribers.has_subscribers() {
                self.has_subscribers.store(true, Ordering::SeqCst);
            }
        }
    }
}

/// Statistics about the tap point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TapStats {
    pub broadcast_count: u64,
    pub sent_count: u64,
    pub dropped_count: u64,
    pub subscriber_count: usize,
}

#[cfg(test)]
#[path = "tap_point_test.rs"]
mod tests;
