//! Subscriber management for live connections
//!
//! Each connected observer gets a `Subscriber` holding the sending half of a
//! bounded channel. The `SubscriberManager` handles registration, removal
//! and fan-out.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tokio::sync::mpsc::{self, error::TrySendError};

use crate::error::{Result, TapError};

/// One serialized event, shared by every subscriber
pub type Frame = Arc<str>;

/// Counter for generating unique subscriber IDs
static SUBSCRIBER_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// A single live subscriber (connected observer)
#[derive(Debug)]
pub struct Subscriber {
    id: u64,
    sender: mpsc::Sender<Frame>,
    /// Frames lost because the subscriber's channel was full
    dropped: AtomicU64,
}

impl Subscriber {
    fn new(sender: mpsc::Sender<Frame>) -> Self {
        Self {
            id: SUBSCRIBER_ID_COUNTER.fetch_add(1, Ordering::Relaxed),
            sender,
            dropped: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Whether the receiving side is still attached
    #[inline]
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Frames dropped for this subscriber
    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Subscribers that received the frame
    pub sent: usize,
    /// Open subscribers whose channel was full
    pub dropped: usize,
    /// Subscribers skipped because they are no longer open
    pub closed: usize,
}

/// Manages all active subscribers
#[derive(Debug)]
pub struct SubscriberManager {
    subscribers: RwLock<Vec<Arc<Subscriber>>>,
    max_subscribers: usize,
    channel_capacity: usize,
}

impl SubscriberManager {
    pub fn new(max_subscribers: usize, channel_capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            max_subscribers,
            channel_capacity: channel_capacity.max(1),
        }
    }

    /// Register a new subscriber
    ///
    /// Returns the subscriber ID and receiver channel
    pub fn subscribe(&self) -> Result<(u64, mpsc::Receiver<Frame>)> {
        let mut subscribers = self.subscribers.write();

        if subscribers.len() >= self.max_subscribers {
            return Err(TapError::MaxSubscribers {
                max: self.max_subscribers,
            });
        }

        let (sender, receiver) = mpsc::channel(self.channel_capacity);
        let subscriber = Arc::new(Subscriber::new(sender));
        let id = subscriber.id();
        subscribers.push(subscriber);

        Ok((id, receiver))
    }

    /// Unsubscribe by ID
    pub fn unsubscribe(&self, id: u64) -> Result<()> {
        let mut subscribers = self.subscribers.write();
        let original_len = subscribers.len();
        subscribers.retain(|s| s.id() != id);

        if subscribers.len() == original_len {
            return Err(TapError::SubscriberNotFound { id });
        }

        Ok(())
    }

    pub fn count(&self) -> usize {
        self.subscribers.read().len()
    }

    #[inline]
    pub fn has_subscribers(&self) -> bool {
        !self.subscribers.read().is_empty()
    }

    /// Look up a subscriber by ID
    pub fn get(&self, id: u64) -> Option<Arc<Subscriber>> {
        self.subscribers.read().iter().find(|s| s.id() == id).cloned()
    }

    /// Offer a frame to every open subscriber without waiting
    pub fn broadcast(&self, frame: &Frame) -> BroadcastReport {
        let subscribers = self.subscribers.read();
        let mut report = BroadcastReport::default();

        for subscriber in subscribers.iter() {
            if !subscriber.is_open() {
                report.closed += 1;
                continue;
            }

            match subscriber.sender.try_send(Arc::clone(frame)) {
                Ok(()) => report.sent += 1,
                Err(TrySendError::Full(_)) => {
                    subscriber.dropped.fetch_add(1, Ordering::Relaxed);
                    report.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => report.closed += 1,
            }
        }

        report
    }

    /// Remove subscribers whose receiver has gone away
    pub fn cleanup_disconnected(&self) -> usize {
        let mut subscribers = self.subscribers.write();
        let original_len = subscribers.len();
        subscribers.retain(|s| s.is_open());
        original_len - subscribers.len()
    }
}

#[cfg(test)]
#[path = "subscriber_test.rs"]
mod tests;
