//! Batching transport
//!
//! Buffers events in a FIFO queue and ships them in bounded batches.
//!
//! # Flow
//!
//! ```text
//! enqueue ──► queue ──(len >= batch_size)──► flush ──► Deliver
//!                ▲                              │
//!                └──── re-queued at front ◄─────┘ (retries exhausted)
//! ```
//!
//! At most one flush is in flight at a time. `enqueue` never blocks and
//! never fails: when the queue reaches `batch_size` it claims the in-flight
//! flag and spawns the flush on the current tokio runtime. Without a
//! runtime the events simply wait for the next explicit flush.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use parking_lot::Mutex;
use pulse_config::TransportConfig;
use pulse_protocol::Event;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tracing::{debug, trace, warn};

use crate::backoff::Backoff;
use crate::deliver::Deliver;
use crate::error::TransportError;

/// Result of one flush cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was queued
    Empty,
    /// Another flush holds the in-flight flag
    InFlight,
    /// The batch was acknowledged
    Delivered(usize),
    /// Every attempt failed; the batch is back at the head of the queue
    Requeued(usize),
}

/// Transport counters
#[derive(Debug, Default)]
pub struct TransportMetrics {
    pub events_enqueued: AtomicU64,
    pub events_delivered: AtomicU64,
    pub batches_sent: AtomicU64,
    pub batches_failed: AtomicU64,
    pub batches_requeued: AtomicU64,
    pub delivery_attempts: AtomicU64,
}

impl TransportMetrics {
    #[inline]
    fn event_enqueued(&self) {
        self.events_enqueued.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn attempt(&self) {
        self.delivery_attempts.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn batch_sent(&self, events: usize) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
        self.events_delivered
            .fetch_add(events as u64, Ordering::Relaxed);
    }

    #[inline]
    fn batch_failed(&self) {
        self.batches_failed.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    fn batch_requeued(&self) {
        self.batches_requeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TransportMetricsSnapshot {
        TransportMetricsSnapshot {
            events_enqueued: self.events_enqueued.load(Ordering::Relaxed),
            events_delivered: self.events_delivered.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            batches_failed: self.batches_failed.load(Ordering::Relaxed),
            batches_requeued: self.batches_requeued.load(Ordering::Relaxed),
            delivery_attempts: self.delivery_attempts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`TransportMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransportMetricsSnapshot {
    pub events_enqueued: u64,
    pub events_delivered: u64,
    pub batches_sent: u64,
    pub batches_failed: u64,
    pub batches_requeued: u64,
    pub delivery_attempts: u64,
}

/// Buffering, batching and retrying transport
pub struct Transport {
    config: TransportConfig,
    backoff: Backoff,
    deliver: Arc<dyn Deliver>,
    queue: Mutex<VecDeque<Event>>,
    in_flight: AtomicBool,
    flush_done: Notify,
    metrics: TransportMetrics,
}

impl Transport {
    pub fn new(config: TransportConfig, deliver: Arc<dyn Deliver>) -> Self {
        let backoff = Backoff::new(config.retry_strategy, config.base_delay, config.max_delay);
        Self {
            config,
            backoff,
            deliver,
            queue: Mutex::new(VecDeque::new()),
            in_flight: AtomicBool::new(false),
            flush_done: Notify::new(),
            metrics: TransportMetrics::default(),
        }
    }

    /// Queue an event, triggering a background flush once a batch is full
    pub fn enqueue(self: &Arc<Self>, event: Event) {
        let len = {
            let mut queue = self.queue.lock();
            queue.push_back(event);
            queue.len()
        };
        self.metrics.event_enqueued();

        if len < self.config.batch_size {
            return;
        }

        let Ok(handle) = Handle::try_current() else {
            trace!(queued = len, "no async runtime, flush deferred");
            return;
        };

        let Some(claim) = self.try_claim_owned() else {
            return;
        };

        // The claim lives inside the future, so a task dropped unpolled still releases it
        handle.spawn(async move {
            let transport = &claim.transport;
            loop {
                let outcome = transport.flush_batch().await;
                if !matches!(outcome, FlushOutcome::Delivered(_))
                    || transport.queue_len() < transport.config.batch_size
                {
                    break;
                }
            }
        });
    }

    /// Run one flush cycle
    pub async fn flush(&self) -> FlushOutcome {
        let Some(_claim) = self.try_claim() else {
            return FlushOutcome::InFlight;
        };
        self.flush_batch().await
    }

    /// Flush until the queue is empty or `shutdown_timeout` passes
    pub async fn flush_all(&self) -> Result<(), TransportError> {
        let drained = tokio::time::timeout(self.config.shutdown_timeout, self.drain()).await;
        match drained {
            Ok(()) => Ok(()),
            Err(_) => {
                let remaining = self.queue_len();
                warn!(remaining, "transport drain timed out");
                Err(TransportError::ShutdownTimeout { remaining })
            }
        }
    }

    /// Number of queued events
    pub fn queue_len(&self) -> usize {
        self.queue.lock().len()
    }

    /// Copy of the queued events, oldest first
    pub fn pending(&self) -> Vec<Event> {
        self.queue.lock().iter().cloned().collect()
    }

    pub fn is_flushing(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn metrics(&self) -> &TransportMetrics {
        &self.metrics
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    async fn drain(&self) {
        loop {
            let notified = self.flush_done.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            match self.flush().await {
                FlushOutcome::Empty => return,
                FlushOutcome::InFlight => notified.await,
                FlushOutcome::Delivered(_) | FlushOutcome::Requeued(_) => {}
            }
        }
    }

    fn try_claim(&self) -> Option<Claim<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Claim { transport: self })
    }

    fn try_claim_owned(self: &Arc<Self>) -> Option<OwnedClaim> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| OwnedClaim {
                transport: Arc::clone(self),
            })
    }

    /// Take one batch off the queue and try to deliver it
    ///
    /// Caller must hold the in-flight claim.
    async fn flush_batch(&self) -> FlushOutcome {
        let batch: Vec<Event> = {
            let mut queue = self.queue.lock();
            let n = queue.len().min(self.config.batch_size);
            queue.drain(..n).collect()
        };

        if batch.is_empty() {
            return FlushOutcome::Empty;
        }

        let size = batch.len();
        let mut pending = PendingBatch {
            transport: self,
            batch: Some(batch),
        };

        let attempts = self.config.max_retries.max(1);
        for attempt in 0..attempts {
            self.metrics.attempt();
            let result = match pending.batch.as_deref() {
                Some(events) => self.deliver.deliver(events).await,
                None => return FlushOutcome::Empty,
            };

            match result {
                Ok(()) => {
                    pending.batch = None;
                    self.metrics.batch_sent(size);
                    debug!(events = size, attempt = attempt + 1, "batch delivered");
                    return FlushOutcome::Delivered(size);
                }
                Err(e) => {
                    self.metrics.batch_failed();
                    if attempt + 1 < attempts {
                        let delay = self.backoff.delay(attempt);
                        debug!(
                            events = size,
                            attempt = attempt + 1,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "delivery failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    } else {
                        warn!(
                            events = size,
                            attempts,
                            error = %e,
                            "delivery failed, batch re-queued"
                        );
                    }
                }
            }
        }

        // Dropping `pending` puts the batch back at the front
        drop(pending);
        self.metrics.batch_requeued();
        FlushOutcome::Requeued(size)
    }

    fn requeue_front(&self, batch: Vec<Event>) {
        let mut queue = self.queue.lock();
        for event in batch.into_iter().rev() {
            queue.push_front(event);
        }
    }

    fn release(&self) {
        self.in_flight.store(false, Ordering::Release);
        self.flush_done.notify_waiters();
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport")
            .field("endpoint", &self.config.endpoint)
            .field("batch_size", &self.config.batch_size)
            .field("queued", &self.queue_len())
            .field("in_flight", &self.is_flushing())
            .finish()
    }
}

/// Holds the in-flight flag; releases it when dropped
struct Claim<'a> {
    transport: &'a Transport,
}

impl Drop for Claim<'_> {
    fn drop(&mut self) {
        self.transport.release();
    }
}

/// In-flight claim handed to a background flush task
struct OwnedClaim {
    transport: Arc<Transport>,
}

impl Drop for OwnedClaim {
    fn drop(&mut self) {
        self.transport.release();
    }
}

/// A batch taken off the queue; goes back to the front unless delivered
struct PendingBatch<'a> {
    transport: &'a Transport,
    batch: Option<Vec<Event>>,
}

impl Drop for PendingBatch<'_> {
    fn drop(&mut self) {
        if let Some(batch) = self.batch.take() {
            self.transport.requeue_front(batch);
        }
    }
}

#[cfg(test)]
#[path = "transport_test.rs"]
mod tests;
