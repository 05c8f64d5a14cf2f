//! Collection core
//!
//! The producer-facing service. A host constructs one [`Collector`], calls
//! [`Collector::initialize`] once, then records events with
//! [`Collector::track`]. Tracking never fails: events are handed to the
//! batching transport and delivery problems are absorbed there.
//!
//! Runtime faults reach the collector through a [`FaultHandle`], and
//! optionally through a process panic hook.

use std::panic::{self, PanicHookInfo};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use pulse_config::TransportConfig;
use pulse_protocol::Event;
use serde_json::{Value, json};
use tracing::{debug, info, warn};

use crate::deliver::{Deliver, HttpDeliver, parse_endpoint};
use crate::error::Result;
use crate::transport::{Transport, TransportMetrics};

/// Event type used for captured faults
pub const FAULT_EVENT_TYPE: &str = "error";

/// Collector configuration
#[derive(Debug, Clone, Default)]
pub struct CollectorConfig {
    pub transport: TransportConfig,

    /// Install a panic hook that reports panics as error events
    pub capture_panics: bool,
}

impl From<TransportConfig> for CollectorConfig {
    fn from(transport: TransportConfig) -> Self {
        Self {
            transport,
            capture_panics: false,
        }
    }
}

struct Inner {
    transport: Arc<Transport>,
    initialized: AtomicBool,
    shut_down: AtomicBool,
    capture_panics: bool,
}

impl Inner {
    fn track_event(&self, event: Event) {
        if !self.initialized.load(Ordering::Acquire) {
            warn!(
                event_type = event.event_type(),
                "collector not initialized, event dropped"
            );
            return;
        }
        self.transport.enqueue(event);
    }

    fn report_fault(&self, kind: &str, message: &str, detail: Value) {
        let mut payload = json!({
            "type": kind,
            "message": message,
            "timestamp": Utc::now().timestamp_millis(),
        });
        if let (Value::Object(payload), Value::Object(detail)) = (&mut payload, detail) {
            payload.extend(detail);
        }
        self.track_event(Event::new(FAULT_EVENT_TYPE, payload));
    }
}

/// Producer-side collection service
pub struct Collector {
    inner: Arc<Inner>,
}

impl Collector {
    /// Create a collector that delivers over HTTP
    ///
    /// # Errors
    ///
    /// Fails when the endpoint is empty or not an http(s) URL.
    pub fn new(config: CollectorConfig) -> Result<Self> {
        let deliver = HttpDeliver::new(&config.transport.endpoint, config.transport.request_timeout)?;
        Ok(Self::build(config, Arc::new(deliver)))
    }

    /// Create a collector with a custom delivery implementation
    pub fn with_deliver(config: CollectorConfig, deliver: Arc<dyn Deliver>) -> Result<Self> {
        parse_endpoint(&config.transport.endpoint)?;
        Ok(Self::build(config, deliver))
    }

    fn build(config: CollectorConfig, deliver: Arc<dyn Deliver>) -> Self {
        Self {
            inner: Arc::new(Inner {
                transport: Arc::new(Transport::new(config.transport, deliver)),
                initialized: AtomicBool::new(false),
                shut_down: AtomicBool::new(false),
                capture_panics: config.capture_panics,
            }),
        }
    }

    /// Start collecting; a second call is a no-op
    pub fn initialize(&self) {
        if self.inner.initialized.swap(true, Ordering::AcqRel) {
            warn!("collector already initialized");
            return;
        }

        if self.inner.capture_panics {
            install_panic_hook(Arc::clone(&self.inner));
        }

        info!(
            endpoint = %self.inner.transport.config().endpoint,
            batch_size = self.inner.transport.config().batch_size,
            capture_panics = self.inner.capture_panics,
            "collector initialized"
        );
    }

    pub fn is_initialized(&self) -> bool {
        self.inner.initialized.load(Ordering::Acquire)
    }

    /// Record an event stamped with the current time
    pub fn track(&self, event_type: &str, payload: Value) {
        self.inner.track_event(Event::new(event_type, payload));
    }

    /// Record a pre-built event
    pub fn track_event(&self, event: Event) {
        self.inner.track_event(event);
    }

    /// Handle for reporting runtime faults from anywhere in the host
    pub fn fault_handle(&self) -> FaultHandle {
        FaultHandle {
            inner: Arc::clone(&self.inner),
        }
    }

    /// Drain the queue; only the first call does any work
    pub async fn shutdown(&self) {
        if self.inner.shut_down.swap(true, Ordering::AcqRel) {
            debug!("collector already shut down");
            return;
        }

        match self.inner.transport.flush_all().await {
            Ok(()) => info!("collector shut down, queue drained"),
            Err(e) => warn!(error = %e, "collector shut down with undelivered events"),
        }
    }

    pub fn transport(&self) -> &Arc<Transport> {
        &self.inner.transport
    }

    pub fn metrics(&self) -> &TransportMetrics {
        self.inner.transport.metrics()
    }
}

/// Cloneable fault reporter
///
/// Faults become `error` events whose payload carries the fault `type`, its
/// `message`, an optional `stack` and the capture `timestamp`.
#[derive(Clone)]
pub struct FaultHandle {
    inner: Arc<Inner>,
}

impl FaultHandle {
    /// Report an uncaught runtime error
    pub fn report_error(&self, message: &str, stack: Option<&str>) {
        self.inner
            .report_fault("error", message, json!({ "stack": stack }));
    }

    /// Report a rejected asynchronous operation nobody handled
    pub fn report_rejection(&self, reason: &str, stack: Option<&str>) {
        self.inner
            .report_fault("unhandled_rejection", reason, json!({ "stack": stack }));
    }
}

fn install_panic_hook(inner: Arc<Inner>) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info: &PanicHookInfo<'_>| {
        let location = info
            .location()
            .map(|l| format!("{}:{}:{}", l.file(), l.line(), l.column()));
        inner.report_fault(
            "panic",
            &panic_message(info),
            json!({ "location": location }),
        );
        previous(info);
    }));
}

fn panic_message(info: &PanicHookInfo<'_>) -> String {
    if let Some(s) = info.payload().downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = info.payload().downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

#[cfg(test)]
#[path = "collector_test.rs"]
mod tests;
