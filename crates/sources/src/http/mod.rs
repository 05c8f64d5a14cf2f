//! HTTP Source - REST API for telemetry ingestion
//!
//! # Endpoints
//!
//! - `POST /v1/collect` - Ingest events
//! - `GET /v1/live` - WebSocket live feed
//! - `GET /v1/aggregates/{date}` - Daily snapshot
//! - `GET /v1/log` - Committed log entries
//! - `GET /health` - Health check
//!
//! # Protocol
//!
//! ```text
//! POST /v1/collect
//! Content-Type: application/json
//!
//! [{"timestamp":1709251200000,"type":"performance","payload":{"cpu":40,"memory":512}}]
//! ```
//!
//! A body that is a single JSON object is treated as a batch of one.
//!
//! | status | body                                  | meaning                               |
//! |--------|---------------------------------------|---------------------------------------|
//! | 200    | `{"success":true,"accepted":N}`       | every event committed                 |
//! | 400    | `{"error":"...","accepted":N}`        | event N invalid; first N committed    |
//! | 413    | `{"error":"..."}`                     | body larger than `max_payload_size`   |
//! | 500    | `{"error":"...","accepted":N}`        | log append failed at event N          |

mod error;
mod handlers;
mod metrics;
mod response;

#[cfg(test)]
mod http_test;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use pulse_config::ServerConfig;
use pulse_pipeline::Pipeline;
use pulse_store::AppendLog;
use pulse_tap::TapPoint;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use error::HttpSourceError;
pub use handlers::LogQuery;
pub use metrics::{HttpMetricsSnapshot, HttpSourceMetrics};
pub use response::{ErrorResponse, IngestResponse};

use handlers::{HandlerState, aggregates, collect, health_check, live, read_log};

/// HTTP source for telemetry ingestion
pub struct HttpSource {
    config: ServerConfig,
    state: Arc<HandlerState>,
    running: Arc<AtomicBool>,
}

impl HttpSource {
    /// Create a new HTTP source
    pub fn new(
        config: ServerConfig,
        log: Arc<dyn AppendLog>,
        tap: Arc<TapPoint>,
        pipeline: Arc<Pipeline>,
    ) -> Self {
        let state = Arc::new(HandlerState {
            log,
            tap,
            pipeline,
            metrics: Arc::new(HttpSourceMetrics::new()),
            max_payload_size: config.max_payload_size,
        });

        Self {
            config,
            state,
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a shared handle to the metrics
    pub fn metrics(&self) -> Arc<HttpSourceMetrics> {
        Arc::clone(&self.state.metrics)
    }

    /// Check if the source is running
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// The axum router serving every endpoint
    pub fn router(&self) -> Router {
        build_router(Arc::clone(&self.state))
    }

    /// Bind the configured address and serve until cancelled
    pub async fn run(self, cancel: CancellationToken) -> Result<(), HttpSourceError> {
        let bind_addr = self.config.bind_address();

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| HttpSourceError::Bind {
                address: bind_addr.clone(),
                source: e,
            })?;

        self.serve(listener, cancel).await
    }

    /// Serve on an already bound listener until cancelled
    pub async fn serve(
        self,
        listener: TcpListener,
        cancel: CancellationToken,
    ) -> Result<(), HttpSourceError> {
        let address = listener
            .local_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| self.config.bind_address());

        self.running.store(true, Ordering::Relaxed);
        tracing::info!(%address, "HTTP source listening");

        let app = self.router();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal(cancel))
            .await
            .map_err(|e| HttpSourceError::Http(e.to_string()));

        self.running.store(false, Ordering::Relaxed);
        tracing::info!(%address, "HTTP source stopped");

        result
    }
}

/// Build the axum router
fn build_router(state: Arc<HandlerState>) -> Router {
    let body_limit = state.max_payload_size;

    Router::new()
        .route("/v1/collect", post(collect))
        .route("/v1/live", get(live))
        .route("/v1/aggregates/{date}", get(aggregates))
        .route("/v1/log", get(read_log))
        .route("/health", get(health_check))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

/// Shutdown signal future
async fn shutdown_signal(cancel: CancellationToken) {
    cancel.cancelled().await;
}
