//! HTTP route handlers
//!
//! # Endpoints
//!
//! - `POST /v1/collect` - Ingest one event or an array of events (JSON)
//! - `GET /v1/live` - WebSocket feed of accepted events
//! - `GET /v1/aggregates/{date}` - Daily aggregate snapshot
//! - `GET /v1/log` - Read committed log entries, at most `limit` per request
//! - `GET /health` - Health check

use std::sync::Arc;

use axum::Json;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use pulse_pipeline::Pipeline;
use pulse_protocol::Event;
use pulse_store::AppendLog;
use pulse_tap::TapPoint;
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, error, warn};

use super::error::HttpSourceError;
use super::metrics::HttpSourceMetrics;
use super::response::{error_response, ingested};

/// Shared state for handlers
pub struct HandlerState {
    pub log: Arc<dyn AppendLog>,
    pub tap: Arc<TapPoint>,
    pub pipeline: Arc<Pipeline>,
    pub metrics: Arc<HttpSourceMetrics>,
    pub max_payload_size: usize,
}

/// POST /v1/collect - Ingest telemetry events
///
/// Events are committed in request order. The first invalid event stops the
/// request with 400; events before it stay committed and their count is
/// reported as `accepted`.
pub async fn collect(
    State(state): State<Arc<HandlerState>>,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            state.metrics.request_received(0);
            state.metrics.request_client_error();
            let err = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                HttpSourceError::PayloadTooLarge {
                    limit: state.max_payload_size,
                }
            } else {
                HttpSourceError::Body(rejection.body_text())
            };
            return error_response(&err, None);
        }
    };

    state.metrics.request_received(body.len());

    if body.len() > state.max_payload_size {
        state.metrics.request_client_error();
        let err = HttpSourceError::PayloadTooLarge {
            limit: state.max_payload_size,
        };
        return error_response(&err, None);
    }

    let values = match parse_body(&body) {
        Ok(values) => values,
        Err(e) => {
            state.metrics.request_client_error();
            return error_response(&e, None);
        }
    };

    let mut accepted = 0;
    for (index, value) in values.into_iter().enumerate() {
        if let Err(e) = ingest_one(&state, index, value).await {
            let server_error = e.status().is_server_error();
            state.metrics.request_failed(server_error);
            if server_error {
                error!(index, accepted, error = %e, "ingestion failed");
            } else {
                debug!(index, accepted, error = %e, "rejected event");
            }
            return error_response(&e, Some(accepted));
        }
        accepted += 1;
    }

    state.metrics.request_success();
    ingested(accepted)
}

/// A JSON array is a batch; anything else is a single event
fn parse_body(body: &[u8]) -> Result<Vec<Value>, HttpSourceError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| HttpSourceError::InvalidJson(e.to_string()))?;

    Ok(match value {
        Value::Array(items) => items,
        other => vec![other],
    })
}

/// Validate, commit, broadcast, then process one event
async fn ingest_one(
    state: &HandlerState,
    index: usize,
    value: Value,
) -> Result<(), HttpSourceError> {
    let event = Event::from_value(value).map_err(|source| {
        state.metrics.event_rejected();
        HttpSourceError::Validation { index, source }
    })?;

    let position = state.log.append(&event).await?;
    state.metrics.event_accepted();

    state.tap.broadcast(&event);

    // The event is already in the log of record; processing failures are not
    // reported to the producer
    if let Err(e) = state.pipeline.process(&event).await {
        state.metrics.pipeline_error();
        warn!(
            position,
            event_type = event.event_type(),
            error = %e,
            "committed event was not processed"
        );
    }

    Ok(())
}

/// GET /v1/live - Upgrade to the live event feed
pub async fn live(State(state): State<Arc<HandlerState>>, ws: WebSocketUpgrade) -> Response {
    pulse_tap::ws::upgrade(ws, Arc::clone(&state.tap))
}

/// GET /v1/aggregates/{date} - Aggregate snapshot for a UTC day (`YYYY-MM-DD`)
pub async fn aggregates(
    State(state): State<Arc<HandlerState>>,
    Path(date): Path<String>,
) -> Response {
    let date = match NaiveDate::parse_from_str(&date, "%Y-%m-%d") {
        Ok(date) => date,
        Err(e) => {
            let err = HttpSourceError::invalid_parameter("date", format!("{date:?}: {e}"));
            return error_response(&err, None);
        }
    };

    match state.pipeline.snapshot(date).await {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(e) => {
            let err = HttpSourceError::from(e);
            error!(%date, error = %err, "snapshot read failed");
            error_response(&err, None)
        }
    }
}

/// Entries returned by one log read when `limit` is not given
pub const DEFAULT_LOG_LIMIT: usize = 1000;

/// Upper bound on `limit`
pub const MAX_LOG_LIMIT: usize = 10_000;

/// Log read window; positions by default, event time when `since` or `until` is set
#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub since: Option<i64>,
    pub until: Option<i64>,
    /// Page size, clamped to `1..=MAX_LOG_LIMIT`
    pub limit: Option<usize>,
}

impl LogQuery {
    fn limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_LOG_LIMIT)
            .clamp(1, MAX_LOG_LIMIT)
    }
}

/// GET /v1/log - Committed entries in log order
pub async fn read_log(
    State(state): State<Arc<HandlerState>>,
    query: Result<Query<LogQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(query) => query,
        Err(rejection) => {
            let err = HttpSourceError::invalid_parameter("query", rejection.body_text());
            return error_response(&err, None);
        }
    };

    let limit = query.limit();
    let entries = if query.since.is_some() || query.until.is_some() {
        state
            .log
            .range_by_time_limited(
                query.since.unwrap_or(i64::MIN),
                query.until.unwrap_or(i64::MAX),
                limit,
            )
            .await
    } else {
        // Positions are dense, so the window bounds the page
        let from = query.from.unwrap_or(1);
        let to = query
            .to
            .unwrap_or(u64::MAX)
            .min(from.saturating_add(limit as u64 - 1));
        state.log.range(from, to).await
    };

    match entries {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(e) => error_response(&HttpSourceError::from(e), None),
    }
}

/// GET /health - Health check endpoint
pub async fn health_check(State(state): State<Arc<HandlerState>>) -> impl IntoResponse {
    let last_position = state.log.last_position().await.ok();
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "last_position": last_position,
            "subscribers": state.tap.subscriber_count(),
        })),
    )
}
