//! HTTP source tests

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures_util::StreamExt;
use pulse_config::{PipelineConfig, ServerConfig, TapConfig};
use pulse_pipeline::Pipeline;
use pulse_protocol::Event;
use pulse_store::{
    AppendLog, LogEntry, MemoryAggregateStore, MemoryCategoryStore, MemoryLog, StoreError,
};
use pulse_tap::TapPoint;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use super::handlers::HandlerState;
use super::*;

// 2024-03-01T00:00:00Z
const DAY_START: i64 = 1_709_251_200_000;

struct TestContext {
    state: Arc<HandlerState>,
    log: Arc<MemoryLog>,
}

fn test_state_with(max_payload_size: usize, tap_config: &TapConfig) -> TestContext {
    let log = Arc::new(MemoryLog::new());
    let pipeline = Pipeline::new(
        Arc::new(MemoryCategoryStore::new()),
        Arc::new(MemoryAggregateStore::new()),
        &PipelineConfig::default(),
    );

    let state = Arc::new(HandlerState {
        log: log.clone(),
        tap: Arc::new(TapPoint::new(tap_config)),
        pipeline: Arc::new(pipeline),
        metrics: Arc::new(HttpSourceMetrics::new()),
        max_payload_size,
    });

    TestContext { state, log }
}

fn test_state() -> TestContext {
    test_state_with(1024 * 1024, &TapConfig::default())
}

fn event(ts: i64, event_type: &str, payload: Value) -> Value {
    json!({"timestamp": ts, "type": event_type, "payload": payload})
}

async fn post_collect(state: &Arc<HandlerState>, body: impl Into<Body>) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/v1/collect")
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = build_router(Arc::clone(state)).oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn get_json(state: &Arc<HandlerState>, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();

    let response = build_router(Arc::clone(state)).oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

// =============================================================================
// Health
// =============================================================================

#[tokio::test]
async fn test_health_check() {
    let ctx = test_state();
    let (status, body) = get_json(&ctx.state, "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["last_position"], 0);
    assert_eq!(body["subscribers"], 0);
}

// =============================================================================
// Ingestion
// =============================================================================

#[tokio::test]
async fn test_collect_batch_in_order() {
    let ctx = test_state();
    let batch = json!([
        event(DAY_START, "page_view", json!({"path": "/a"})),
        event(DAY_START + 1, "page_view", json!({"path": "/b"})),
        event(DAY_START + 2, "page_view", json!({"path": "/c"})),
    ]);

    let (status, body) = post_collect(&ctx.state, batch.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "accepted": 3}));

    let entries = ctx.log.range(1, 3).await.unwrap();
    let paths: Vec<_> = entries
        .iter()
        .map(|e| e.event.payload()["path"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(paths, ["/a", "/b", "/c"]);
    assert_eq!(entries[2].position, 3);
}

#[tokio::test]
async fn test_collect_single_object() {
    let ctx = test_state();
    let body = event(DAY_START, "behavior", json!({"sessionId": "s"})).to_string();

    let (status, body) = post_collect(&ctx.state, body).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["accepted"], 1);
    assert_eq!(ctx.log.last_position().await.unwrap(), 1);
}

#[tokio::test]
async fn test_collect_empty_batch() {
    let ctx = test_state();
    let (status, body) = post_collect(&ctx.state, "[]").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"success": true, "accepted": 0}));
    assert!(ctx.log.is_empty());
}

#[tokio::test]
async fn test_collect_invalid_json() {
    let ctx = test_state();
    let (status, body) = post_collect(&ctx.state, "{not json").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid JSON"));
    assert_eq!(ctx.state.metrics.snapshot().requests_client_error, 1);
}

#[tokio::test]
async fn test_invalid_event_keeps_earlier_events() {
    let ctx = test_state();
    let batch = json!([
        event(DAY_START, "page_view", json!({})),
        {"timestamp": DAY_START, "payload": {}},
        event(DAY_START + 2, "page_view", json!({})),
    ]);

    let (status, body) = post_collect(&ctx.state, batch.to_string()).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["accepted"], 1);
    assert!(body["error"].as_str().unwrap().contains("event 1"));

    assert_eq!(ctx.log.last_position().await.unwrap(), 1);
    let metrics = ctx.state.metrics.snapshot();
    assert_eq!(metrics.events_accepted, 1);
    assert_eq!(metrics.events_rejected, 1);
}

#[tokio::test]
async fn test_collect_rejects_non_object_event() {
    let ctx = test_state();
    let (status, body) = post_collect(&ctx.state, "[42]").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["accepted"], 0);
}

#[tokio::test]
async fn test_payload_too_large() {
    let ctx = test_state_with(64, &TapConfig::default());
    let body = json!([event(DAY_START, "page_view", json!({"padding": "x".repeat(200)}))]);

    let (status, body) = post_collect(&ctx.state, body.to_string()).await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body["error"].as_str().unwrap().contains("64"));
    assert!(ctx.log.is_empty());
}

#[tokio::test]
async fn test_processing_failure_does_not_fail_request() {
    let ctx = test_state();
    let body = json!([event(DAY_START, "performance", json!({"cpu": "high"}))]);

    let (status, _) = post_collect(&ctx.state, body.to_string()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(ctx.log.last_position().await.unwrap(), 1);
    assert_eq!(ctx.state.metrics.snapshot().pipeline_errors, 1);
}

struct FailingLog;

#[async_trait]
impl AppendLog for FailingLog {
    async fn append(&self, _event: &Event) -> pulse_store::Result<u64> {
        Err(StoreError::io(
            "/data/events.jsonl",
            std::io::Error::other("disk full"),
        ))
    }

    async fn range(&self, _from: u64, _to: u64) -> pulse_store::Result<Vec<LogEntry>> {
        Ok(Vec::new())
    }

    async fn range_by_time(&self, _from: i64, _to: i64) -> pulse_store::Result<Vec<LogEntry>> {
        Ok(Vec::new())
    }

    async fn last_position(&self) -> pulse_store::Result<u64> {
        Ok(0)
    }
}

#[tokio::test]
async fn test_log_failure_is_server_error() {
    let ctx = test_state();
    let state = Arc::new(HandlerState {
        log: Arc::new(FailingLog),
        tap: Arc::clone(&ctx.state.tap),
        pipeline: Arc::clone(&ctx.state.pipeline),
        metrics: Arc::new(HttpSourceMetrics::new()),
        max_payload_size: 1024,
    });

    let body = json!([event(DAY_START, "error", json!({"message": "boom"}))]);
    let (status, body) = post_collect(&state, body.to_string()).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("disk full"));
    assert_eq!(body["accepted"], 0);
    assert_eq!(state.metrics.snapshot().requests_server_error, 1);

    // Nothing was committed, so nothing was aggregated
    let date = pulse_protocol::utc_date(DAY_START).unwrap();
    let snapshot = state.pipeline.snapshot(date).await.unwrap();
    assert_eq!(snapshot.errors.total, 0);
}

#[tokio::test]
async fn test_accepted_event_is_broadcast() {
    let ctx = test_state();
    let (_, mut frames) = ctx.state.tap.subscribe().unwrap();

    let body = json!([event(DAY_START, "page_view", json!({"path": "/live"}))]);
    post_collect(&ctx.state, body.to_string()).await;

    let frame = frames.try_recv().unwrap();
    let broadcast: Value = serde_json::from_str(&frame).unwrap();
    assert_eq!(broadcast["type"], "page_view");
    assert_eq!(broadcast["payload"]["path"], "/live");
}

// =============================================================================
// Reads
// =============================================================================

#[tokio::test]
async fn test_aggregates_after_ingest() {
    let ctx = test_state();
    let batch = json!([
        event(DAY_START, "performance", json!({"cpu": 20, "memory": 100})),
        event(DAY_START + 1, "performance", json!({"cpu": 40, "memory": 300})),
        event(DAY_START + 2, "error", json!({"type": "TypeError"})),
    ]);
    post_collect(&ctx.state, batch.to_string()).await;

    let (status, body) = get_json(&ctx.state, "/v1/aggregates/2024-03-01").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["performance"]["total_requests"], 2);
    assert_eq!(body["performance"]["avg_cpu"], 30.0);
    assert_eq!(body["errors"]["by_type"]["TypeError"], 1);
    assert_eq!(body["behavior"]["avg_interactions_per_session"], Value::Null);
}

#[tokio::test]
async fn test_aggregates_bad_date() {
    let ctx = test_state();
    let (status, body) = get_json(&ctx.state, "/v1/aggregates/03-01-2024").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().starts_with("invalid date"));
}

#[tokio::test]
async fn test_read_log_by_position_and_time() {
    let ctx = test_state();
    let batch = json!([
        event(DAY_START, "a", json!({})),
        event(DAY_START + 1000, "b", json!({})),
        event(DAY_START + 2000, "c", json!({})),
    ]);
    post_collect(&ctx.state, batch.to_string()).await;

    let (status, body) = get_json(&ctx.state, "/v1/log?from=2").await;
    assert_eq!(status, StatusCode::OK);
    let positions: Vec<_> = body.as_array().unwrap().iter().map(|e| e["position"].clone()).collect();
    assert_eq!(positions, [json!(2), json!(3)]);

    let uri = format!("/v1/log?since={}&until={}", DAY_START + 500, DAY_START + 1500);
    let (_, body) = get_json(&ctx.state, &uri).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["event"]["type"], "b");

    let (status, _) = get_json(&ctx.state, "/v1/log?from=abc").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_read_log_is_paged_by_limit() {
    let ctx = test_state();
    let batch: Vec<Value> = (0..5)
        .map(|i| event(DAY_START + i * 1000, "page_view", json!({})))
        .collect();
    post_collect(&ctx.state, Value::Array(batch).to_string()).await;

    let (status, body) = get_json(&ctx.state, "/v1/log?limit=2").await;
    assert_eq!(status, StatusCode::OK);
    let positions: Vec<_> = body.as_array().unwrap().iter().map(|e| e["position"].clone()).collect();
    assert_eq!(positions, [json!(1), json!(2)]);

    let (_, body) = get_json(&ctx.state, "/v1/log?from=4&limit=10").await;
    assert_eq!(body.as_array().unwrap().len(), 2);

    let uri = format!("/v1/log?since={DAY_START}&limit=3");
    let (_, body) = get_json(&ctx.state, &uri).await;
    assert_eq!(body.as_array().unwrap().len(), 3);
    assert_eq!(body[2]["position"], 3);

    // Zero is raised to a single entry
    let (_, body) = get_json(&ctx.state, "/v1/log?limit=0").await;
    assert_eq!(body.as_array().unwrap().len(), 1);
}

// =============================================================================
// Live feed over a real socket
// =============================================================================

async fn spawn_server(ctx: &TestContext) -> (String, CancellationToken) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let cancel = CancellationToken::new();

    let source = HttpSource {
        config: ServerConfig::default(),
        state: Arc::clone(&ctx.state),
        running: Default::default(),
    };
    let token = cancel.clone();
    tokio::spawn(async move { source.serve(listener, token).await });

    (address, cancel)
}

#[tokio::test]
async fn test_live_feed_streams_accepted_events() {
    let ctx = test_state();
    let (address, cancel) = spawn_server(&ctx).await;

    let (mut socket, _) = tokio_tungstenite::connect_async(format!("ws://{address}/v1/live"))
        .await
        .unwrap();
    assert_eq!(ctx.state.tap.subscriber_count(), 1);

    let body = json!([
        event(DAY_START, "page_view", json!({"n": 1})),
        event(DAY_START + 1, "page_view", json!({"n": 2})),
    ]);
    let response = reqwest::Client::new()
        .post(format!("http://{address}/v1/collect"))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    for expected in [1, 2] {
        let message = tokio::time::timeout(Duration::from_secs(5), socket.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        let frame: Value = serde_json::from_str(message.to_text().unwrap()).unwrap();
        assert_eq!(frame["payload"]["n"], expected);
    }

    cancel.cancel();
}

#[tokio::test]
async fn test_live_feed_refused_when_full() {
    let tap_config = TapConfig {
        max_subscribers: 1,
        ..TapConfig::default()
    };
    let ctx = test_state_with(1024, &tap_config);
    let _held = ctx.state.tap.subscribe().unwrap();
    let (address, cancel) = spawn_server(&ctx).await;

    let err = tokio_tungstenite::connect_async(format!("ws://{address}/v1/live"))
        .await
        .unwrap_err();
    match err {
        tokio_tungstenite::tungstenite::Error::Http(response) => {
            assert_eq!(response.status().as_u16(), 503);
        }
        other => panic!("expected HTTP error, got {other:?}"),
    }

    cancel.cancel();
}
