use std::sync::Arc;

use pulse_config::PipelineConfig;
use pulse_protocol::{Category, Event};
use pulse_store::{CategoryStore, MemoryAggregateStore, MemoryCategoryStore};
use serde_json::json;

use super::*;
use crate::anomaly::{DisabledDetector, FeatureWindow};

// 2024-03-01T00:00:00Z
const DAY_START: i64 = 1_709_251_200_000;

fn build(config: PipelineConfig) -> (Pipeline, Arc<MemoryCategoryStore>) {
    let categories = Arc::new(MemoryCategoryStore::new());
    let aggregates = Arc::new(MemoryAggregateStore::new());
    (Pipeline::new(categories.clone(), aggregates, &config), categories)
}

fn perf(ts: i64, cpu: f64) -> Event {
    Event::with_timestamp(ts, "performance", json!({"cpu": cpu, "memory": 200, "fps": 60}))
}

fn day() -> chrono::NaiveDate {
    pulse_protocol::utc_date(DAY_START).unwrap()
}

#[tokio::test]
async fn test_process_routes_and_aggregates() {
    let (pipeline, categories) = build(PipelineConfig::default());

    let outcome = pipeline.process(&perf(DAY_START, 40.0)).await.unwrap();
    assert_eq!(outcome.category, Some(Category::Performance));
    assert_eq!(
        outcome.bucket.unwrap().to_string(),
        "aggregated:performance:2024-03-01"
    );
    assert_eq!(outcome.verdict, None);

    pipeline
        .process(&Event::with_timestamp(DAY_START, "error", json!({"type": "TypeError"})))
        .await
        .unwrap();

    let snapshot = pipeline.snapshot(day()).await.unwrap();
    assert_eq!(snapshot.performance.total_requests, 1);
    assert_eq!(snapshot.performance.avg_cpu, Some(40.0));
    assert_eq!(snapshot.errors.by_type.get("TypeError"), Some(&1));
    assert_eq!(categories.performance_records(day()).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_numeric_identifiers_are_still_counted() {
    let (pipeline, _) = build(PipelineConfig::default());

    pipeline
        .process(&Event::with_timestamp(
            DAY_START,
            "behavior",
            json!({"sessionId": 7, "interactions": [{"kind": "click"}]}),
        ))
        .await
        .unwrap();
    pipeline
        .process(&Event::with_timestamp(DAY_START, "error", json!({"type": 404, "message": 1})))
        .await
        .unwrap();

    let snapshot = pipeline.snapshot(day()).await.unwrap();
    assert_eq!(snapshot.behavior.total_sessions, 1);
    assert_eq!(snapshot.behavior.total_interactions, 1);
    assert_eq!(snapshot.errors.total, 1);
    assert_eq!(snapshot.errors.by_type.get("404"), Some(&1));
    assert_eq!(pipeline.metrics().snapshot().invalid_payloads, 0);
}

#[tokio::test]
async fn test_uncategorized_event_touches_no_bucket() {
    let (pipeline, _) = build(PipelineConfig::default());

    let outcome = pipeline
        .process(&Event::with_timestamp(DAY_START, "page_view", json!({})))
        .await
        .unwrap();
    assert_eq!(outcome.category, None);
    assert_eq!(outcome.bucket, None);

    let metrics = pipeline.metrics().snapshot();
    assert_eq!(metrics.events_processed, 1);
    assert_eq!(metrics.uncategorized_events, 1);
}

#[tokio::test]
async fn test_invalid_payload_is_counted_and_not_aggregated() {
    let (pipeline, _) = build(PipelineConfig::default());

    let result = pipeline
        .process(&Event::with_timestamp(DAY_START, "performance", json!({"cpu": "high"})))
        .await;
    assert!(matches!(result, Err(PipelineError::InvalidPayload { .. })));

    assert_eq!(pipeline.metrics().snapshot().invalid_payloads, 1);
    let snapshot = pipeline.snapshot(day()).await.unwrap();
    assert_eq!(snapshot.performance.total_requests, 0);
}

#[tokio::test]
async fn test_window_is_assessed_once_full() {
    let config = PipelineConfig {
        anomaly_window: 3,
        ..PipelineConfig::default()
    };
    let (pipeline, _) = build(config);

    for i in 0..2 {
        let outcome = pipeline.process(&perf(DAY_START + i, 20.0)).await.unwrap();
        assert!(outcome.verdict.is_none());
    }

    let steady = pipeline.process(&perf(DAY_START + 2, 20.0)).await.unwrap();
    assert!(!steady.verdict.unwrap().anomalous);

    let spike = pipeline.process(&perf(DAY_START + 3, 100.0)).await.unwrap();
    let verdict = spike.verdict.unwrap();
    assert!(verdict.anomalous, "score {}", verdict.score);

    let metrics = pipeline.metrics().snapshot();
    assert_eq!(metrics.windows_assessed, 2);
    assert_eq!(metrics.anomalies_detected, 1);
}

#[tokio::test]
async fn test_detection_disabled() {
    let config = PipelineConfig {
        anomaly_detection: false,
        anomaly_window: 1,
        ..PipelineConfig::default()
    };
    let (pipeline, _) = build(config);
    assert!(!pipeline.anomaly_detection());

    let outcome = pipeline.process(&perf(DAY_START, 99.0)).await.unwrap();
    assert!(outcome.verdict.is_none());
    assert_eq!(pipeline.metrics().snapshot().windows_assessed, 0);
}

#[tokio::test]
async fn test_custom_detector() {
    struct AlwaysAnomalous;

    impl AnomalyDetector for AlwaysAnomalous {
        fn assess(&self, window: &FeatureWindow) -> Option<AnomalyVerdict> {
            Some(AnomalyVerdict {
                anomalous: true,
                score: window.len() as f64,
            })
        }
    }

    let config = PipelineConfig {
        anomaly_window: 1,
        ..PipelineConfig::default()
    };
    let (pipeline, _) = build(config);
    let pipeline = pipeline.with_detector(Arc::new(AlwaysAnomalous));

    let outcome = pipeline.process(&perf(DAY_START, 1.0)).await.unwrap();
    assert_eq!(
        outcome.verdict,
        Some(AnomalyVerdict {
            anomalous: true,
            score: 1.0
        })
    );

    let (pipeline, _) = build(PipelineConfig {
        anomaly_window: 1,
        ..PipelineConfig::default()
    });
    let pipeline = pipeline.with_detector(Arc::new(DisabledDetector));
    let outcome = pipeline.process(&perf(DAY_START, 1.0)).await.unwrap();
    assert!(outcome.verdict.is_none());
}
