use pulse_protocol::PerformanceSample;
use serde_json::json;

use super::*;

fn sample(payload: serde_json::Value) -> PerformanceSample {
    PerformanceSample::from_payload(&payload).unwrap()
}

#[test]
fn test_features_are_normalized() {
    let features = features(&sample(json!({
        "cpu": 50, "memory": 250, "network": {"latency": 100}, "fps": 30
    })));
    assert_eq!(features, [0.5, 0.25, 0.1, 0.5]);
}

#[test]
fn test_missing_optional_features_are_zero() {
    let features = features(&sample(json!({"cpu": 100, "memory": 1000, "network": {}})));
    assert_eq!(features, [1.0, 1.0, 0.0, 0.0]);
}

#[test]
fn test_window_yields_only_when_full() {
    let buffer = WindowBuffer::new(3);
    assert!(buffer.push([0.1; 4]).is_none());
    assert!(buffer.push([0.2; 4]).is_none());

    let window = buffer.push([0.3; 4]).unwrap();
    assert_eq!(window.len(), 3);
    assert_eq!(window.flatten().len(), 3 * FEATURES_PER_SAMPLE);
    assert_eq!(window.latest(), Some(&[0.3; 4]));
}

#[test]
fn test_window_slides() {
    let buffer = WindowBuffer::new(2);
    buffer.push([1.0; 4]);
    buffer.push([2.0; 4]);
    let window = buffer.push([3.0; 4]).unwrap();

    assert_eq!(buffer.len(), 2);
    assert_eq!(&window.flatten()[..4], &[2.0; 4]);
    assert_eq!(window.latest(), Some(&[3.0; 4]));
}

#[test]
fn test_zero_capacity_is_clamped() {
    let buffer = WindowBuffer::new(0);
    assert_eq!(buffer.capacity(), 1);
    assert!(buffer.push([0.0; 4]).is_some());
}

#[test]
fn test_default_window_flattens_to_forty_values() {
    let buffer = WindowBuffer::new(DEFAULT_WINDOW);
    let mut last = None;
    for _ in 0..DEFAULT_WINDOW {
        last = buffer.push([0.5; 4]);
    }
    assert_eq!(last.unwrap().flatten().len(), 40);
}

#[test]
fn test_score_is_mean_absolute_difference() {
    let score = score(&[0.5, 0.5, 0.0, 1.0], &[0.1, 0.5, 0.2, 1.0]);
    assert!((score - 0.15).abs() < 1e-9);
}

#[test]
fn test_disabled_detector_never_assesses() {
    let buffer = WindowBuffer::new(1);
    let window = buffer.push([9.0; 4]).unwrap();
    assert_eq!(DisabledDetector.assess(&window), None);
}

#[test]
fn test_prediction_detector_flags_outlier() {
    let detector = PredictionDetector::new(window_mean, DEFAULT_THRESHOLD);
    let buffer = WindowBuffer::new(4);
    for _ in 0..3 {
        buffer.push([0.2, 0.2, 0.0, 1.0]);
    }

    let window = buffer.push([0.95, 0.9, 0.0, 0.2]).unwrap();
    let verdict = detector.assess(&window).unwrap();
    assert!(verdict.anomalous);
    assert!(verdict.score > DEFAULT_THRESHOLD);
}

#[test]
fn test_prediction_detector_accepts_steady_load() {
    let detector = PredictionDetector::new(|_: &[f64]| [0.2, 0.2, 0.0, 1.0], DEFAULT_THRESHOLD);
    let buffer = WindowBuffer::new(2);
    buffer.push([0.2, 0.2, 0.0, 1.0]);

    let verdict = detector.assess(&buffer.push([0.21, 0.2, 0.0, 1.0]).unwrap()).unwrap();
    assert!(!verdict.anomalous);
    assert!(verdict.score < 0.01);
}

#[test]
fn test_window_mean() {
    let mean = window_mean(&[0.0, 1.0, 2.0, 3.0, 2.0, 3.0, 4.0, 5.0]);
    assert_eq!(mean, [1.0, 2.0, 3.0, 4.0]);
    assert_eq!(window_mean(&[]), [0.0; 4]);
}
