//! Anomaly feature windows
//!
//! Performance samples are normalized into four features and kept in a
//! sliding window. Once the window is full, its flattened contents are handed
//! to an [`AnomalyDetector`]. Detection models plug in behind that trait; the
//! pipeline only maintains the window and counts what the detector flags.
//!
//! Normalization:
//!
//! | feature | source              | scale  |
//! |---------|---------------------|--------|
//! | cpu     | `cpu`               | / 100  |
//! | memory  | `memory`            | / 1000 |
//! | latency | `network.latency`   | / 1000 |
//! | fps     | `fps`               | / 60   |
//!
//! Absent optional features contribute `0.0`.

use std::collections::VecDeque;

use parking_lot::Mutex;
use pulse_protocol::PerformanceSample;
use serde::Serialize;

/// Features extracted from each sample
pub const FEATURES_PER_SAMPLE: usize = 4;

/// Default number of samples in a window
pub const DEFAULT_WINDOW: usize = 10;

/// Default score above which a sample is anomalous
pub const DEFAULT_THRESHOLD: f64 = 0.1;

/// Normalized features of one performance sample
pub type Features = [f64; FEATURES_PER_SAMPLE];

/// Normalize a sample into `[cpu, memory, latency, fps]`
pub fn features(sample: &PerformanceSample) -> Features {
    [
        sample.cpu / 100.0,
        sample.memory / 1000.0,
        sample.latency().unwrap_or(0.0) / 1000.0,
        sample.fps.unwrap_or(0.0) / 60.0,
    ]
}

/// A full window, oldest sample first
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureWindow {
    samples: Vec<Features>,
}

impl FeatureWindow {
    /// Number of samples in the window
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Features of the newest sample
    pub fn latest(&self) -> Option<&Features> {
        self.samples.last()
    }

    /// Window flattened into `len() * FEATURES_PER_SAMPLE` values
    pub fn flatten(&self) -> Vec<f64> {
        self.samples.iter().flatten().copied().collect()
    }
}

/// Sliding window of recent performance features
#[derive(Debug)]
pub struct WindowBuffer {
    capacity: usize,
    samples: Mutex<VecDeque<Features>>,
}

impl WindowBuffer {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            samples: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.samples.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.lock().is_empty()
    }

    /// Push a sample, evicting the oldest when full
    ///
    /// Returns the window once it holds `capacity` samples.
    pub fn push(&self, features: Features) -> Option<FeatureWindow> {
        let mut samples = self.samples.lock();
        if samples.len() == self.capacity {
            samples.pop_front();
        }
        samples.push_back(features);

        (samples.len() == self.capacity).then(|| FeatureWindow {
            samples: samples.iter().copied().collect(),
        })
    }
}

/// Outcome of assessing one window
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AnomalyVerdict {
    pub anomalous: bool,
    pub score: f64,
}

/// Assesses full feature windows
pub trait AnomalyDetector: Send + Sync {
    fn assess(&self, window: &FeatureWindow) -> Option<AnomalyVerdict>;
}

/// Detector that never flags anything
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledDetector;

impl AnomalyDetector for DisabledDetector {
    fn assess(&self, _window: &FeatureWindow) -> Option<AnomalyVerdict> {
        None
    }
}

/// Predicts the newest sample's features from the full window
pub trait Predictor: Send + Sync {
    fn predict(&self, window: &[f64]) -> Features;
}

impl<F> Predictor for F
where
    F: Fn(&[f64]) -> Features + Send + Sync,
{
    fn predict(&self, window: &[f64]) -> Features {
        self(window)
    }
}

/// Flags samples whose features stray from a prediction
///
/// The score is the mean absolute difference between predicted and observed
/// features of the newest sample. Scores above the threshold are anomalous.
pub struct PredictionDetector<P> {
    predictor: P,
    threshold: f64,
}

impl<P: Predictor> PredictionDetector<P> {
    pub fn new(predictor: P, threshold: f64) -> Self {
        Self { predictor, threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

impl<P: Predictor> AnomalyDetector for PredictionDetector<P> {
    fn assess(&self, window: &FeatureWindow) -> Option<AnomalyVerdict> {
        let observed = window.latest()?;
        let predicted = self.predictor.predict(&window.flatten());
        let score = score(&predicted, observed);

        Some(AnomalyVerdict {
            anomalous: score > self.threshold,
            score,
        })
    }
}

/// Mean absolute difference between two feature sets
pub fn score(predicted: &Features, observed: &Features) -> f64 {
    let total: f64 = predicted
        .iter()
        .zip(observed)
        .map(|(p, o)| (p - o).abs())
        .sum();
    total / FEATURES_PER_SAMPLE as f64
}

/// Predictor that expects the window mean
pub fn window_mean(window: &[f64]) -> Features {
    let mut sums = [0.0; FEATURES_PER_SAMPLE];
    let mut rows = 0usize;
    for row in window.chunks_exact(FEATURES_PER_SAMPLE) {
        for (sum, value) in sums.iter_mut().zip(row) {
            *sum += value;
        }
        rows += 1;
    }
    if rows > 0 {
        for sum in &mut sums {
            *sum /= rows as f64;
        }
    }
    sums
}

#[cfg(test)]
#[path = "anomaly_test.rs"]
mod tests;
