//! Pipeline configuration

use serde::Deserialize;

/// Category routing and anomaly feature configuration
///
/// ```toml
/// [pipeline]
/// anomaly_detection = false
/// anomaly_window = 10
/// anomaly_threshold = 0.1
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Build feature windows and consult the anomaly detector
    /// Default: true
    pub anomaly_detection: bool,

    /// Performance samples per feature vector
    /// Default: 10
    pub anomaly_window: usize,

    /// Score above which a vector is reported anomalous
    /// Default: 0.1
    pub anomaly_threshold: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            anomaly_detection: true,
            anomaly_window: 10,
            anomaly_threshold: 0.1,
        }
    }
}
