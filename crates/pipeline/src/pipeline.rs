//! Per-event processing: route, aggregate, then consult the anomaly detector

use std::sync::Arc;

use chrono::NaiveDate;
use pulse_config::PipelineConfig;
use pulse_protocol::{Category, Event};
use pulse_store::{AggregateStore, BucketKey, CategoryStore};
use tracing::{debug, warn};

use crate::aggregator::{Aggregator, Snapshot};
use crate::anomaly::{self, AnomalyDetector, AnomalyVerdict, PredictionDetector, WindowBuffer};
use crate::error::{PipelineError, Result};
use crate::metrics::PipelineMetrics;
use crate::router::{CategoryRouter, Routed};

/// What processing one event did
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessOutcome {
    /// `None` for uncategorized events
    pub category: Option<Category>,
    /// Aggregate bucket the event contributed to
    pub bucket: Option<BucketKey>,
    /// Present when a full feature window was assessed
    pub verdict: Option<AnomalyVerdict>,
}

struct AnomalyStage {
    window: WindowBuffer,
    detector: Arc<dyn AnomalyDetector>,
}

/// Category routing, aggregation and anomaly consultation for stored events
pub struct Pipeline {
    router: CategoryRouter,
    aggregator: Aggregator,
    anomaly: Option<AnomalyStage>,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    /// Build a pipeline over the given stores
    ///
    /// With anomaly detection enabled, windows are assessed against their
    /// own mean using the configured threshold until a detector is supplied
    /// through [`Pipeline::with_detector`].
    pub fn new(
        category_store: Arc<dyn CategoryStore>,
        aggregate_store: Arc<dyn AggregateStore>,
        config: &PipelineConfig,
    ) -> Self {
        let anomaly = config.anomaly_detection.then(|| AnomalyStage {
            window: WindowBuffer::new(config.anomaly_window),
            detector: Arc::new(PredictionDetector::new(
                anomaly::window_mean,
                config.anomaly_threshold,
            )),
        });

        Self {
            router: CategoryRouter::new(category_store),
            aggregator: Aggregator::new(aggregate_store),
            anomaly,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Replace the anomaly detector; no effect when detection is disabled
    pub fn with_detector(mut self, detector: Arc<dyn AnomalyDetector>) -> Self {
        if let Some(stage) = self.anomaly.as_mut() {
            stage.detector = detector;
        }
        self
    }

    /// Process one event that is already in the log of record
    pub async fn process(&self, event: &Event) -> Result<ProcessOutcome> {
        self.metrics.record_processed();

        let routed = match self.router.route(event).await {
            Ok(routed) => routed,
            Err(e) => {
                self.record_failure(&e);
                return Err(e);
            }
        };
        let category = routed.category();
        self.metrics.record_routed(category);

        let bucket = match self.aggregate(event, &routed).await {
            Ok(bucket) => bucket,
            Err(e) => {
                self.record_failure(&e);
                return Err(e);
            }
        };

        let verdict = match &routed {
            Routed::Performance(sample) => self.assess(anomaly::features(sample), event),
            _ => None,
        };

        Ok(ProcessOutcome {
            category,
            bucket,
            verdict,
        })
    }

    /// Aggregated summary for one UTC day
    pub async fn snapshot(&self, date: NaiveDate) -> Result<Snapshot> {
        self.aggregator.snapshot(date).await
    }

    pub fn metrics(&self) -> &Arc<PipelineMetrics> {
        &self.metrics
    }

    pub fn anomaly_detection(&self) -> bool {
        self.anomaly.is_some()
    }

    pub fn category_store(&self) -> &Arc<dyn CategoryStore> {
        self.router.store()
    }

    pub fn aggregate_store(&self) -> &Arc<dyn AggregateStore> {
        self.aggregator.store()
    }

    async fn aggregate(&self, event: &Event, routed: &Routed) -> Result<Option<BucketKey>> {
        if matches!(routed, Routed::Uncategorized) {
            return Ok(None);
        }
        let date = event
            .date()
            .ok_or(PipelineError::TimestampOutOfRange(event.timestamp()))?;
        self.aggregator.aggregate(routed, date).await
    }

    fn assess(&self, features: anomaly::Features, event: &Event) -> Option<AnomalyVerdict> {
        let stage = self.anomaly.as_ref()?;
        let window = stage.window.push(features)?;
        let verdict = stage.detector.assess(&window)?;

        self.metrics.record_assessment(verdict.anomalous);
        if verdict.anomalous {
            warn!(
                timestamp = event.timestamp(),
                score = verdict.score,
                "performance anomaly detected"
            );
        } else {
            debug!(score = verdict.score, "performance window assessed");
        }

        Some(verdict)
    }

    fn record_failure(&self, error: &PipelineError) {
        match error {
            PipelineError::Store(_) => self.metrics.record_store_error(),
            _ => self.metrics.record_invalid_payload(),
        }
    }
}

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;
