//! Detector trait and the default registry.
//!
//! RULE: Every detector implements Detector.
//! Detectors are stateless: they read the shared snapshot and the
//! configuration, and return findings. They never touch a store,
//! never mutate shared state, and never depend on another detector.
//! Execution order is fixed and documented in [`default_detectors`].

use crate::{
    config::EngineConfig,
    cross_category_detector::CrossCategoryDetector,
    error::FraudResult,
    finding::SuspicionFinding,
    movement::MovementSnapshot,
    rate_threshold_detector::RateThresholdDetector,
    recidivism_detector::RecidivismDetector,
    short_interval_detector::ShortIntervalDetector,
    volume_anomaly_detector::VolumeAnomalyDetector,
};
use chrono::{DateTime, Utc};

/// Per-run inputs every detector receives alongside the snapshot.
#[derive(Debug, Clone, Copy)]
pub struct DetectionContext<'a> {
    pub config: &'a EngineConfig,
    /// Stamped on every finding produced in this run.
    pub generated_at: DateTime<Utc>,
}

/// The contract every detector must fulfill.
pub trait Detector: Send + Sync {
    /// Unique stable name for this detector.
    fn name(&self) -> &'static str;

    /// Scan the snapshot. Findings are returned in the detector's own
    /// deterministic order.
    fn detect(
        &self,
        snapshot: &MovementSnapshot,
        ctx: &DetectionContext<'_>,
    ) -> FraudResult<Vec<SuspicionFinding>>;
}

/// The five built-in detectors.
///
/// EXECUTION ORDER: fixed, documented, never reordered. Report findings
/// follow this order.
///   1. volume_anomaly
///   2. cross_category_coincidence
///   3. rate_threshold
///   4. short_interval_sequence
///   5. recidivism
pub fn default_detectors() -> Vec<Box<dyn Detector>> {
    vec![
        Box::new(VolumeAnomalyDetector),
        Box::new(CrossCategoryDetector),
        Box::new(RateThresholdDetector),
        Box::new(ShortIntervalDetector),
        Box::new(RecidivismDetector),
    ]
}
