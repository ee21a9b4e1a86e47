//! Fraud-detection engine for retail movement history.
//!
//! Returns, cancellations and stock adjustments are fetched once per run
//! from a [`store::MovementStore`], scanned by the registered detectors,
//! and merged into a single [`report::AnalysisReport`].

pub mod config;
pub mod cross_category_detector;
pub mod detector;
pub mod engine;
pub mod error;
pub mod finding;
pub mod movement;
pub mod normalize;
pub mod rate_threshold_detector;
pub mod recidivism_detector;
pub mod report;
pub mod short_interval_detector;
pub mod store;
pub mod types;
pub mod volume_anomaly_detector;
