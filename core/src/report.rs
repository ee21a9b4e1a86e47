//! Analysis report: the engine's only output.
//!
//! Built once per run from the detectors' findings and handed to the
//! presentation layer as plain, serializable data.

use crate::{
    config::EngineConfig,
    finding::{FraudType, RiskLevel, SuspicionFinding},
    movement::MovementSnapshot,
    normalize::round2,
    types::RunId,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

pub const NO_FINDINGS_RECOMMENDATION: &str =
    "No fraud indicators detected. Operations look normal.";

pub const HIGH_RISK_RECOMMENDATION: &str =
    "HIGH risk findings present: immediate investigation recommended.";

/// Canned follow-up for each fraud type. Repeat customers and repeat
/// products share one recommendation.
pub fn recommendation_for(fraud_type: FraudType) -> &'static str {
    match fraud_type {
        FraudType::VolumeAnomaly => {
            "Review stock control for products with unbalanced return volume."
        }
        FraudType::CrossCategoryCoincidence => {
            "Cross-validate stock adjustments against returns before approval."
        }
        FraudType::ExchangeRate => "Investigate stores with anomalous exchange rates.",
        FraudType::CancellationRate => "Audit cancellation approvals at flagged stores.",
        FraudType::ShortIntervalSequence => {
            "Enforce a cooldown between movements of the same product at the same store."
        }
        FraudType::RepeatCustomer | FraudType::RepeatProduct => {
            "Review policies for customers and products with a history of problems."
        }
    }
}

/// Recommendations derived from which fraud types are present.
pub fn recommendations(findings: &[SuspicionFinding]) -> Vec<String> {
    if findings.is_empty() {
        return vec![NO_FINDINGS_RECOMMENDATION.to_string()];
    }

    let mut out = Vec::new();
    if findings.iter().any(|f| f.risk_level == RiskLevel::High) {
        out.push(HIGH_RISK_RECOMMENDATION.to_string());
    }
    let present: BTreeSet<FraudType> = findings.iter().map(|f| f.fraud_type).collect();
    let mut canned: Vec<&str> = present.into_iter().map(recommendation_for).collect();
    canned.dedup();
    out.extend(canned.into_iter().map(str::to_string));
    out
}

/// How one detector's invocation ended.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DetectorOutcome {
    Completed { findings: usize },
    /// The detector errored or panicked; it contributed zero findings.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectorRun {
    pub detector: String,
    pub outcome: DetectorOutcome,
    pub duration_seconds: f64,
}

impl DetectorRun {
    pub fn failed(&self) -> bool {
        matches!(self.outcome, DetectorOutcome::Failed { .. })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RecordCounts {
    pub returns: usize,
    pub cancellations: usize,
    pub stock_adjustments: usize,
}

impl From<&MovementSnapshot> for RecordCounts {
    fn from(snapshot: &MovementSnapshot) -> Self {
        Self {
            returns: snapshot.returns.len(),
            cancellations: snapshot.cancellations.len(),
            stock_adjustments: snapshot.stock_adjustments.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub total_findings: usize,
    pub high_risk: usize,
    pub medium_risk: usize,
    pub percentage_high_risk: f64,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub run_id: RunId,
    pub started_at: DateTime<Utc>,
    pub duration_seconds: f64,
    /// Detector execution order, then each detector's own order.
    pub findings: Vec<SuspicionFinding>,
    pub count_by_type: BTreeMap<FraudType, usize>,
    pub count_by_risk: BTreeMap<RiskLevel, usize>,
    pub summary: ReportSummary,
    pub detector_runs: Vec<DetectorRun>,
    pub record_counts: RecordCounts,
    pub config: EngineConfig,
}

impl AnalysisReport {
    pub fn assemble(
        run_id: RunId,
        started_at: DateTime<Utc>,
        duration_seconds: f64,
        findings: Vec<SuspicionFinding>,
        detector_runs: Vec<DetectorRun>,
        record_counts: RecordCounts,
        config: EngineConfig,
    ) -> Self {
        let mut count_by_type: BTreeMap<FraudType, usize> = BTreeMap::new();
        let mut count_by_risk: BTreeMap<RiskLevel, usize> = BTreeMap::new();
        for finding in &findings {
            *count_by_type.entry(finding.fraud_type).or_default() += 1;
            *count_by_risk.entry(finding.risk_level).or_default() += 1;
        }

        let total = findings.len();
        let high_risk = count_by_risk.get(&RiskLevel::High).copied().unwrap_or(0);
        let medium_risk = count_by_risk.get(&RiskLevel::Medium).copied().unwrap_or(0);
        let summary = ReportSummary {
            total_findings: total,
            high_risk,
            medium_risk,
            percentage_high_risk: round2(high_risk as f64 / total.max(1) as f64 * 100.0),
            recommendations: recommendations(&findings),
        };

        Self {
            run_id,
            started_at,
            duration_seconds,
            findings,
            count_by_type,
            count_by_risk,
            summary,
            detector_runs,
            record_counts,
            config,
        }
    }

    /// Names of detectors that failed during this run.
    pub fn failed_detectors(&self) -> Vec<&str> {
        self.detector_runs
            .iter()
            .filter(|r| r.failed())
            .map(|r| r.detector.as_str())
            .collect()
    }

    pub fn findings_of(&self, fraud_type: FraudType) -> impl Iterator<Item = &SuspicionFinding> {
        self.findings.iter().filter(move |f| f.fraud_type == fraud_type)
    }

    pub fn to_json_pretty(&self) -> crate::error::FraudResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
