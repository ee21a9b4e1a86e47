//! Volume anomaly detector.
//!
//! Groups returns by `(sku, store)` and flags groups whose return count
//! is a large multiple of the dataset-wide mean per group:
//!   - above `volume_anomaly_multiplier_medium × mean` → MEDIUM
//!   - above `volume_anomaly_multiplier_high × mean`   → HIGH
//!
//! The baseline is the plain mean, not a z-score.

use crate::{
    detector::{DetectionContext, Detector},
    error::FraudResult,
    finding::{classify, Evidence, FindingSubject, FraudType, SuspicionFinding},
    movement::{MovementRecord, MovementSnapshot},
    normalize::round2,
};
use std::collections::BTreeMap;

pub struct VolumeAnomalyDetector;

type GroupKey<'a> = (Option<&'a str>, Option<&'a str>);

impl Detector for VolumeAnomalyDetector {
    fn name(&self) -> &'static str {
        "volume_anomaly"
    }

    fn detect(
        &self,
        snapshot: &MovementSnapshot,
        ctx: &DetectionContext<'_>,
    ) -> FraudResult<Vec<SuspicionFinding>> {
        let mut findings = Vec::new();
        let returns = &snapshot.returns;
        if returns.is_empty() {
            log::info!("volume_anomaly: no returns to analyse");
            return Ok(findings);
        }

        // Every return counts toward the baseline, even with unknown keys.
        let mut groups: BTreeMap<GroupKey<'_>, Vec<&MovementRecord>> = BTreeMap::new();
        for record in returns {
            groups
                .entry((record.sku.as_deref(), record.store.as_deref()))
                .or_default()
                .push(record);
        }

        let mean = returns.len() as f64 / groups.len().max(1) as f64;
        let medium_above = mean * ctx.config.volume_anomaly_multiplier_medium;
        let high_above = mean * ctx.config.volume_anomaly_multiplier_high;

        for ((sku, store), records) in &groups {
            let total = records.len();
            let Some(risk) = classify(total as f64, medium_above, high_above) else {
                continue;
            };

            let subject = FindingSubject {
                sku: sku.map(str::to_string),
                store: store.map(str::to_string),
                actor: None,
            };
            let evidence = Evidence::VolumeAnomaly {
                total_returns: total,
                dataset_mean: round2(mean),
                percentage_above_mean: round2((total as f64 / mean - 1.0) * 100.0),
                returns: records.iter().map(|r| (*r).clone()).collect(),
            };

            match SuspicionFinding::new(
                FraudType::VolumeAnomaly,
                risk,
                subject,
                evidence,
                ctx.generated_at,
            ) {
                Some(finding) => findings.push(finding),
                None => log::debug!(
                    "volume_anomaly: {total} returns without sku or store, not reportable"
                ),
            }
        }

        log::info!(
            "volume_anomaly: {} returns across {} groups, mean {:.2}, {} flagged",
            returns.len(),
            groups.len(),
            mean,
            findings.len()
        );
        Ok(findings)
    }
}
