//! Cross-category coincidence detector.
//!
//! A SKU that shows up both in stock adjustments and in returns, with the
//! two events close in time, suggests a return being papered over with an
//! inventory correction. Every close (adjustment, return) pair is its own
//! HIGH finding: pairs are not merged per SKU.

use crate::{
    detector::{DetectionContext, Detector},
    error::FraudResult,
    finding::{Evidence, FindingSubject, FraudType, RiskLevel, SuspicionFinding},
    movement::{MovementRecord, MovementSnapshot},
    normalize::{round2, within_window},
};
use std::collections::BTreeMap;

pub struct CrossCategoryDetector;

fn by_sku(records: &[MovementRecord]) -> BTreeMap<&str, Vec<&MovementRecord>> {
    let mut map: BTreeMap<&str, Vec<&MovementRecord>> = BTreeMap::new();
    for record in records {
        if let Some(sku) = record.sku.as_deref() {
            map.entry(sku).or_default().push(record);
        }
    }
    map
}

impl Detector for CrossCategoryDetector {
    fn name(&self) -> &'static str {
        "cross_category_coincidence"
    }

    fn detect(
        &self,
        snapshot: &MovementSnapshot,
        ctx: &DetectionContext<'_>,
    ) -> FraudResult<Vec<SuspicionFinding>> {
        let window = ctx.config.coincidence_window_hours;
        let adjustments = by_sku(&snapshot.stock_adjustments);
        let returns = by_sku(&snapshot.returns);

        let mut findings = Vec::new();
        let mut shared_skus = 0usize;

        for (sku, sku_adjustments) in &adjustments {
            let Some(sku_returns) = returns.get(sku) else {
                continue;
            };
            shared_skus += 1;

            for ret in sku_returns {
                for adj in sku_adjustments {
                    if !within_window(adj.event_date, ret.event_date, window) {
                        continue;
                    }
                    let hours_apart = match (adj.event_date, ret.event_date) {
                        (Some(a), Some(r)) => (a - r).num_seconds().abs() as f64 / 3600.0,
                        _ => continue,
                    };
                    let subject = FindingSubject {
                        sku: Some(sku.to_string()),
                        store: ret.store.clone().or_else(|| adj.store.clone()),
                        actor: ret.actor.clone(),
                    };
                    let evidence = Evidence::CrossCategoryCoincidence {
                        hours_apart: round2(hours_apart),
                        adjustment: (*adj).clone(),
                        return_record: (*ret).clone(),
                    };
                    findings.extend(SuspicionFinding::new(
                        FraudType::CrossCategoryCoincidence,
                        RiskLevel::High,
                        subject,
                        evidence,
                        ctx.generated_at,
                    ));
                }
            }
        }

        if !findings.is_empty() {
            log::warn!(
                "cross_category_coincidence: {} close pairs across {} shared SKUs",
                findings.len(),
                shared_skus
            );
        } else {
            log::info!("cross_category_coincidence: {shared_skus} shared SKUs, no close pairs");
        }
        Ok(findings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::EngineConfig,
        movement::{fixture, MovementCategory},
    };
    use chrono::Utc;

    fn detect_with(records: Vec<MovementRecord>, config: &EngineConfig) -> Vec<SuspicionFinding> {
        let ctx = DetectionContext { config, generated_at: Utc::now() };
        CrossCategoryDetector
            .detect(&MovementSnapshot::from_records(records), &ctx)
            .unwrap()
    }

    fn detect(records: Vec<MovementRecord>) -> Vec<SuspicionFinding> {
        detect_with(records, &EngineConfig::default())
    }

    #[test]
    fn window_is_configurable() {
        let two_days_apart = vec![
            fixture(MovementCategory::StockAdjustment, "X", "L1", "op1", "", "10/03/2024"),
            fixture(MovementCategory::Return, "X", "L1", "c1", "", "12/03/2024"),
        ];
        assert!(detect(two_days_apart.clone()).is_empty());

        let wide = EngineConfig { coincidence_window_hours: 72.0, ..EngineConfig::default() };
        assert_eq!(detect_with(two_days_apart, &wide).len(), 1);

        let hours_apart = vec![
            fixture(MovementCategory::StockAdjustment, "X", "L1", "op1", "", "2024-03-01T08:00:00"),
            fixture(MovementCategory::Return, "X", "L1", "c1", "", "2024-03-01T12:00:00"),
        ];
        assert_eq!(detect(hours_apart.clone()).len(), 1);

        let narrow = EngineConfig { coincidence_window_hours: 1.0, ..EngineConfig::default() };
        assert!(detect_with(hours_apart, &narrow).is_empty());
    }

    #[test]
    fn same_day_pair_is_one_high_finding() {
        let findings = detect(vec![
            fixture(MovementCategory::StockAdjustment, "X", "L1", "op1", "SAIDA", "2024-03-01"),
            fixture(MovementCategory::Return, "X", "L1", "c9", "TROCA", "2024-03-01"),
        ]);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.risk_level, RiskLevel::High);
        assert_eq!(f.fraud_type, FraudType::CrossCategoryCoincidence);
        assert_eq!(f.subject.sku.as_deref(), Some("X"));
        match &f.evidence {
            Evidence::CrossCategoryCoincidence { adjustment, return_record, hours_apart } => {
                assert_eq!(adjustment.subtype, "SAIDA");
                assert_eq!(return_record.subtype, "TROCA");
                assert_eq!(*hours_apart, 0.0);
            }
            other => panic!("unexpected evidence {other:?}"),
        }
    }

    #[test]
    fn each_close_return_is_independent() {
        let findings = detect(vec![
            fixture(MovementCategory::StockAdjustment, "X", "L1", "op1", "", "10/03/2024"),
            fixture(MovementCategory::Return, "X", "L1", "c1", "", "10/03/2024"),
            fixture(MovementCategory::Return, "X", "L2", "c2", "", "11/03/2024"),
            fixture(MovementCategory::Return, "X", "L1", "c3", "", "20/03/2024"),
        ]);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[1].subject.store.as_deref(), Some("L2"));
    }

    #[test]
    fn distant_or_undated_events_do_not_match() {
        let findings = detect(vec![
            fixture(MovementCategory::StockAdjustment, "X", "L1", "op1", "", "01/03/2024"),
            fixture(MovementCategory::Return, "X", "L1", "c1", "", "05/03/2024"),
            fixture(MovementCategory::Return, "X", "L1", "c1", "", "not-a-date"),
            fixture(MovementCategory::Return, "Y", "L1", "c1", "", "01/03/2024"),
        ]);
        assert!(findings.is_empty());
    }
}
