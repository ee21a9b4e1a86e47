//! Short-interval sequence detector.
//!
//! All three categories are merged per `(sku, store)` and sorted by date.
//! Only adjacent pairs are compared, so each group costs one linear pass
//! after sorting. Triads that are mutually close but not adjacent-close
//! are not reported.

use crate::{
    detector::{DetectionContext, Detector},
    error::FraudResult,
    finding::{Evidence, FindingSubject, FraudType, RiskLevel, SuspicionFinding},
    movement::{MovementRecord, MovementSnapshot},
    normalize::{round2, within_window},
};
use std::collections::BTreeMap;

pub struct ShortIntervalDetector;

impl Detector for ShortIntervalDetector {
    fn name(&self) -> &'static str {
        "short_interval_sequence"
    }

    fn detect(
        &self,
        snapshot: &MovementSnapshot,
        ctx: &DetectionContext<'_>,
    ) -> FraudResult<Vec<SuspicionFinding>> {
        let window = ctx.config.short_interval_window_hours;

        let mut groups: BTreeMap<(&str, &str), Vec<&MovementRecord>> = BTreeMap::new();
        for record in snapshot.iter_all() {
            if let Some(key) = record.sku_store() {
                groups.entry(key).or_default().push(record);
            }
        }

        let mut findings = Vec::new();
        for ((sku, store), mut movements) in groups {
            if movements.len() < 2 {
                continue;
            }
            // Stable: ties keep category order. Undated records sort last.
            movements.sort_by_key(|m| (m.event_date.is_none(), m.event_date));

            for pair in movements.windows(2) {
                let (first, second) = (pair[0], pair[1]);
                if !within_window(first.event_date, second.event_date, window) {
                    continue;
                }
                let hours_apart = match (first.event_date, second.event_date) {
                    (Some(a), Some(b)) => (b - a).num_seconds().abs() as f64 / 3600.0,
                    _ => continue,
                };
                let subject = FindingSubject {
                    sku: Some(sku.to_string()),
                    store: Some(store.to_string()),
                    actor: first.actor.clone(),
                };
                let evidence = Evidence::ShortIntervalSequence {
                    hours_apart: round2(hours_apart),
                    first: first.clone(),
                    second: second.clone(),
                };
                findings.extend(SuspicionFinding::new(
                    FraudType::ShortIntervalSequence,
                    RiskLevel::High,
                    subject,
                    evidence,
                    ctx.generated_at,
                ));
            }
        }

        log::info!("short_interval_sequence: {} close adjacent pairs", findings.len());
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
        ShortIntervalDetector
            .detect(&MovementSnapshot::from_records(records), &ctx)
            .unwrap()
    }

    fn detect(records: Vec<MovementRecord>) -> Vec<SuspicionFinding> {
        detect_with(records, &EngineConfig::default())
    }

    #[test]
    fn cross_category_pair_on_consecutive_days() {
        let findings = detect(vec![
            fixture(MovementCategory::Return, "A", "L1", "u1", "TROCA", "02/05/2024"),
            fixture(MovementCategory::Cancellation, "A", "L1", "u2", "CANCELAMENTO", "01/05/2024"),
        ]);
        assert_eq!(findings.len(), 1);
        let f = &findings[0];
        assert_eq!(f.risk_level, RiskLevel::High);
        // Sorted by date, so the cancellation comes first.
        assert_eq!(f.subject.actor.as_deref(), Some("u2"));
        match &f.evidence {
            Evidence::ShortIntervalSequence { first, second, hours_apart } => {
                assert_eq!(first.subtype, "CANCELAMENTO");
                assert_eq!(second.subtype, "TROCA");
                assert_eq!(*hours_apart, 24.0);
            }
            other => panic!("unexpected evidence {other:?}"),
        }
    }

    #[test]
    fn only_adjacent_pairs_are_compared() {
        // Three same-day movements: two adjacent pairs, never the (1st, 3rd) pair.
        let findings = detect(vec![
            fixture(MovementCategory::Return, "A", "L1", "u1", "", "01/05/2024"),
            fixture(MovementCategory::Return, "A", "L1", "u1", "", "01/05/2024"),
            fixture(MovementCategory::StockAdjustment, "A", "L1", "u1", "", "01/05/2024"),
        ]);
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn groups_are_keyed_by_sku_and_store() {
        let findings = detect(vec![
            fixture(MovementCategory::Return, "A", "L1", "u1", "", "01/05/2024"),
            fixture(MovementCategory::Return, "A", "L2", "u1", "", "01/05/2024"),
            fixture(MovementCategory::Return, "B", "L1", "u1", "", "01/05/2024"),
            fixture(MovementCategory::Return, "", "L1", "u1", "", "01/05/2024"),
        ]);
        assert!(findings.is_empty());
    }

    #[test]
    fn window_is_configurable() {
        let records = vec![
            fixture(MovementCategory::Return, "A", "L1", "u1", "", "2024-05-01T08:00:00"),
            fixture(MovementCategory::Return, "A", "L1", "u1", "", "2024-05-01T20:00:00"),
        ];
        assert_eq!(detect(records.clone()).len(), 1);

        let narrow = EngineConfig { short_interval_window_hours: 6.0, ..EngineConfig::default() };
        assert!(detect_with(records, &narrow).is_empty());
    }

    #[test]
    fn undated_movements_never_pair() {
        let findings = detect(vec![
            fixture(MovementCategory::Return, "A", "L1", "u1", "", ""),
            fixture(MovementCategory::Return, "A", "L1", "u1", "", "??"),
            fixture(MovementCategory::Return, "A", "L1", "u1", "", "01/05/2024"),
        ]);
        assert!(findings.is_empty());
    }
}
