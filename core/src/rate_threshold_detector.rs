//! Rate threshold detector.
//!
//! Per store, over returns + cancellations:
//!   exchange_rate = exchange-subtype returns / total movements
//!   cancel_rate   = cancellations / total movements
//! Each rate is tiered independently, so a store can yield two findings.

use crate::{
    detector::{DetectionContext, Detector},
    error::FraudResult,
    finding::{classify, Evidence, FindingSubject, FraudType, SuspicionFinding},
    movement::MovementSnapshot,
    normalize::round2,
};
use std::collections::BTreeMap;

pub struct RateThresholdDetector;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct StoreRates {
    pub total_movements: usize,
    pub exchanges: usize,
    pub cancellations: usize,
}

impl StoreRates {
    pub fn exchange_rate(&self) -> f64 {
        self.exchanges as f64 / self.total_movements.max(1) as f64
    }

    pub fn cancellation_rate(&self) -> f64 {
        self.cancellations as f64 / self.total_movements.max(1) as f64
    }
}

/// Aggregate per-store movement counts. Records without a store are skipped.
pub fn store_rates<'a>(
    snapshot: &'a MovementSnapshot,
    ctx: &DetectionContext<'_>,
) -> BTreeMap<&'a str, StoreRates> {
    let mut stats: BTreeMap<&str, StoreRates> = BTreeMap::new();
    for record in &snapshot.returns {
        if let Some(store) = record.store.as_deref() {
            let s = stats.entry(store).or_default();
            s.total_movements += 1;
            if ctx.config.is_exchange_subtype(&record.subtype) {
                s.exchanges += 1;
            }
        }
    }
    for record in &snapshot.cancellations {
        if let Some(store) = record.store.as_deref() {
            let s = stats.entry(store).or_default();
            s.total_movements += 1;
            s.cancellations += 1;
        }
    }
    stats
}

impl Detector for RateThresholdDetector {
    fn name(&self) -> &'static str {
        "rate_threshold"
    }

    fn detect(
        &self,
        snapshot: &MovementSnapshot,
        ctx: &DetectionContext<'_>,
    ) -> FraudResult<Vec<SuspicionFinding>> {
        let config = ctx.config;
        let stats = store_rates(snapshot, ctx);
        let mut findings = Vec::new();

        for (store, s) in &stats {
            let evidence = |rate: f64, threshold: f64| Evidence::RateThreshold {
                rate_pct: round2(rate * 100.0),
                threshold_pct: round2(threshold * 100.0),
                total_movements: s.total_movements,
                exchange_count: s.exchanges,
                cancellation_count: s.cancellations,
            };

            let exchange_rate = s.exchange_rate();
            if let Some(risk) = classify(
                exchange_rate,
                config.exchange_rate_threshold,
                config.exchange_rate_high,
            ) {
                findings.extend(SuspicionFinding::new(
                    FraudType::ExchangeRate,
                    risk,
                    FindingSubject::store(*store),
                    evidence(exchange_rate, config.exchange_rate_threshold),
                    ctx.generated_at,
                ));
            }

            let cancel_rate = s.cancellation_rate();
            if let Some(risk) = classify(
                cancel_rate,
                config.cancellation_rate_threshold,
                config.cancellation_rate_high,
            ) {
                findings.extend(SuspicionFinding::new(
                    FraudType::CancellationRate,
                    risk,
                    FindingSubject::store(*store),
                    evidence(cancel_rate, config.cancellation_rate_threshold),
                    ctx.generated_at,
                ));
            }
        }

        log::info!(
            "rate_threshold: {} stores checked, {} rate findings",
            stats.len(),
            findings.len()
        );
        Ok(findings)
    }
}
