//! Recidivism detector.
//!
//! Two independent passes over every movement category:
//!   - by actor: repeat customers/operators, counterparts are SKUs
//!   - by sku:   repeat products, counterparts are actors
//! An entity qualifies at `minimum_recidivism_count` occurrences and is
//! HIGH above the per-pass high count.

use crate::{
    detector::{DetectionContext, Detector},
    error::FraudResult,
    finding::{classify_count, Evidence, FindingSubject, FraudType, SuspicionFinding},
    movement::{MovementCategory, MovementRecord, MovementSnapshot},
};
use std::collections::{BTreeMap, BTreeSet};

pub struct RecidivismDetector;

/// Cross-category occurrence totals for one entity.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OccurrenceTally<'a> {
    pub total: usize,
    pub returns: usize,
    pub exchanges: usize,
    pub cancellations: usize,
    pub stock_adjustments: usize,
    pub stores: BTreeSet<&'a str>,
    pub counterparts: BTreeSet<&'a str>,
}

fn actor_of(record: &MovementRecord) -> Option<&str> {
    record.actor.as_deref()
}

fn sku_of(record: &MovementRecord) -> Option<&str> {
    record.sku.as_deref()
}

/// Tally every movement under `key`, recording `counterpart` values.
/// Records without a key are skipped.
pub fn tally_by<'a>(
    snapshot: &'a MovementSnapshot,
    ctx: &DetectionContext<'_>,
    key: fn(&MovementRecord) -> Option<&str>,
    counterpart: fn(&MovementRecord) -> Option<&str>,
) -> BTreeMap<&'a str, OccurrenceTally<'a>> {
    let mut tallies: BTreeMap<&str, OccurrenceTally<'_>> = BTreeMap::new();
    for record in snapshot.iter_all() {
        let Some(k) = key(record) else {
            continue;
        };
        let t = tallies.entry(k).or_default();
        t.total += 1;
        match record.category {
            MovementCategory::Return => {
                t.returns += 1;
                if ctx.config.is_exchange_subtype(&record.subtype) {
                    t.exchanges += 1;
                }
            }
            MovementCategory::Cancellation => t.cancellations += 1,
            MovementCategory::StockAdjustment => t.stock_adjustments += 1,
        }
        if let Some(store) = record.store.as_deref() {
            t.stores.insert(store);
        }
        if let Some(c) = counterpart(record) {
            t.counterparts.insert(c);
        }
    }
    tallies
}

fn emit(
    findings: &mut Vec<SuspicionFinding>,
    tallies: &BTreeMap<&str, OccurrenceTally<'_>>,
    fraud_type: FraudType,
    high_above: usize,
    subject: fn(&str) -> FindingSubject,
    ctx: &DetectionContext<'_>,
) {
    for (entity, t) in tallies {
        let Some(risk) = classify_count(t.total, ctx.config.minimum_recidivism_count, high_above)
        else {
            continue;
        };
        let evidence = Evidence::Recidivism {
            total_occurrences: t.total,
            returns: t.returns,
            exchanges: t.exchanges,
            cancellations: t.cancellations,
            stock_adjustments: t.stock_adjustments,
            stores: t.stores.iter().map(|s| s.to_string()).collect(),
            counterparts: t.counterparts.iter().map(|c| c.to_string()).collect(),
        };
        findings.extend(SuspicionFinding::new(
            fraud_type,
            risk,
            subject(entity),
            evidence,
            ctx.generated_at,
        ));
    }
}

impl Detector for RecidivismDetector {
    fn name(&self) -> &'static str {
        "recidivism"
    }

    fn detect(
        &self,
        snapshot: &MovementSnapshot,
        ctx: &DetectionContext<'_>,
    ) -> FraudResult<Vec<SuspicionFinding>> {
        let mut findings = Vec::new();

        let actors = tally_by(snapshot, ctx, actor_of, sku_of);
        emit(
            &mut findings,
            &actors,
            FraudType::RepeatCustomer,
            ctx.config.repeat_customer_high_count,
            |actor| FindingSubject::actor(actor),
            ctx,
        );
        let repeat_actors = findings.len();

        let products = tally_by(snapshot, ctx, sku_of, actor_of);
        emit(
            &mut findings,
            &products,
            FraudType::RepeatProduct,
            ctx.config.repeat_product_high_count,
            |sku| FindingSubject::sku(sku),
            ctx,
        );

        log::info!(
            "recidivism: {repeat_actors} repeat actors of {}, {} repeat products of {}",
            actors.len(),
            findings.len() - repeat_actors,
            products.len()
        );
        Ok(findings)
    }
}
