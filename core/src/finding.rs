//! Findings produced by detectors, and the shared risk-tier helpers.

use crate::{
    movement::MovementRecord,
    types::{ActorId, Sku, StoreId},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Risk tiers ───────────────────────────────────────────────────────────────

/// Two ordinal tiers. `High` always compares greater than `Medium`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RiskLevel {
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
        }
    }
}

/// Tier a measurement against two strict lower bounds.
///
/// `value > high_above` is HIGH, `value > medium_above` is MEDIUM,
/// anything else produces no finding.
pub fn classify(value: f64, medium_above: f64, high_above: f64) -> Option<RiskLevel> {
    if value > high_above {
        Some(RiskLevel::High)
    } else if value > medium_above {
        Some(RiskLevel::Medium)
    } else {
        None
    }
}

/// Tier an occurrence count where `minimum` itself already qualifies.
pub fn classify_count(count: usize, minimum: usize, high_above: usize) -> Option<RiskLevel> {
    if count < minimum {
        None
    } else if count > high_above {
        Some(RiskLevel::High)
    } else {
        Some(RiskLevel::Medium)
    }
}

// ── Fraud types ──────────────────────────────────────────────────────────────

/// Which rule produced a finding. Variants are never reordered: report
/// tallies are keyed and sorted by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FraudType {
    VolumeAnomaly,
    CrossCategoryCoincidence,
    ExchangeRate,
    CancellationRate,
    ShortIntervalSequence,
    RepeatCustomer,
    RepeatProduct,
}

impl FraudType {
    pub const ALL: [FraudType; 7] = [
        FraudType::VolumeAnomaly,
        FraudType::CrossCategoryCoincidence,
        FraudType::ExchangeRate,
        FraudType::CancellationRate,
        FraudType::ShortIntervalSequence,
        FraudType::RepeatCustomer,
        FraudType::RepeatProduct,
    ];

    /// Reviewer-facing label.
    pub fn label(self) -> &'static str {
        match self {
            FraudType::VolumeAnomaly => "Anomalous return volume",
            FraudType::CrossCategoryCoincidence => "Product in stock adjustment and return at the same time",
            FraudType::ExchangeRate => "Exchange rate above threshold",
            FraudType::CancellationRate => "Cancellation rate above threshold",
            FraudType::ShortIntervalSequence => "Movements in a short interval",
            FraudType::RepeatCustomer => "Repeat customer in returns or discrepancies",
            FraudType::RepeatProduct => "Repeat product in returns or discrepancies",
        }
    }
}

// ── Subject & evidence ───────────────────────────────────────────────────────

/// The entities a finding is about. At least one key is always set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingSubject {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store: Option<StoreId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor: Option<ActorId>,
}

impl FindingSubject {
    pub fn sku(sku: impl Into<Sku>) -> Self {
        Self { sku: Some(sku.into()), ..Self::default() }
    }

    pub fn store(store: impl Into<StoreId>) -> Self {
        Self { store: Some(store.into()), ..Self::default() }
    }

    pub fn actor(actor: impl Into<ActorId>) -> Self {
        Self { actor: Some(actor.into()), ..Self::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.sku.is_none() && self.store.is_none() && self.actor.is_none()
    }
}

/// Detector-specific detail explaining why a finding fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Evidence {
    VolumeAnomaly {
        total_returns: usize,
        dataset_mean: f64,
        percentage_above_mean: f64,
        returns: Vec<MovementRecord>,
    },
    CrossCategoryCoincidence {
        hours_apart: f64,
        adjustment: MovementRecord,
        return_record: MovementRecord,
    },
    RateThreshold {
        /// Observed rate, as a percentage.
        rate_pct: f64,
        /// Configured MEDIUM threshold, as a percentage.
        threshold_pct: f64,
        total_movements: usize,
        exchange_count: usize,
        cancellation_count: usize,
    },
    ShortIntervalSequence {
        hours_apart: f64,
        first: MovementRecord,
        second: MovementRecord,
    },
    Recidivism {
        total_occurrences: usize,
        returns: usize,
        exchanges: usize,
        cancellations: usize,
        stock_adjustments: usize,
        stores: Vec<StoreId>,
        /// SKUs for a repeat customer, actors for a repeat product.
        counterparts: Vec<String>,
    },
}

/// One flagged anomaly. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuspicionFinding {
    pub fraud_type: FraudType,
    pub risk_level: RiskLevel,
    pub subject: FindingSubject,
    pub evidence: Evidence,
    pub generated_at: DateTime<Utc>,
}

impl SuspicionFinding {
    /// Returns `None` when `subject` names no entity.
    pub fn new(
        fraud_type: FraudType,
        risk_level: RiskLevel,
        subject: FindingSubject,
        evidence: Evidence,
        generated_at: DateTime<Utc>,
    ) -> Option<Self> {
        if subject.is_empty() {
            return None;
        }
        Some(Self {
            fraud_type,
            risk_level,
            subject,
            evidence,
            generated_at,
        })
    }
}
