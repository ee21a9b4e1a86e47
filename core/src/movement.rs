//! Movement records and the per-run snapshot detectors read from.
//!
//! Store rows arrive as loosely-typed text ([`RawMovement`]). They are
//! resolved once into [`MovementRecord`] at ingestion: blank text becomes
//! `None`, values and dates are normalized. Detectors never re-check
//! field presence beyond matching on the `Option`s.

use crate::{
    normalize::{parse_event_date, parse_value},
    types::{ActorId, Sku, StoreId},
};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementCategory {
    Return,
    Cancellation,
    StockAdjustment,
}

impl MovementCategory {
    pub const ALL: [MovementCategory; 3] = [
        MovementCategory::Return,
        MovementCategory::Cancellation,
        MovementCategory::StockAdjustment,
    ];

    /// Stable name, also the `category` column value in SQLite.
    pub fn as_str(self) -> &'static str {
        match self {
            MovementCategory::Return => "return",
            MovementCategory::Cancellation => "cancellation",
            MovementCategory::StockAdjustment => "stock_adjustment",
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == name)
    }
}

/// One row exactly as the transaction store hands it over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMovement {
    pub source_id: Option<String>,
    pub sku: Option<String>,
    pub store: Option<String>,
    pub actor: Option<String>,
    pub subtype: Option<String>,
    pub value_text: Option<String>,
    pub date_text: Option<String>,
}

/// A single normalized movement event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovementRecord {
    pub source_id: Option<String>,
    pub category: MovementCategory,
    pub sku: Option<Sku>,
    pub store: Option<StoreId>,
    pub actor: Option<ActorId>,
    /// Free-text movement label, e.g. "exchange". Empty when absent.
    pub subtype: String,
    pub value_delta: Decimal,
    pub event_date: Option<NaiveDateTime>,
}

impl MovementRecord {
    pub fn from_raw(category: MovementCategory, raw: RawMovement) -> Self {
        let value_delta = raw
            .value_text
            .as_deref()
            .map(parse_value)
            .unwrap_or(Decimal::ZERO);
        let event_date = raw.date_text.as_deref().and_then(parse_event_date);
        Self {
            source_id: non_blank(raw.source_id),
            category,
            sku: non_blank(raw.sku),
            store: non_blank(raw.store),
            actor: non_blank(raw.actor),
            subtype: non_blank(raw.subtype).unwrap_or_default(),
            value_delta,
            event_date,
        }
    }

    /// `(sku, store)` when both are present.
    pub fn sku_store(&self) -> Option<(&str, &str)> {
        Some((self.sku.as_deref()?, self.store.as_deref()?))
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}

/// Immutable view of all movements, fetched once per analysis run and
/// shared read-only by every detector.
#[derive(Debug, Clone, Default, Serialize)]
pub struct MovementSnapshot {
    pub returns: Vec<MovementRecord>,
    pub cancellations: Vec<MovementRecord>,
    pub stock_adjustments: Vec<MovementRecord>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl MovementSnapshot {
    /// Build a snapshot, routing each record by its category.
    pub fn from_records(records: impl IntoIterator<Item = MovementRecord>) -> Self {
        let mut snapshot = Self::default();
        for record in records {
            match record.category {
                MovementCategory::Return => snapshot.returns.push(record),
                MovementCategory::Cancellation => snapshot.cancellations.push(record),
                MovementCategory::StockAdjustment => snapshot.stock_adjustments.push(record),
            }
        }
        snapshot
    }

    pub fn category(&self, category: MovementCategory) -> &[MovementRecord] {
        match category {
            MovementCategory::Return => &self.returns,
            MovementCategory::Cancellation => &self.cancellations,
            MovementCategory::StockAdjustment => &self.stock_adjustments,
        }
    }

    /// Every record, in category order then store order.
    pub fn iter_all(&self) -> impl Iterator<Item = &MovementRecord> {
        self.returns
            .iter()
            .chain(self.cancellations.iter())
            .chain(self.stock_adjustments.iter())
    }

    pub fn len(&self) -> usize {
        self.returns.len() + self.cancellations.len() + self.stock_adjustments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fixture builder for detector unit tests.
#[cfg(test)]
pub(crate) fn fixture(
    category: MovementCategory,
    sku: &str,
    store: &str,
    actor: &str,
    subtype: &str,
    date: &str,
) -> MovementRecord {
    MovementRecord::from_raw(
        category,
        RawMovement {
            source_id: None,
            sku: Some(sku.into()),
            store: Some(store.into()),
            actor: Some(actor.into()),
            subtype: Some(subtype.into()),
            value_text: Some("10,00".into()),
            date_text: Some(date.into()),
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(sku: &str, store: &str, value: &str, date: &str) -> RawMovement {
        RawMovement {
            source_id: Some("r-1".into()),
            sku: Some(sku.into()),
            store: Some(store.into()),
            actor: Some("  ".into()),
            subtype: None,
            value_text: Some(value.into()),
            date_text: Some(date.into()),
        }
    }

    #[test]
    fn blank_fields_resolve_to_none() {
        let record = MovementRecord::from_raw(
            MovementCategory::Return,
            raw(" SKU-1 ", "", "R$ 10,00", "not a date"),
        );
        assert_eq!(record.sku.as_deref(), Some("SKU-1"));
        assert_eq!(record.store, None);
        assert_eq!(record.actor, None);
        assert_eq!(record.subtype, "");
        assert_eq!(record.value_delta, Decimal::new(10, 0));
        assert_eq!(record.event_date, None);
        assert_eq!(record.sku_store(), None);
    }

    #[test]
    fn snapshot_routes_by_category() {
        let records = vec![
            MovementRecord::from_raw(MovementCategory::Return, raw("A", "1", "1", "01/01/2024")),
            MovementRecord::from_raw(
                MovementCategory::StockAdjustment,
                raw("A", "1", "1", "01/01/2024"),
            ),
            MovementRecord::from_raw(MovementCategory::Return, raw("B", "1", "1", "01/01/2024")),
        ];
        let snapshot = MovementSnapshot::from_records(records);
        assert_eq!(snapshot.returns.len(), 2);
        assert_eq!(snapshot.cancellations.len(), 0);
        assert_eq!(snapshot.stock_adjustments.len(), 1);
        assert_eq!(snapshot.len(), 3);
        assert_eq!(snapshot.iter_all().count(), 3);
    }

    #[test]
    fn category_names_round_trip() {
        for category in MovementCategory::ALL {
            assert_eq!(MovementCategory::parse(category.as_str()), Some(category));
        }
        assert_eq!(MovementCategory::parse("sale"), None);
    }
}
