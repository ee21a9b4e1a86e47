//! Transaction store adapters.
//!
//! RULE: detectors never talk to a store. The engine fetches one
//! [`MovementSnapshot`] per run through [`load_snapshot`] and hands it
//! to detectors by reference.

mod sqlite;

pub use sqlite::SqliteMovementStore;

use crate::{
    error::{FraudError, FraudResult},
    movement::{MovementCategory, MovementRecord, MovementSnapshot, RawMovement},
};
use chrono::Utc;

/// Read-only access to movement history, one query per category.
pub trait MovementStore {
    /// All records of `category`, in the store's natural order.
    fn fetch(&self, category: MovementCategory) -> FraudResult<Vec<MovementRecord>>;

    fn returns(&self) -> FraudResult<Vec<MovementRecord>> {
        self.fetch(MovementCategory::Return)
    }

    fn cancellations(&self) -> FraudResult<Vec<MovementRecord>> {
        self.fetch(MovementCategory::Cancellation)
    }

    fn stock_adjustments(&self) -> FraudResult<Vec<MovementRecord>> {
        self.fetch(MovementCategory::StockAdjustment)
    }
}

/// Fetch every category once. Any store error is fatal for the run and
/// is reported as [`FraudError::StoreUnavailable`].
pub fn load_snapshot(store: &dyn MovementStore) -> FraudResult<MovementSnapshot> {
    let unavailable = |category: MovementCategory, e: FraudError| match e {
        FraudError::StoreUnavailable { .. } => e,
        other => FraudError::StoreUnavailable {
            reason: format!("fetching {}: {other}", category.as_str()),
        },
    };

    let returns = store
        .returns()
        .map_err(|e| unavailable(MovementCategory::Return, e))?;
    let cancellations = store
        .cancellations()
        .map_err(|e| unavailable(MovementCategory::Cancellation, e))?;
    let stock_adjustments = store
        .stock_adjustments()
        .map_err(|e| unavailable(MovementCategory::StockAdjustment, e))?;

    log::debug!(
        "Snapshot loaded: {} returns, {} cancellations, {} stock adjustments",
        returns.len(),
        cancellations.len(),
        stock_adjustments.len()
    );

    Ok(MovementSnapshot {
        returns,
        cancellations,
        stock_adjustments,
        fetched_at: Some(Utc::now()),
    })
}

/// Store backed by plain vectors. Used for fixtures and for embedding
/// the engine behind an adapter that already holds rows in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Vec<MovementRecord>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: MovementRecord) {
        self.records.push(record);
    }

    /// Normalize and append a raw row.
    pub fn push_raw(&mut self, category: MovementCategory, raw: RawMovement) {
        self.records.push(MovementRecord::from_raw(category, raw));
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl FromIterator<MovementRecord> for InMemoryStore {
    fn from_iter<I: IntoIterator<Item = MovementRecord>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl MovementStore for InMemoryStore {
    fn fetch(&self, category: MovementCategory) -> FraudResult<Vec<MovementRecord>> {
        Ok(self
            .records
            .iter()
            .filter(|r| r.category == category)
            .cloned()
            .collect())
    }
}
