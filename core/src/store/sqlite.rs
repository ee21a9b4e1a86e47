//! SQLite-backed movement store.

use super::MovementStore;
use crate::{
    error::FraudResult,
    movement::{MovementCategory, MovementRecord, RawMovement},
};
use rusqlite::{params, Connection, OpenFlags};

pub struct SqliteMovementStore {
    conn: Connection,
}

impl SqliteMovementStore {
    /// Open (or create) a database for reading and writing.
    pub fn open(path: &str) -> FraudResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        Ok(Self { conn })
    }

    /// Open an existing database without creating it. A missing file is an
    /// error rather than an empty store.
    pub fn open_read_only(path: &str) -> FraudResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_URI,
        )?;
        Ok(Self { conn })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> FraudResult<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self { conn })
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> FraudResult<()> {
        self.conn
            .execute_batch(include_str!("../../migrations/001_movements.sql"))?;
        Ok(())
    }

    pub fn insert_raw(&self, category: MovementCategory, raw: &RawMovement) -> FraudResult<i64> {
        self.conn.execute(
            "INSERT INTO movement
                (category, source_id, sku, store, actor, subtype, value_text, date_text)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                category.as_str(),
                raw.source_id,
                raw.sku,
                raw.store,
                raw.actor,
                raw.subtype,
                raw.value_text,
                raw.date_text,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert many rows in a single transaction.
    pub fn insert_batch(&self, category: MovementCategory, rows: &[RawMovement]) -> FraudResult<usize> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO movement
                    (category, source_id, sku, store, actor, subtype, value_text, date_text)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for raw in rows {
                stmt.execute(params![
                    category.as_str(),
                    raw.source_id,
                    raw.sku,
                    raw.store,
                    raw.actor,
                    raw.subtype,
                    raw.value_text,
                    raw.date_text,
                ])?;
            }
        }
        tx.commit()?;
        Ok(rows.len())
    }

    pub fn count(&self, category: MovementCategory) -> FraudResult<i64> {
        Ok(self.conn.query_row(
            "SELECT COUNT(*) FROM movement WHERE category = ?1",
            params![category.as_str()],
            |r| r.get(0),
        )?)
    }

    fn fetch_raw(&self, category: MovementCategory) -> FraudResult<Vec<RawMovement>> {
        let mut stmt = self.conn.prepare(
            "SELECT source_id, sku, store, actor, subtype, value_text, date_text
             FROM movement WHERE category = ?1
             ORDER BY id ASC",
        )?;
        let rows = stmt
            .query_map(params![category.as_str()], |r| {
                Ok(RawMovement {
                    source_id: r.get(0)?,
                    sku: r.get(1)?,
                    store: r.get(2)?,
                    actor: r.get(3)?,
                    subtype: r.get(4)?,
                    value_text: r.get(5)?,
                    date_text: r.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

impl MovementStore for SqliteMovementStore {
    fn fetch(&self, category: MovementCategory) -> FraudResult<Vec<MovementRecord>> {
        let records = self
            .fetch_raw(category)?
            .into_iter()
            .map(|raw| MovementRecord::from_raw(category, raw))
            .collect();
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn store() -> SqliteMovementStore {
        let store = SqliteMovementStore::in_memory().expect("in-memory store");
        store.migrate().expect("migration");
        store
    }

    #[test]
    fn rows_are_normalized_on_fetch() {
        let store = store();
        store
            .insert_raw(
                MovementCategory::Return,
                &RawMovement {
                    source_id: Some("dev-1".into()),
                    sku: Some("SKU-9".into()),
                    store: Some("L01".into()),
                    actor: Some("".into()),
                    subtype: Some("TROCA".into()),
                    value_text: Some("1.234,56".into()),
                    date_text: Some("01/03/2024".into()),
                },
            )
            .unwrap();

        let records = store.fetch(MovementCategory::Return).unwrap();
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.source_id.as_deref(), Some("dev-1"));
        assert_eq!(r.actor, None);
        assert_eq!(r.subtype, "TROCA");
        assert_eq!(r.value_delta, Decimal::new(123456, 2));
        assert!(r.event_date.is_some());
    }

    #[test]
    fn batch_insert_keeps_categories_apart() {
        let store = store();
        let rows = vec![RawMovement::default(); 4];
        store.insert_batch(MovementCategory::Cancellation, &rows).unwrap();
        store
            .insert_raw(MovementCategory::StockAdjustment, &RawMovement::default())
            .unwrap();

        assert_eq!(store.count(MovementCategory::Cancellation).unwrap(), 4);
        assert_eq!(store.count(MovementCategory::StockAdjustment).unwrap(), 1);
        assert_eq!(store.count(MovementCategory::Return).unwrap(), 0);
        assert_eq!(store.cancellations().unwrap().len(), 4);
    }

    #[test]
    fn unmigrated_database_fails_to_fetch() {
        let store = SqliteMovementStore::in_memory().unwrap();
        assert!(store.fetch(MovementCategory::Return).is_err());
    }
}
