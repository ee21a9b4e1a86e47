//! The engine over a real SQLite store.

use retail_fraud_core::{
    config::EngineConfig,
    engine::FraudEngine,
    error::FraudError,
    finding::FraudType,
    movement::{MovementCategory, RawMovement},
    store::{MovementStore, SqliteMovementStore},
};

fn raw(sku: &str, store: &str, actor: &str, subtype: &str, date: &str) -> RawMovement {
    RawMovement {
        source_id: Some(format!("{sku}-{date}")),
        sku: Some(sku.into()),
        store: Some(store.into()),
        actor: Some(actor.into()),
        subtype: Some(subtype.into()),
        value_text: Some("1.234,56".into()),
        date_text: Some(date.into()),
    }
}

fn populated_store() -> SqliteMovementStore {
    let store = SqliteMovementStore::in_memory().expect("in-memory store");
    store.migrate().expect("migration");
    store
        .insert_batch(
            MovementCategory::StockAdjustment,
            &[raw("X", "L1", "op1", "SAIDA", "01/03/2024")],
        )
        .unwrap();
    store
        .insert_batch(
            MovementCategory::Return,
            &[
                raw("X", "L1", "c1", "TROCA", "01/03/2024 10:30"),
                raw("Y", "L1", "c1", "DEVOLUCAO", "10/03/2024"),
                RawMovement { sku: Some("  ".into()), ..raw("", "L1", "c1", "", "") },
            ],
        )
        .unwrap();
    store
        .insert_batch(
            MovementCategory::Cancellation,
            &[raw("Z", "L2", "c2", "CANCELAMENTO", "2024-03-20")],
        )
        .unwrap();
    store
}

#[test]
fn engine_reads_every_category_from_sqlite() {
    let store = populated_store();
    assert_eq!(store.count(MovementCategory::Return).unwrap(), 3);

    let engine = FraudEngine::build(Box::new(store), EngineConfig::default()).unwrap();
    let report = engine.run_full_analysis().unwrap();

    assert_eq!(report.record_counts.returns, 3);
    assert_eq!(report.record_counts.cancellations, 1);
    assert_eq!(report.record_counts.stock_adjustments, 1);
    assert_eq!(report.count_by_type.get(&FraudType::CrossCategoryCoincidence), Some(&1));
    assert_eq!(report.count_by_type.get(&FraudType::RepeatCustomer), Some(&1));
    assert!(report.failed_detectors().is_empty());
}

#[test]
fn blank_columns_become_missing_fields() {
    let store = populated_store();
    let returns = store.returns().unwrap();
    let blank = &returns[2];
    assert_eq!(blank.sku, None);
    assert_eq!(blank.event_date, None);
    assert_eq!(blank.store.as_deref(), Some("L1"));
}

#[test]
fn missing_database_file_is_an_error() {
    let result = SqliteMovementStore::open_read_only("/nonexistent/dir/movements.db");
    assert!(matches!(result, Err(FraudError::Database(_))));
}

#[test]
fn report_round_trips_through_json() {
    let engine = FraudEngine::build(Box::new(populated_store()), EngineConfig::default()).unwrap();
    let report = engine.run_full_analysis().unwrap();
    let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

    assert_eq!(json["run_id"], report.run_id.as_str());
    assert_eq!(json["config"]["minimum_recidivism_count"], 3);
    assert_eq!(json["detector_runs"].as_array().map(Vec::len), Some(5));
    assert_eq!(json["findings"][0]["fraud_type"], "cross_category_coincidence");
}
