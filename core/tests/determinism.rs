//! Same movements in, same findings out.
//!
//! Two runs over identical store contents must produce identical
//! findings in identical order, whether detectors run in parallel or
//! one after another. Only timestamps and run ids may differ.

use retail_fraud_core::{
    config::EngineConfig,
    engine::FraudEngine,
    finding::SuspicionFinding,
    movement::{MovementCategory, MovementRecord, RawMovement},
    report::AnalysisReport,
    store::InMemoryStore,
};

fn record(category: MovementCategory, sku: &str, store: &str, actor: &str, subtype: &str, date: &str) -> MovementRecord {
    MovementRecord::from_raw(
        category,
        RawMovement {
            sku: Some(sku.into()),
            store: Some(store.into()),
            actor: Some(actor.into()),
            subtype: Some(subtype.into()),
            value_text: Some("19,90".into()),
            date_text: Some(date.into()),
            ..RawMovement::default()
        },
    )
}

/// A mixed dataset that trips every detector at least once.
fn dataset() -> Vec<MovementRecord> {
    let mut records = Vec::new();
    for i in 0..60 {
        let sku = format!("SKU-{}", i % 7);
        let store = format!("L{}", i % 4);
        let actor = format!("c{}", i % 9);
        let date = format!("{:02}/03/2024", 1 + i % 28);
        let subtype = if i % 3 == 0 { "TROCA" } else { "DEVOLUCAO" };
        records.push(record(MovementCategory::Return, &sku, &store, &actor, subtype, &date));
        if i % 5 == 0 {
            records.push(record(MovementCategory::Cancellation, &sku, &store, &actor, "CANCELAMENTO", &date));
        }
        if i % 11 == 0 {
            records.push(record(MovementCategory::StockAdjustment, &sku, &store, "op1", "SAIDA", &date));
        }
    }
    records.extend((0..12).map(|_| record(MovementCategory::Return, "HOT", "L9", "c99", "TROCA", "15/03/2024")));
    records
}

fn run(parallel: bool) -> AnalysisReport {
    let store: InMemoryStore = dataset().into_iter().collect();
    let config = EngineConfig { parallel, ..EngineConfig::default() };
    FraudEngine::build(Box::new(store), config)
        .unwrap()
        .run_full_analysis()
        .unwrap()
}

/// Findings with the run timestamp stripped.
fn fingerprint(findings: &[SuspicionFinding]) -> Vec<String> {
    findings
        .iter()
        .map(|f| {
            format!(
                "{:?}|{:?}|{}|{}",
                f.fraud_type,
                f.risk_level,
                serde_json::to_string(&f.subject).unwrap(),
                serde_json::to_string(&f.evidence).unwrap()
            )
        })
        .collect()
}

#[test]
fn repeated_runs_produce_identical_findings() {
    let a = run(true);
    let b = run(true);

    assert_eq!(a.count_by_type, b.count_by_type);
    assert_eq!(a.count_by_risk, b.count_by_risk);
    assert_eq!(a.summary, b.summary);

    let fa = fingerprint(&a.findings);
    let fb = fingerprint(&b.findings);
    assert_eq!(fa.len(), fb.len(), "Finding counts differ: {} vs {}", fa.len(), fb.len());
    for (i, (x, y)) in fa.iter().zip(fb.iter()).enumerate() {
        assert_eq!(x, y, "Findings diverged at {i}:\n  A: {x}\n  B: {y}");
    }
}

#[test]
fn parallel_and_sequential_runs_agree() {
    let parallel = run(true);
    let sequential = run(false);

    assert_eq!(fingerprint(&parallel.findings), fingerprint(&sequential.findings));
    let names = |r: &AnalysisReport| r.detector_runs.iter().map(|d| d.detector.clone()).collect::<Vec<_>>();
    assert_eq!(names(&parallel), names(&sequential));
}

#[test]
fn dataset_exercises_every_detector() {
    let report = run(true);
    for run in &report.detector_runs {
        assert!(!run.failed(), "{} failed", run.detector);
    }
    assert!(
        report.count_by_type.len() >= 5,
        "Expected most fraud types to fire, got {:?}",
        report.count_by_type
    );
    assert!(report.run_id != run(true).run_id, "Run ids must be unique");
}
