//! fraud-runner: headless analysis runner for the retail fraud engine.
//!
//! Usage:
//!   fraud-runner --db movements.db --out report.json
//!   fraud-runner --db movements.db --config thresholds.json --sequential
//!   fraud-runner --demo 5000 --seed 42

mod demo;

use anyhow::{Context, Result};
use retail_fraud_core::{
    config::EngineConfig,
    engine::FraudEngine,
    report::AnalysisReport,
    store::SqliteMovementStore,
};
use std::env;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let config_path = arg_value(&args, "--config");
    let demo_rows = parse_arg(&args, "--demo", 0usize);
    let seed = parse_arg(&args, "--seed", 42u64);
    let sequential = args.iter().any(|a| a == "--sequential");
    let out = arg_value(&args, "--out")
        .map(str::to_string)
        .unwrap_or_else(default_report_path);

    println!("Retail fraud engine: fraud-runner");
    println!("  db:        {db}");
    println!("  config:    {}", config_path.unwrap_or("(defaults)"));
    println!("  mode:      {}", if sequential { "sequential" } else { "parallel" });
    if demo_rows > 0 {
        println!("  demo rows: {demo_rows} (seed {seed})");
    }
    println!();

    let mut config = match config_path {
        Some(path) => EngineConfig::load(path)?,
        None => EngineConfig::default(),
    };
    if sequential {
        config.parallel = false;
    }

    let store = if demo_rows > 0 || db == ":memory:" {
        let store = SqliteMovementStore::open(db)?;
        store.migrate()?;
        if demo_rows > 0 {
            demo::populate(&store, demo_rows, seed)?;
        }
        store
    } else {
        SqliteMovementStore::open_read_only(db)
            .with_context(|| format!("opening movement database {db}"))?
    };

    let engine = FraudEngine::build(Box::new(store), config)?;
    let report = engine.run_full_analysis()?;

    std::fs::write(&out, report.to_json_pretty()?)
        .with_context(|| format!("writing report to {out}"))?;

    print_summary(&report, &out);
    Ok(())
}

fn print_summary(report: &AnalysisReport, out: &str) {
    let counts = &report.record_counts;
    let summary = &report.summary;

    println!("=== RUN SUMMARY ===");
    println!("  run_id:         {}", report.run_id);
    println!("  started:        {}", report.started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    println!("  duration:       {:.3}s", report.duration_seconds);
    println!("  returns:        {}", counts.returns);
    println!("  cancellations:  {}", counts.cancellations);
    println!("  adjustments:    {}", counts.stock_adjustments);
    println!("  findings:       {}", summary.total_findings);
    println!("  high risk:      {} ({:.2}%)", summary.high_risk, summary.percentage_high_risk);
    println!("  medium risk:    {}", summary.medium_risk);
    println!("  report:         {out}");

    println!();
    println!("=== FINDINGS BY TYPE ===");
    if report.count_by_type.is_empty() {
        println!("  (none)");
    }
    for (fraud_type, count) in &report.count_by_type {
        println!("  {:<45} {count}", fraud_type.label());
    }

    let failed = report.failed_detectors();
    if !failed.is_empty() {
        println!();
        println!("=== FAILED DETECTORS ===");
        for name in failed {
            println!("  {name}");
        }
    }

    println!();
    println!("=== RECOMMENDATIONS ===");
    for rec in &summary.recommendations {
        println!("  - {rec}");
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    args.windows(2)
        .find(|w| w[0] == flag)
        .and_then(|w| w[1].parse().ok())
        .unwrap_or(default)
}

fn default_report_path() -> String {
    format!("fraud-report-{}.json", chrono::Utc::now().format("%Y%m%d-%H%M%S"))
}
