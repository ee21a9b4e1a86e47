//! The fraud engine: one analysis run, start to finish.
//!
//! A run is:
//!   1. Load one snapshot of every movement category from the store.
//!   2. Run each registered detector over that snapshot.
//!   3. Merge findings in registration order and assemble the report.
//!
//! RULES:
//!   - A store failure aborts the run before any detector executes.
//!   - A detector that errors or panics contributes zero findings; the
//!     failure is logged and recorded, and the run continues.
//!   - Detectors may execute in parallel, but merged findings always
//!     follow registration order.
//!   - Cancellation is checked before each detector starts. A cancellation
//!     aborts the run that observes it and is then cleared, so the next
//!     run starts fresh.

use crate::{
    config::EngineConfig,
    detector::{default_detectors, DetectionContext, Detector},
    error::{FraudError, FraudResult},
    finding::SuspicionFinding,
    movement::MovementSnapshot,
    report::{AnalysisReport, DetectorOutcome, DetectorRun, RecordCounts},
    store::{load_snapshot, MovementStore},
};
use chrono::Utc;
use rayon::prelude::*;
use std::{
    any::Any,
    panic::{self, AssertUnwindSafe},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};
use uuid::Uuid;

/// Shared flag for aborting a run from another thread.
///
/// A flag raised between runs aborts the next run. The engine clears it
/// once a run has been aborted.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct FraudEngine {
    store: Box<dyn MovementStore>,
    config: EngineConfig,
    detectors: Vec<Box<dyn Detector>>,
    cancel: CancellationToken,
}

/// Result of one detector invocation, before merging.
struct DetectorExecution {
    run: DetectorRun,
    findings: Vec<SuspicionFinding>,
}

impl FraudEngine {
    /// Engine with no detectors registered. Prefer [`FraudEngine::build`].
    pub fn new(store: Box<dyn MovementStore>, config: EngineConfig) -> Self {
        Self {
            store,
            config,
            detectors: Vec::new(),
            cancel: CancellationToken::default(),
        }
    }

    /// Validate the configuration and register the five built-in
    /// detectors in their documented order.
    pub fn build(store: Box<dyn MovementStore>, config: EngineConfig) -> FraudResult<Self> {
        config.validate()?;
        let mut engine = Self::new(store, config);
        for detector in default_detectors() {
            engine.register(detector);
        }
        Ok(engine)
    }

    /// Append a detector. Registration order is execution and report order.
    pub fn register(&mut self, detector: Box<dyn Detector>) {
        self.detectors.push(detector);
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Fetch a fresh snapshot and run every registered detector over it.
    pub fn run_full_analysis(&self) -> FraudResult<AnalysisReport> {
        let started = Instant::now();
        let started_at = Utc::now();
        let run_id = Uuid::new_v4().to_string();
        log::info!(
            "Analysis {run_id} started with {} detectors (parallel: {})",
            self.detectors.len(),
            self.config.parallel
        );

        let snapshot = load_snapshot(self.store.as_ref()).map_err(|e| {
            log::error!("Analysis {run_id} aborted: {e}");
            e
        })?;

        self.analyze(run_id, started_at, started, &snapshot)
    }

    /// Run every registered detector over a snapshot the caller already holds.
    pub fn analyze_snapshot(&self, snapshot: &MovementSnapshot) -> FraudResult<AnalysisReport> {
        let run_id = Uuid::new_v4().to_string();
        self.analyze(run_id, Utc::now(), Instant::now(), snapshot)
    }

    /// Run a single registered detector against a fresh snapshot.
    pub fn run_detector(&self, name: &str) -> FraudResult<Vec<SuspicionFinding>> {
        let detector = self
            .detectors
            .iter()
            .find(|d| d.name() == name)
            .ok_or_else(|| FraudError::UnknownDetector(name.to_string()))?;
        let snapshot = load_snapshot(self.store.as_ref())?;
        let ctx = DetectionContext { config: &self.config, generated_at: Utc::now() };
        guarded_detect(detector.as_ref(), &snapshot, &ctx)
    }

    fn analyze(
        &self,
        run_id: String,
        started_at: chrono::DateTime<Utc>,
        started: Instant,
        snapshot: &MovementSnapshot,
    ) -> FraudResult<AnalysisReport> {
        let ctx = DetectionContext { config: &self.config, generated_at: Utc::now() };
        let cancel = &self.cancel;

        let executions: Vec<Option<DetectorExecution>> = if self.config.parallel {
            self.detectors
                .par_iter()
                .map(|d| execute(d.as_ref(), snapshot, &ctx, cancel))
                .collect()
        } else {
            self.detectors
                .iter()
                .map(|d| execute(d.as_ref(), snapshot, &ctx, cancel))
                .collect()
        };

        if self.cancel.is_cancelled() {
            self.cancel.reset();
            log::warn!("Analysis {run_id} cancelled");
            return Err(FraudError::Cancelled);
        }

        let mut findings = Vec::new();
        let mut detector_runs = Vec::with_capacity(executions.len());
        for execution in executions.into_iter().flatten() {
            findings.extend(execution.findings);
            detector_runs.push(execution.run);
        }

        let report = AnalysisReport::assemble(
            run_id,
            started_at,
            started.elapsed().as_secs_f64(),
            findings,
            detector_runs,
            RecordCounts::from(snapshot),
            self.config.clone(),
        );

        log::info!(
            "Analysis {} finished in {:.3}s: {} findings ({} HIGH), {} detectors failed",
            report.run_id,
            report.duration_seconds,
            report.summary.total_findings,
            report.summary.high_risk,
            report.failed_detectors().len()
        );
        Ok(report)
    }
}

/// None when the run was cancelled before this detector started.
fn execute(
    detector: &dyn Detector,
    snapshot: &MovementSnapshot,
    ctx: &DetectionContext<'_>,
    cancel: &CancellationToken,
) -> Option<DetectorExecution> {
    if cancel.is_cancelled() {
        return None;
    }

    let started = Instant::now();
    let result = guarded_detect(detector, snapshot, ctx);
    let duration_seconds = started.elapsed().as_secs_f64();

    let (outcome, findings) = match result {
        Ok(findings) => {
            log::debug!("{}: {} findings", detector.name(), findings.len());
            (DetectorOutcome::Completed { findings: findings.len() }, findings)
        }
        Err(e) => {
            log::error!("Detector {} failed: {e}", detector.name());
            (DetectorOutcome::Failed { error: e.to_string() }, Vec::new())
        }
    };

    Some(DetectorExecution {
        run: DetectorRun {
            detector: detector.name().to_string(),
            outcome,
            duration_seconds,
        },
        findings,
    })
}

/// Run a detector, converting a panic into [`FraudError::DetectorPanicked`].
fn guarded_detect(
    detector: &dyn Detector,
    snapshot: &MovementSnapshot,
    ctx: &DetectionContext<'_>,
) -> FraudResult<Vec<SuspicionFinding>> {
    match panic::catch_unwind(AssertUnwindSafe(|| detector.detect(snapshot, ctx))) {
        Ok(result) => result,
        Err(payload) => Err(FraudError::DetectorPanicked {
            detector: detector.name(),
            message: panic_message(payload.as_ref()),
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
