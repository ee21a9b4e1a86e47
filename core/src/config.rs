//! Engine configuration.
//!
//! Every threshold a detector reads lives here so it can be overridden
//! from a JSON file without touching code. Keys missing from the file
//! fall back to the documented defaults.

use crate::error::{FraudError, FraudResult};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    // ── Volume anomaly ───────────────────────────────
    /// Group total above `mean × this` is MEDIUM.
    pub volume_anomaly_multiplier_medium: f64,
    /// Group total above `mean × this` is HIGH.
    pub volume_anomaly_multiplier_high: f64,

    // ── Cross-category coincidence ───────────────────
    pub coincidence_window_hours: f64,

    // ── Rate threshold ───────────────────────────────
    pub exchange_rate_threshold: f64,
    pub exchange_rate_high: f64,
    pub cancellation_rate_threshold: f64,
    pub cancellation_rate_high: f64,
    /// Case-insensitive substrings that mark a return as an exchange.
    pub exchange_subtype_markers: Vec<String>,

    // ── Short-interval sequence ──────────────────────
    pub short_interval_window_hours: f64,

    // ── Recidivism ───────────────────────────────────
    pub minimum_recidivism_count: usize,
    pub repeat_customer_high_count: usize,
    pub repeat_product_high_count: usize,

    // ── Orchestration ────────────────────────────────
    /// Run detectors on the rayon pool instead of one after another.
    pub parallel: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            volume_anomaly_multiplier_medium: 3.0,
            volume_anomaly_multiplier_high: 5.0,
            coincidence_window_hours: 24.0,
            exchange_rate_threshold: 0.15,
            exchange_rate_high: 0.25,
            cancellation_rate_threshold: 0.10,
            cancellation_rate_high: 0.15,
            exchange_subtype_markers: vec!["exchange".into(), "troca".into()],
            short_interval_window_hours: 24.0,
            minimum_recidivism_count: 3,
            repeat_customer_high_count: 10,
            repeat_product_high_count: 15,
            parallel: true,
        }
    }
}

impl EngineConfig {
    /// Load overrides from a JSON file. The result is validated.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config = Self::from_json(&content)?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> FraudResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings under which detectors would be meaningless.
    pub fn validate(&self) -> FraudResult<()> {
        let pairs = [
            (
                "volume_anomaly_multiplier",
                self.volume_anomaly_multiplier_medium,
                self.volume_anomaly_multiplier_high,
            ),
            (
                "exchange_rate",
                self.exchange_rate_threshold,
                self.exchange_rate_high,
            ),
            (
                "cancellation_rate",
                self.cancellation_rate_threshold,
                self.cancellation_rate_high,
            ),
            (
                "repeat_count",
                self.minimum_recidivism_count as f64,
                self.repeat_customer_high_count.min(self.repeat_product_high_count) as f64,
            ),
        ];
        for (name, medium, high) in pairs {
            if !(medium > 0.0) {
                return Err(FraudError::InvalidConfig(format!(
                    "{name}: medium threshold must be positive, got {medium}"
                )));
            }
            if high < medium {
                return Err(FraudError::InvalidConfig(format!(
                    "{name}: high threshold {high} is below medium threshold {medium}"
                )));
            }
        }

        for (name, rate) in [
            ("exchange_rate_threshold", self.exchange_rate_threshold),
            ("cancellation_rate_threshold", self.cancellation_rate_threshold),
        ] {
            if rate > 1.0 {
                return Err(FraudError::InvalidConfig(format!(
                    "{name} must be a fraction in (0, 1], got {rate}"
                )));
            }
        }

        for (name, hours) in [
            ("coincidence_window_hours", self.coincidence_window_hours),
            ("short_interval_window_hours", self.short_interval_window_hours),
        ] {
            if !(hours >= 0.0) {
                return Err(FraudError::InvalidConfig(format!(
                    "{name} must be non-negative, got {hours}"
                )));
            }
        }

        if self.exchange_subtype_markers.iter().all(|m| m.trim().is_empty()) {
            return Err(FraudError::InvalidConfig(
                "exchange_subtype_markers must name at least one marker".into(),
            ));
        }
        Ok(())
    }

    /// True if `subtype` contains any configured exchange marker.
    pub fn is_exchange_subtype(&self, subtype: &str) -> bool {
        let subtype = subtype.to_lowercase();
        self.exchange_subtype_markers
            .iter()
            .map(|m| m.trim().to_lowercase())
            .any(|m| !m.is_empty() && subtype.contains(&m))
    }
}
