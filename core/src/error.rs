use thiserror::Error;

#[derive(Error, Debug)]
pub enum FraudError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transaction store unavailable: {reason}")]
    StoreUnavailable { reason: String },

    #[error("Detector '{detector}' failed: {reason}")]
    DetectorFailed { detector: &'static str, reason: String },

    #[error("Detector '{detector}' panicked: {message}")]
    DetectorPanicked { detector: &'static str, message: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No detector named '{0}' is registered")]
    UnknownDetector(String),

    #[error("Analysis run cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type FraudResult<T> = Result<T, FraudError>;
