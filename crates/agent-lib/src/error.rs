//! Error kinds for the monitoring engine and its collaborators

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the library
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Errors raised by the engine, the scorer adapter and the I/O collaborators
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The outlier model artifact does not exist
    #[error("model artifact not found at {0}")]
    ModelNotFound(PathBuf),

    /// The outlier model artifact could not be parsed or prepared
    #[error("model artifact is invalid: {0}")]
    ModelInvalid(String),

    /// The model bytes do not match the configured digest
    #[error("model checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The feature-names artifact exists but is unusable
    #[error("feature names artifact is invalid: {0}")]
    FeatureNames(String),

    /// Running the model on a sample failed
    #[error("outlier scoring failed: {0}")]
    Scoring(String),

    /// The host sampler could not produce a sample
    #[error("sampling failed: {0}")]
    Sampling(String),

    /// A notification sink could not deliver an alert
    #[error("notification delivery failed: {0}")]
    Notification(String),

    /// The telemetry store is unreadable or malformed
    #[error("telemetry store error: {0}")]
    Telemetry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MonitorError {
    /// Errors that prevent the engine from starting at all
    pub fn is_startup_fatal(&self) -> bool {
        matches!(
            self,
            MonitorError::ModelNotFound(_)
                | MonitorError::ModelInvalid(_)
                | MonitorError::ChecksumMismatch { .. }
                | MonitorError::FeatureNames(_)
        )
    }
}
