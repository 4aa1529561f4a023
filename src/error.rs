//! Error types for latent-space visualization.
//!
//! Every failure propagates to the caller; nothing here is retried.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for visualization operations.
pub type Result<T> = std::result::Result<T, VizError>;

/// Errors that can occur while loading data, training, or rendering figures.
#[derive(Debug, Error)]
pub enum VizError {
    /// Dataset file not found at the configured path.
    #[error("dataset not found: {path}")]
    DatasetNotFound { path: PathBuf },

    /// A dataset line could not be parsed.
    #[error("invalid dataset at line {line}: {reason}")]
    InvalidDataset { line: usize, reason: String },

    /// I/O error while reading input or writing figures.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Shape mismatch between matrices, labels, or model outputs.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: String, actual: String },

    /// Configuration values that cannot drive a run.
    #[error("invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// Figure rendering failed.
    #[error("render failed: {reason}")]
    Render { reason: String },

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl VizError {
    /// Create a new dimension mismatch error.
    #[must_use]
    pub fn dimension_mismatch(expected: impl ToString, actual: impl ToString) -> Self {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Create a new invalid dataset error for a 1-based line number.
    #[must_use]
    pub fn invalid_dataset(line: usize, reason: impl Into<String>) -> Self {
        Self::InvalidDataset {
            line,
            reason: reason.into(),
        }
    }

    /// Create a new invalid config error.
    #[must_use]
    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    /// Create a render error from any displayable backend failure.
    #[must_use]
    pub fn render(reason: impl ToString) -> Self {
        Self::Render {
            reason: reason.to_string(),
        }
    }
}

impl From<serde_json::Error> for VizError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<image::ImageError> for VizError {
    fn from(err: image::ImageError) -> Self {
        Self::render(err)
    }
}
