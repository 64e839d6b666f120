//! Error types for the unrate_forecast crate

use std::path::PathBuf;
use thiserror::Error;

/// Custom error types for the unrate_forecast crate
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Input file or model artifact absent at startup
    #[error("Missing resource: {what} not found at {}", path.display())]
    MissingResourceError {
        /// Human-readable description of the resource
        what: String,
        /// Location that was checked
        path: PathBuf,
    },

    /// Required column not found, or a date cell that cannot be parsed
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// A model rejected or could not satisfy the requested horizon
    #[error("Forecasting error ({model}, horizon {horizon}): {reason}")]
    ForecastError {
        /// Name of the model that failed
        model: String,
        /// Offending horizon, in periods
        horizon: usize,
        /// Why the model refused
        reason: String,
    },

    /// Forecasts from the two adapters did not line up on timestamps
    #[error("Merge error: expected {expected} aligned forecast rows, found {actual}")]
    MergeError {
        /// Requested number of periods
        expected: usize,
        /// Rows present in both forecasts
        actual: usize,
    },

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Model artifact present but unusable
    #[error("Invalid artifact {}: {reason}", path.display())]
    InvalidArtifact {
        /// Artifact location
        path: PathBuf,
        /// What is wrong with it
        reason: String,
    },

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from JSON (de)serialization
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Error from CSV rendering
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, DashboardError>;

impl From<polars::prelude::PolarsError> for DashboardError {
    fn from(err: polars::prelude::PolarsError) -> Self {
        DashboardError::PolarsError(err.to_string())
    }
}

impl DashboardError {
    /// Shorthand for a missing file or artifact
    pub fn missing(what: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        DashboardError::MissingResourceError {
            what: what.into(),
            path: path.into(),
        }
    }

    /// Shorthand for a model refusing a horizon
    pub fn forecast(model: impl Into<String>, horizon: usize, reason: impl Into<String>) -> Self {
        DashboardError::ForecastError {
            model: model.into(),
            horizon,
            reason: reason.into(),
        }
    }

    /// True for errors that must stop the program before any interaction
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DashboardError::MissingResourceError { .. }
                | DashboardError::SchemaError(_)
                | DashboardError::InvalidArtifact { .. }
                | DashboardError::IoError(_)
                | DashboardError::PolarsError(_)
        )
    }
}
