//! Dashboard configuration

use crate::error::{DashboardError, Result};
use crate::models::arima::DEFAULT_ALPHA;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Resource locations and request limits.
///
/// Every field has a default, so a config file only needs the keys it
/// changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Historical series CSV
    pub data_file: PathBuf,
    /// Prophet artifact (JSON)
    pub prophet_artifact: PathBuf,
    /// ARIMA artifact (JSON)
    pub arima_artifact: PathBuf,
    /// Smallest horizon count accepted from the user
    pub min_count: u32,
    /// Largest horizon count accepted from the user
    pub max_count: u32,
    /// Significance level of the ARIMA interval
    pub arima_alpha: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/UNRATE.csv"),
            prophet_artifact: PathBuf::from("trained_models/prophet_model.json"),
            arima_artifact: PathBuf::from("trained_models/arima_model.json"),
            min_count: 1,
            max_count: 120,
            arima_alpha: DEFAULT_ALPHA,
        }
    }
}

impl DashboardConfig {
    /// Load a configuration file, filling absent keys with defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DashboardError::missing("configuration file", path));
        }

        let config: Self = serde_json::from_str(&fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the request limits
    pub fn validate(&self) -> Result<()> {
        if self.min_count == 0 || self.min_count > self.max_count {
            return Err(DashboardError::InvalidParameter(format!(
                "Horizon bounds must satisfy 1 <= min_count <= max_count, got {}..={}",
                self.min_count, self.max_count
            )));
        }
        if self.arima_alpha <= 0.0 || self.arima_alpha >= 1.0 {
            return Err(DashboardError::InvalidParameter(format!(
                "arima_alpha must be between 0 and 1, got {}",
                self.arima_alpha
            )));
        }
        Ok(())
    }
}
