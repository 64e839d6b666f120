//! Forecast adapters over pre-trained models

use crate::error::{DashboardError, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Debug;
use std::fs;
use std::path::Path;

/// One forecasted period
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ForecastRow {
    /// First day of the forecasted month
    pub date: NaiveDate,
    /// Point estimate
    pub point: f64,
    /// Lower interval bound
    pub lower: f64,
    /// Upper interval bound
    pub upper: f64,
}

/// Forecast produced by a single model
#[derive(Debug, Clone)]
pub struct ModelForecast {
    /// Model name
    model: String,
    /// Rows, strictly ascending by date
    rows: Vec<ForecastRow>,
}

impl ModelForecast {
    /// Create a new forecast, checking ordering and bound consistency
    pub fn new(model: impl Into<String>, rows: Vec<ForecastRow>) -> Result<Self> {
        let model = model.into();
        let horizon = rows.len();

        if let Some(pair) = rows.windows(2).find(|pair| pair[0].date >= pair[1].date) {
            return Err(DashboardError::forecast(
                model,
                horizon,
                format!(
                    "timestamps not strictly increasing ({} then {})",
                    pair[0].date, pair[1].date
                ),
            ));
        }

        if let Some(row) = rows
            .iter()
            .find(|r| !(r.lower <= r.point && r.point <= r.upper))
        {
            return Err(DashboardError::forecast(
                model,
                horizon,
                format!(
                    "inconsistent interval at {}: {} <= {} <= {} does not hold",
                    row.date, row.lower, row.point, row.upper
                ),
            ));
        }

        Ok(Self { model, rows })
    }

    /// Name of the model that produced the forecast
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Forecast rows
    pub fn rows(&self) -> &[ForecastRow] {
        &self.rows
    }

    /// Number of forecasted periods
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the forecast has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Uniform forecasting contract over the pre-trained model families
pub trait ForecastAdapter: Debug {
    /// Forecast `periods` monthly values after `last_date`
    fn forecast(&self, periods: usize, last_date: NaiveDate) -> Result<ModelForecast>;

    /// Nominal interval mass, fixed for the lifetime of the adapter
    fn interval_width(&self) -> f64;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Reject a horizon outside `1..=max_horizon`
pub(crate) fn check_horizon(model: &str, periods: usize, max_horizon: usize) -> Result<()> {
    if periods == 0 {
        return Err(DashboardError::forecast(
            model,
            periods,
            "horizon must be at least one period",
        ));
    }
    if periods > max_horizon {
        return Err(DashboardError::forecast(
            model,
            periods,
            format!("horizon exceeds the model limit of {} periods", max_horizon),
        ));
    }
    Ok(())
}

/// Read and deserialize a JSON model artifact
pub(crate) fn read_artifact<T, P>(path: P) -> Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(DashboardError::missing("model artifact", path));
    }

    let raw = fs::read_to_string(path)?;
    serde_json::from_str(&raw).map_err(|e| DashboardError::InvalidArtifact {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

pub mod arima;
pub mod prophet;

pub use arima::{ArimaAdapter, ArimaModel};
pub use prophet::{ProphetAdapter, ProphetModel};
