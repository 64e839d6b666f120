//! Alignment of two model forecasts on their timestamps

use crate::error::{DashboardError, Result};
use crate::models::{ForecastRow, ModelForecast};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

/// One merged period: both models' estimates for the same month
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MergedRow {
    /// Month start
    pub date: NaiveDate,
    /// Model A point estimate
    pub point_a: f64,
    /// Model A lower bound
    pub lower_a: f64,
    /// Model A upper bound
    pub upper_a: f64,
    /// Model B point estimate
    pub point_b: f64,
    /// Model B lower bound
    pub lower_b: f64,
    /// Model B upper bound
    pub upper_b: f64,
}

impl MergedRow {
    fn join(a: &ForecastRow, b: &ForecastRow) -> Self {
        Self {
            date: a.date,
            point_a: a.point,
            lower_a: a.lower,
            upper_a: a.upper,
            point_b: b.point,
            lower_b: b.lower,
            upper_b: b.upper,
        }
    }
}

/// Forecasts from two models joined on date, ascending
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedForecastTable {
    /// Name of model A
    pub model_a: String,
    /// Name of model B
    pub model_b: String,
    /// Last observed date; every row lies strictly after it
    pub origin: NaiveDate,
    /// Joined rows
    pub rows: Vec<MergedRow>,
}

impl MergedForecastTable {
    /// Merged dates
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.rows.iter().map(|r| r.date).collect()
    }

    /// Number of merged periods
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if the table has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Inner-join two forecasts on exact date equality.
///
/// Only dates after `last_date` are kept. Both forecasts are generated from
/// the same origin and horizon, so anything other than `periods` joined rows
/// means their timestamps disagree and is reported as a `MergeError`.
pub fn merge_forecasts(
    a: &ModelForecast,
    b: &ModelForecast,
    last_date: NaiveDate,
    periods: usize,
) -> Result<MergedForecastTable> {
    let by_date: BTreeMap<NaiveDate, &ForecastRow> =
        b.rows().iter().map(|row| (row.date, row)).collect();

    let rows: Vec<MergedRow> = a
        .rows()
        .iter()
        .filter(|row| row.date > last_date)
        .filter_map(|row| by_date.get(&row.date).map(|other| MergedRow::join(row, other)))
        .collect();

    debug!(
        model_a = a.model(),
        model_b = b.model(),
        rows_a = a.len(),
        rows_b = b.len(),
        merged = rows.len(),
        "merged forecasts"
    );

    if rows.len() != periods {
        return Err(DashboardError::MergeError {
            expected: periods,
            actual: rows.len(),
        });
    }

    Ok(MergedForecastTable {
        model_a: a.model().to_string(),
        model_b: b.model().to_string(),
        origin: last_date,
        rows,
    })
}
