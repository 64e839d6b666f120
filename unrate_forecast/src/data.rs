//! Historical series loading and schema normalization

use crate::error::{DashboardError, Result};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info};

/// Canonical columns of a historical series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CanonicalField {
    /// Observation date
    Date,
    /// Observed rate
    Value,
}

impl CanonicalField {
    /// Field name used in error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Date => "date",
            CanonicalField::Value => "value",
        }
    }
}

/// Accepted upper-case aliases for each canonical field
pub const COLUMN_ALIASES: &[(CanonicalField, &[&str])] = &[
    (CanonicalField::Date, &["DATE", "OBSERVATION_DATE"]),
    (CanonicalField::Value, &["UNRATE", "VALUE"]),
];

/// Source column names chosen for the canonical fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumns {
    /// Column holding observation dates
    pub date: String,
    /// Column holding observed values
    pub value: String,
}

/// Resolve the date and value columns among `names`, case-insensitively.
///
/// The first column, in file order, that matches an alias wins.
pub fn resolve_columns<S: AsRef<str>>(names: &[S]) -> Result<ResolvedColumns> {
    let names: Vec<&str> = names.iter().map(|name| name.as_ref()).collect();

    let find = |field: CanonicalField| -> Result<String> {
        let aliases: &[&str] = COLUMN_ALIASES
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, aliases)| *aliases)
            .unwrap_or(&[]);

        names
            .iter()
            .find(|name| aliases.contains(&name.trim().to_uppercase().as_str()))
            .map(|name| name.to_string())
            .ok_or_else(|| {
                DashboardError::SchemaError(format!(
                    "No {} column found (accepted: {}); columns present: [{}]",
                    field.as_str(),
                    aliases.join(", "),
                    names.join(", ")
                ))
            })
    };

    Ok(ResolvedColumns {
        date: find(CanonicalField::Date)?,
        value: find(CanonicalField::Value)?,
    })
}

/// Parse a date cell. Accepts a handful of common layouts; anything else is
/// rejected rather than guessed at.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(stamp.date());
        }
    }
    // Year-month only
    NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d").ok()
}

/// A single historical observation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Observation date
    pub date: NaiveDate,
    /// Observed rate, in percent
    pub value: f64,
}

/// Historical series, sorted ascending by date. Never empty.
#[derive(Debug, Clone)]
pub struct HistoricalSeries {
    observations: Vec<Observation>,
}

impl HistoricalSeries {
    /// Build a series from raw observations, sorting them by date
    pub fn new(mut observations: Vec<Observation>) -> Result<Self> {
        if observations.is_empty() {
            return Err(DashboardError::DataError(
                "Historical series has no usable observations".to_string(),
            ));
        }
        observations.sort_by_key(|o| o.date);

        Ok(Self { observations })
    }

    /// Observations in ascending date order
    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    /// Observation dates
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    /// Observed values
    pub fn values(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.value).collect()
    }

    /// Forecast origin: the latest observation date
    pub fn last_date(&self) -> NaiveDate {
        // Sorted and non-empty
        self.observations[self.observations.len() - 1].date
    }

    /// Earliest observation date
    pub fn first_date(&self) -> NaiveDate {
        self.observations[0].date
    }

    /// Number of observations
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Loads raw tables and normalizes them into a `HistoricalSeries`
#[derive(Debug)]
pub struct SchemaNormalizer;

impl SchemaNormalizer {
    /// Load and normalize a CSV file
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<HistoricalSeries> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let df = CsvReader::new(file)
            .infer_schema(None)
            .has_header(true)
            .finish()?;

        info!(path = %path.display(), rows = df.height(), "loaded historical data");
        Self::from_dataframe(&df)
    }

    /// Normalize an in-memory DataFrame
    pub fn from_dataframe(df: &DataFrame) -> Result<HistoricalSeries> {
        let columns = resolve_columns(&df.get_column_names())?;
        debug!(date = %columns.date, value = %columns.value, "resolved columns");

        let dates = df.column(&columns.date)?.cast(&DataType::Utf8)?;
        let values = df.column(&columns.value)?.cast(&DataType::Float64)?;

        let mut observations = Vec::with_capacity(df.height());
        let mut dropped = 0usize;

        for (row, (date, value)) in dates.utf8()?.into_iter().zip(values.f64()?).enumerate() {
            let (raw_date, value) = match (date, value) {
                (Some(d), Some(v)) if !d.trim().is_empty() && v.is_finite() => (d, v),
                _ => {
                    dropped += 1;
                    continue;
                }
            };

            let date = parse_date(raw_date).ok_or_else(|| {
                DashboardError::SchemaError(format!(
                    "Unparseable date '{}' in column '{}' at row {}",
                    raw_date,
                    columns.date,
                    row + 1
                ))
            })?;

            observations.push(Observation { date, value });
        }

        if dropped > 0 {
            debug!(dropped, "dropped rows with a missing date or value");
        }

        HistoricalSeries::new(observations)
    }
}
