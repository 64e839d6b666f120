//! Utility functions for the unrate_forecast crate

use crate::error::{DashboardError, Result};
use chrono::{Datelike, Months, NaiveDate};

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    // Day 1 exists in every month
    date.with_day(1).unwrap_or(date)
}

/// Create `horizon` consecutive month-start dates, beginning with the month
/// immediately following `origin`.
///
/// Both forecast adapters build their timestamps through this function, so
/// their outputs line up on exact date equality.
pub fn month_starts_after(origin: NaiveDate, horizon: usize) -> Result<Vec<NaiveDate>> {
    let base = month_start(origin);
    (1..=horizon)
        .map(|offset| {
            u32::try_from(offset)
                .ok()
                .and_then(|months| base.checked_add_months(Months::new(months)))
                .ok_or_else(|| {
                    DashboardError::InvalidParameter(format!(
                        "Cannot step {} months past {}",
                        offset, origin
                    ))
                })
        })
        .collect()
}

/// Month-start dates from `start` through `end`, inclusive
pub fn month_range(start: NaiveDate, end: NaiveDate) -> Result<Vec<NaiveDate>> {
    let first = month_start(start);
    let last = month_start(end);
    if last < first {
        return Err(DashboardError::InvalidParameter(format!(
            "Range end {} precedes start {}",
            end, start
        )));
    }

    let months = (last.year() - first.year()) * 12 + last.month() as i32 - first.month() as i32;
    let mut dates = vec![first];
    dates.extend(month_starts_after(first, months as usize)?);
    Ok(dates)
}

/// Days since 1970-01-01, as a float
pub fn days_since_epoch(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    (date - epoch).num_days() as f64
}

/// Linearly interpolated quantile of an ascending-sorted slice
pub fn quantile(sorted: &[f64], q: f64) -> Result<f64> {
    if sorted.is_empty() {
        return Err(DashboardError::DataError(
            "Cannot take a quantile of an empty sample".to_string(),
        ));
    }
    if !(0.0..=1.0).contains(&q) {
        return Err(DashboardError::InvalidParameter(format!(
            "Quantile must be between 0 and 1, got {}",
            q
        )));
    }

    let position = q * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let weight = position - lower as f64;

    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * weight)
}
