//! Fixtures shared by the integration tests
#![allow(dead_code)]

use chrono::NaiveDate;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use unrate_forecast::models::{ArimaModel, ProphetModel};
use unrate_forecast::utils::month_starts_after;
use unrate_forecast::DashboardConfig;

pub fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Write a monthly CSV with `n` rows starting at `start`
pub fn write_series(dir: &Path, header: &str, start: NaiveDate, n: usize) -> PathBuf {
    let mut body = format!("{}\n", header);
    let mut date = start;
    for i in 0..n {
        body.push_str(&format!("{},{:.1}\n", date, 4.0 + (i % 5) as f64 * 0.1));
        date = month_starts_after(date, 1).unwrap()[0];
    }

    let path = dir.join("series.csv");
    fs::write(&path, body).unwrap();
    path
}

/// Write raw CSV text
pub fn write_csv(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

pub fn write_json<T: Serialize>(dir: &Path, name: &str, value: &T) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

pub fn prophet_model(history_start: NaiveDate, history_end: NaiveDate) -> ProphetModel {
    ProphetModel {
        history_start,
        history_end,
        y_scale: 5.0,
        k: -0.05,
        m: 0.85,
        changepoints_t: vec![0.25, 0.5, 0.75],
        delta: vec![0.02, -0.01, 0.03],
        yearly_order: 1,
        beta: vec![0.005, -0.004],
        sigma_obs: 0.02,
        interval_width: 0.8,
        uncertainty_samples: 200,
        seed: 11,
        max_horizon: 1440,
    }
}

pub fn arima_model() -> ArimaModel {
    ArimaModel {
        ar: vec![0.4],
        ma: vec![0.2],
        d: 1,
        intercept: 0.0,
        sigma2: 0.03,
        endog_tail: vec![4.1, 4.2, 4.0],
        resid_tail: vec![-0.05],
        max_horizon: 1440,
    }
}

/// Data file and both artifacts for `n` monthly observations from `start`;
/// the Prophet training window matches the data.
pub fn fixture_config(dir: &Path, start: NaiveDate, n: usize) -> DashboardConfig {
    let data_file = write_series(dir, "DATE,UNRATE", start, n);
    let end = month_starts_after(start, n - 1).unwrap().pop().unwrap_or(start);

    DashboardConfig {
        data_file,
        prophet_artifact: write_json(dir, "prophet.json", &prophet_model(start, end)),
        arima_artifact: write_json(dir, "arima.json", &arima_model()),
        ..DashboardConfig::default()
    }
}
