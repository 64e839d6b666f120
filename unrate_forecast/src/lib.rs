//! # Unrate Forecast
//!
//! Data shaping behind the US unemployment-rate forecast dashboard.
//!
//! ## Features
//!
//! - Schema normalization of historical CSV files with unknown column casing
//! - Forecast adapters over pre-trained Prophet-style and ARIMA artifacts
//! - Timestamp-aligned merging of the two forecasts
//! - Table and layered chart assembly (history, forecast lines, interval
//!   bands, forecast-origin marker)
//!
//! ## Pipeline
//!
//! Startup builds an immutable [`AppState`]: the historical series is
//! normalized once and both model artifacts are loaded. Each request then
//! runs both adapters over the same origin and horizon, merges the results
//! and produces a [`DashboardView`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use unrate_forecast::{AppState, DashboardConfig, HorizonRequest, HorizonUnit};
//!
//! let state = AppState::load(DashboardConfig::default())?;
//! let view = state.run(HorizonRequest::new(3, HorizonUnit::Month))?;
//!
//! println!("{}", view.table);
//! # Ok::<(), unrate_forecast::DashboardError>(())
//! ```

pub mod config;
pub mod dashboard;
pub mod data;
pub mod error;
pub mod merge;
pub mod models;
pub mod presentation;
pub mod utils;

// Re-export commonly used types
pub use crate::config::DashboardConfig;
pub use crate::dashboard::{AppState, Dashboard, DashboardView, HorizonRequest, HorizonUnit};
pub use crate::data::{HistoricalSeries, Observation, SchemaNormalizer};
pub use crate::error::{DashboardError, Result};
pub use crate::merge::{merge_forecasts, MergedForecastTable, MergedRow};
pub use crate::models::{ForecastAdapter, ForecastRow, ModelForecast};
pub use crate::presentation::{band_polygon, ChartView, TableView};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
