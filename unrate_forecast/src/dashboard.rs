//! Startup state and the per-request forecast pipeline

use crate::config::DashboardConfig;
use crate::data::{HistoricalSeries, SchemaNormalizer};
use crate::error::{DashboardError, Result};
use crate::merge::{merge_forecasts, MergedForecastTable};
use crate::models::{ArimaAdapter, ArimaModel, ForecastAdapter, ProphetAdapter};
use crate::presentation::{assemble_chart, ChartView, IntervalWidths, TableView};
use std::fmt;
use std::str::FromStr;
use tracing::info;

/// Unit of a horizon request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HorizonUnit {
    /// Count is a number of months
    Month,
    /// Count is a number of years
    Year,
}

impl FromStr for HorizonUnit {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "m" | "month" | "months" => Ok(HorizonUnit::Month),
            "y" | "year" | "years" => Ok(HorizonUnit::Year),
            other => Err(DashboardError::InvalidParameter(format!(
                "Unknown horizon unit '{}', expected month or year",
                other
            ))),
        }
    }
}

impl fmt::Display for HorizonUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HorizonUnit::Month => write!(f, "month"),
            HorizonUnit::Year => write!(f, "year"),
        }
    }
}

/// A user's choice of horizon
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HorizonRequest {
    /// Number of units
    pub count: u32,
    /// Month or year
    pub unit: HorizonUnit,
}

impl HorizonRequest {
    /// Create a new request
    pub fn new(count: u32, unit: HorizonUnit) -> Self {
        Self { count, unit }
    }

    /// Parse `"<count> [unit]"`, e.g. `"3 months"` or `"1 year"`. The unit
    /// defaults to months.
    pub fn parse(input: &str) -> Result<Self> {
        let mut parts = input.split_whitespace();
        let count = parts
            .next()
            .ok_or_else(|| DashboardError::InvalidParameter("Empty horizon request".to_string()))?;
        let count: u32 = count.parse().map_err(|_| {
            DashboardError::InvalidParameter(format!("Horizon count '{}' is not a number", count))
        })?;
        let unit = match parts.next() {
            Some(unit) => unit.parse()?,
            None => HorizonUnit::Month,
        };
        if let Some(extra) = parts.next() {
            return Err(DashboardError::InvalidParameter(format!(
                "Unexpected trailing input '{}'",
                extra
            )));
        }

        Ok(Self { count, unit })
    }

    /// Number of monthly periods to forecast
    pub fn periods(&self) -> usize {
        match self.unit {
            HorizonUnit::Month => self.count as usize,
            HorizonUnit::Year => self.count as usize * 12,
        }
    }

    /// Check the count against the configured limits
    pub fn validate(&self, config: &DashboardConfig) -> Result<()> {
        if self.count < config.min_count || self.count > config.max_count {
            return Err(DashboardError::InvalidParameter(format!(
                "Horizon count must be between {} and {}, got {}",
                config.min_count, config.max_count, self.count
            )));
        }
        Ok(())
    }
}

impl fmt::Display for HorizonRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plural = if self.count == 1 { "" } else { "s" };
        write!(f, "{} {}{}", self.count, self.unit, plural)
    }
}

/// Result of one forecast run, ready for display
#[derive(Debug, Clone)]
pub struct DashboardView {
    /// Request that produced the view
    pub request: HorizonRequest,
    /// Resolved number of monthly periods
    pub periods: usize,
    /// Joined forecasts
    pub merged: MergedForecastTable,
    /// Table view
    pub table: TableView,
    /// Chart view
    pub chart: ChartView,
}

/// Immutable state built once at startup
#[derive(Debug)]
pub struct AppState {
    config: DashboardConfig,
    series: HistoricalSeries,
    model_a: Box<dyn ForecastAdapter>,
    model_b: Box<dyn ForecastAdapter>,
}

impl AppState {
    /// Assemble state from already-loaded parts
    pub fn new(
        config: DashboardConfig,
        series: HistoricalSeries,
        model_a: Box<dyn ForecastAdapter>,
        model_b: Box<dyn ForecastAdapter>,
    ) -> Self {
        Self {
            config,
            series,
            model_a,
            model_b,
        }
    }

    /// Load the historical series and both model artifacts.
    ///
    /// Any error here is fatal: the caller must not offer interaction.
    pub fn load(config: DashboardConfig) -> Result<Self> {
        config.validate()?;

        if !config.data_file.exists() {
            return Err(DashboardError::missing("historical data file", &config.data_file));
        }
        let series = SchemaNormalizer::from_csv(&config.data_file)?;

        for (what, path) in [
            ("Prophet model artifact", &config.prophet_artifact),
            ("ARIMA model artifact", &config.arima_artifact),
        ] {
            if !path.exists() {
                return Err(DashboardError::missing(what, path));
            }
        }
        let prophet = ProphetAdapter::from_json_file(&config.prophet_artifact)?;
        let arima = ArimaAdapter::with_alpha(
            ArimaModel::from_json_file(&config.arima_artifact)?,
            config.arima_alpha,
        )?;

        info!(
            observations = series.len(),
            first = %series.first_date(),
            last = %series.last_date(),
            arima = %arima.model().name(),
            "dashboard state loaded"
        );

        Ok(Self::new(config, series, Box::new(prophet), Box::new(arima)))
    }

    /// Configuration in effect
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Historical series
    pub fn series(&self) -> &HistoricalSeries {
        &self.series
    }

    /// Run both models for the request and assemble the views
    pub fn run(&self, request: HorizonRequest) -> Result<DashboardView> {
        request.validate(&self.config)?;
        let periods = request.periods();
        let last_date = self.series.last_date();
        info!(%request, periods, %last_date, "running forecast");

        let forecast_a = self.model_a.forecast(periods, last_date)?;
        let forecast_b = self.model_b.forecast(periods, last_date)?;
        let merged = merge_forecasts(&forecast_a, &forecast_b, last_date, periods)?;

        let table = TableView::from_merged(&merged);
        let chart = assemble_chart(
            &self.series,
            &merged,
            IntervalWidths {
                a: self.model_a.interval_width(),
                b: self.model_b.interval_width(),
            },
        )?;

        Ok(DashboardView {
            request,
            periods,
            merged,
            table,
            chart,
        })
    }
}

/// Interactive session holding the currently displayed view
#[derive(Debug)]
pub struct Dashboard<'a> {
    state: &'a AppState,
    current: Option<DashboardView>,
}

impl<'a> Dashboard<'a> {
    /// Start a session with nothing displayed
    pub fn new(state: &'a AppState) -> Self {
        Self {
            state,
            current: None,
        }
    }

    /// Run a request. On success the new view replaces the displayed one;
    /// on failure the displayed view is left as it was.
    pub fn submit(&mut self, request: HorizonRequest) -> Result<&DashboardView> {
        let view = self.state.run(request)?;
        Ok(self.current.insert(view))
    }

    /// Currently displayed view, if any run has succeeded
    pub fn current(&self) -> Option<&DashboardView> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("3 months", 3, HorizonUnit::Month)]
    #[case("1 year", 1, HorizonUnit::Year)]
    #[case("  12  ", 12, HorizonUnit::Month)]
    #[case("2 Y", 2, HorizonUnit::Year)]
    fn test_parse_request(#[case] input: &str, #[case] count: u32, #[case] unit: HorizonUnit) {
        assert_eq!(HorizonRequest::parse(input).unwrap(), HorizonRequest::new(count, unit));
    }

    #[rstest]
    #[case("")]
    #[case("three months")]
    #[case("3 weeks")]
    #[case("3 months please")]
    #[case("-1 month")]
    fn test_parse_request_rejects(#[case] input: &str) {
        assert!(HorizonRequest::parse(input).is_err());
    }

    #[test]
    fn test_periods() {
        assert_eq!(HorizonRequest::new(3, HorizonUnit::Month).periods(), 3);
        assert_eq!(HorizonRequest::new(1, HorizonUnit::Year).periods(), 12);
        assert_eq!(HorizonRequest::new(10, HorizonUnit::Year).periods(), 120);
    }

    #[test]
    fn test_validate_bounds() {
        let config = DashboardConfig::default();
        assert!(HorizonRequest::new(1, HorizonUnit::Month).validate(&config).is_ok());
        assert!(HorizonRequest::new(120, HorizonUnit::Year).validate(&config).is_ok());
        assert!(HorizonRequest::new(0, HorizonUnit::Month).validate(&config).is_err());
        assert!(HorizonRequest::new(121, HorizonUnit::Month).validate(&config).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(HorizonRequest::new(1, HorizonUnit::Year).to_string(), "1 year");
        assert_eq!(HorizonRequest::new(3, HorizonUnit::Month).to_string(), "3 months");
    }
}
