//! ARIMA models for time series forecasting
//!
//! The model is fitted offline; the artifact carries the estimated
//! coefficients together with the tail of the training series and residuals,
//! which is everything the recursive forecast needs.

use crate::error::{DashboardError, Result};
use crate::models::{check_horizon, read_artifact, ForecastAdapter, ForecastRow, ModelForecast};
use crate::utils::month_starts_after;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::path::Path;
use tracing::debug;

/// Default significance level for ARIMA intervals (80% nominal width)
pub const DEFAULT_ALPHA: f64 = 0.2;

fn default_max_horizon() -> usize {
    1440
}

/// Pre-trained ARIMA(p,d,q) model (AutoRegressive Integrated Moving Average)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaModel {
    /// Fitted AR coefficients (phi_1..phi_p)
    #[serde(default)]
    pub ar: Vec<f64>,
    /// Fitted MA coefficients (theta_1..theta_q)
    #[serde(default)]
    pub ma: Vec<f64>,
    /// Differencing order (d)
    pub d: usize,
    /// Intercept of the differenced process
    #[serde(default)]
    pub intercept: f64,
    /// Innovation variance
    pub sigma2: f64,
    /// Last observations of the training series, oldest first
    pub endog_tail: Vec<f64>,
    /// Last in-sample residuals, oldest first
    #[serde(default)]
    pub resid_tail: Vec<f64>,
    /// Longest horizon the model will forecast
    #[serde(default = "default_max_horizon")]
    pub max_horizon: usize,
}

/// Point forecasts and forecast error variances from an ARIMA model
#[derive(Debug, Clone)]
pub struct ArimaForecast {
    /// Mean forecast per step
    pub predicted_mean: Vec<f64>,
    /// Forecast error variance per step
    pub variance: Vec<f64>,
}

impl ArimaForecast {
    /// Symmetric normal confidence intervals at significance `alpha`
    pub fn conf_int(&self, alpha: f64) -> Result<Vec<(f64, f64)>> {
        if alpha <= 0.0 || alpha >= 1.0 {
            return Err(DashboardError::InvalidParameter(format!(
                "Alpha must be between 0 and 1, got {}",
                alpha
            )));
        }

        let normal = Normal::new(0.0, 1.0)
            .map_err(|e| DashboardError::InvalidParameter(e.to_string()))?;
        let z = normal.inverse_cdf(1.0 - alpha / 2.0);

        Ok(self
            .predicted_mean
            .iter()
            .zip(&self.variance)
            .map(|(mean, var)| {
                let margin = z * var.sqrt();
                (mean - margin, mean + margin)
            })
            .collect())
    }
}

impl ArimaModel {
    /// Load a model artifact from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let model: Self = read_artifact(path.as_ref())?;
        model
            .validate()
            .map_err(|reason| DashboardError::InvalidArtifact {
                path: path.as_ref().to_path_buf(),
                reason,
            })?;
        Ok(model)
    }

    /// Check internal consistency of the fitted parameters
    pub fn validate(&self) -> std::result::Result<(), String> {
        if !(self.sigma2 >= 0.0) {
            return Err(format!("sigma2 must be non-negative, got {}", self.sigma2));
        }
        let needed = (self.d + self.ar.len()).max(1);
        if self.endog_tail.len() < needed {
            return Err(format!(
                "endog_tail holds {} values, {} needs at least {}",
                self.endog_tail.len(),
                self.name(),
                needed
            ));
        }
        if self.resid_tail.len() < self.ma.len() {
            return Err(format!(
                "resid_tail holds {} values, {} needs at least {}",
                self.resid_tail.len(),
                self.name(),
                self.ma.len()
            ));
        }
        if self.max_horizon == 0 {
            return Err("max_horizon must be positive".to_string());
        }
        Ok(())
    }

    /// `validate` as a crate error, for models built in code
    fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|reason| DashboardError::InvalidParameter(format!("{}: {}", self.name(), reason)))
    }

    /// Model order as "ARIMA(p,d,q)"
    pub fn name(&self) -> String {
        format!("ARIMA({},{},{})", self.ar.len(), self.d, self.ma.len())
    }

    /// Forecast `steps` periods past the end of the training data
    pub fn get_forecast(&self, steps: usize) -> Result<ArimaForecast> {
        self.check()?;
        check_horizon(&self.name(), steps, self.max_horizon)?;

        // Difference down to the stationary scale, remembering the last level
        // at each order for integration.
        let mut levels = Vec::with_capacity(self.d);
        let mut series = self.endog_tail.clone();
        for _ in 0..self.d {
            levels.push(series[series.len() - 1]);
            series = difference(&series);
        }

        let mut history = series;
        let mut errors = self.resid_tail.clone();
        let mut forecasts = Vec::with_capacity(steps);

        for _ in 0..steps {
            let mut value = self.intercept;
            for (i, phi) in self.ar.iter().enumerate() {
                value += phi * history[history.len() - 1 - i];
            }
            for (j, theta) in self.ma.iter().enumerate() {
                value += theta * errors[errors.len() - 1 - j];
            }

            history.push(value);
            // Future shocks have zero expectation
            errors.push(0.0);
            forecasts.push(value);
        }

        for level in levels.iter().rev() {
            let mut acc = *level;
            forecasts = forecasts
                .iter()
                .map(|step| {
                    acc += step;
                    acc
                })
                .collect();
        }

        let variance = self.forecast_variance(steps);
        debug!(model = %self.name(), steps, "computed ARIMA forecast");

        Ok(ArimaForecast {
            predicted_mean: forecasts,
            variance,
        })
    }

    /// Cumulative forecast error variance from the psi-weights of the
    /// integrated process
    fn forecast_variance(&self, steps: usize) -> Vec<f64> {
        // phi*(B) = phi(B) * (1 - B)^d
        let mut poly = vec![1.0];
        poly.extend(self.ar.iter().map(|phi| -phi));
        for _ in 0..self.d {
            let mut next = vec![0.0; poly.len() + 1];
            for (i, coef) in poly.iter().enumerate() {
                next[i] += coef;
                next[i + 1] -= coef;
            }
            poly = next;
        }
        let phi_star: Vec<f64> = poly[1..].iter().map(|c| -c).collect();

        let mut psi = Vec::with_capacity(steps);
        psi.push(1.0);
        for j in 1..steps {
            let mut weight = self.ma.get(j - 1).copied().unwrap_or(0.0);
            for i in 1..=j.min(phi_star.len()) {
                weight += phi_star[i - 1] * psi[j - i];
            }
            psi.push(weight);
        }

        let mut total = 0.0;
        psi.iter()
            .map(|w| {
                total += w * w;
                self.sigma2 * total
            })
            .collect()
    }
}

/// First difference of a series
fn difference(series: &[f64]) -> Vec<f64> {
    series.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Adapter exposing an ARIMA artifact through the common forecast contract
#[derive(Debug, Clone)]
pub struct ArimaAdapter {
    /// Pre-trained model
    model: ArimaModel,
    /// Interval significance level
    alpha: f64,
}

impl ArimaAdapter {
    /// Wrap a model with the default 80% interval
    pub fn new(model: ArimaModel) -> Result<Self> {
        Self::with_alpha(model, DEFAULT_ALPHA)
    }

    /// Wrap a model with a custom significance level
    pub fn with_alpha(model: ArimaModel, alpha: f64) -> Result<Self> {
        if alpha <= 0.0 || alpha >= 1.0 {
            return Err(DashboardError::InvalidParameter(format!(
                "Alpha must be between 0 and 1, got {}",
                alpha
            )));
        }
        model.check()?;
        Ok(Self { model, alpha })
    }

    /// Load the artifact and wrap it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(ArimaModel::from_json_file(path)?)
    }

    /// Underlying model
    pub fn model(&self) -> &ArimaModel {
        &self.model
    }
}

impl ForecastAdapter for ArimaAdapter {
    fn forecast(&self, periods: usize, last_date: NaiveDate) -> Result<ModelForecast> {
        check_horizon(self.name(), periods, self.model.max_horizon)?;

        let forecast = self.model.get_forecast(periods)?;
        let intervals = forecast.conf_int(self.alpha)?;
        let dates = month_starts_after(last_date, periods)?;

        let rows = dates
            .into_iter()
            .zip(forecast.predicted_mean)
            .zip(intervals)
            .map(|((date, point), (lower, upper))| ForecastRow {
                date,
                point,
                lower,
                upper,
            })
            .collect();

        ModelForecast::new(self.name(), rows)
    }

    fn interval_width(&self) -> f64 {
        1.0 - self.alpha
    }

    fn name(&self) -> &str {
        "ARIMA"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn random_walk() -> ArimaModel {
        ArimaModel {
            ar: Vec::new(),
            ma: Vec::new(),
            d: 1,
            intercept: 0.0,
            sigma2: 0.04,
            endog_tail: vec![3.9, 4.0],
            resid_tail: Vec::new(),
            max_horizon: 1440,
        }
    }

    #[test]
    fn test_random_walk_forecast() {
        let fc = random_walk().get_forecast(4).unwrap();
        for (h, (mean, var)) in fc.predicted_mean.iter().zip(&fc.variance).enumerate() {
            assert_relative_eq!(*mean, 4.0, epsilon = 1e-12);
            assert_relative_eq!(*var, 0.04 * (h + 1) as f64, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_ar1_forecast_decays() {
        let model = ArimaModel {
            ar: vec![0.5],
            ma: Vec::new(),
            d: 0,
            intercept: 1.0,
            sigma2: 1.0,
            endog_tail: vec![4.0],
            resid_tail: Vec::new(),
            max_horizon: 10,
        };
        let fc = model.get_forecast(3).unwrap();
        assert_relative_eq!(fc.predicted_mean[0], 3.0);
        assert_relative_eq!(fc.predicted_mean[1], 2.5);
        assert_relative_eq!(fc.predicted_mean[2], 2.25);
        assert_relative_eq!(fc.variance[1], 1.25);
    }

    #[test]
    fn test_ma_term_uses_residuals() {
        let model = ArimaModel {
            ar: Vec::new(),
            ma: vec![0.5],
            d: 0,
            intercept: 4.0,
            sigma2: 1.0,
            endog_tail: vec![4.2],
            resid_tail: vec![0.2],
            max_horizon: 10,
        };
        let fc = model.get_forecast(2).unwrap();
        assert_relative_eq!(fc.predicted_mean[0], 4.1);
        assert_relative_eq!(fc.predicted_mean[1], 4.0);
    }

    #[test]
    fn test_second_difference_extrapolates_slope() {
        let model = ArimaModel {
            ar: Vec::new(),
            ma: Vec::new(),
            d: 2,
            intercept: 0.0,
            sigma2: 1.0,
            endog_tail: vec![1.0, 2.0, 4.0],
            resid_tail: Vec::new(),
            max_horizon: 10,
        };
        let fc = model.get_forecast(3).unwrap();

        // Last first difference is 2, so the levels keep climbing by 2
        assert_relative_eq!(fc.predicted_mean[0], 6.0, epsilon = 1e-12);
        assert_relative_eq!(fc.predicted_mean[1], 8.0, epsilon = 1e-12);
        assert_relative_eq!(fc.predicted_mean[2], 10.0, epsilon = 1e-12);
        // psi_j = j + 1 for (1 - B)^2
        assert_relative_eq!(fc.variance[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(fc.variance[1], 5.0, epsilon = 1e-12);
        assert_relative_eq!(fc.variance[2], 14.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ma2_forecast_and_variance() {
        let model = ArimaModel {
            ar: Vec::new(),
            ma: vec![0.5, 0.25],
            d: 0,
            intercept: 4.0,
            sigma2: 2.0,
            endog_tail: vec![4.0],
            resid_tail: vec![0.4, 0.8],
            max_horizon: 10,
        };
        let fc = model.get_forecast(4).unwrap();

        assert_relative_eq!(fc.predicted_mean[0], 4.5, epsilon = 1e-12);
        assert_relative_eq!(fc.predicted_mean[1], 4.2, epsilon = 1e-12);
        assert_relative_eq!(fc.predicted_mean[2], 4.0, epsilon = 1e-12);
        assert_relative_eq!(fc.predicted_mean[3], 4.0, epsilon = 1e-12);
        // psi = [1, 0.5, 0.25, 0]; variance stops growing past lag q
        assert_relative_eq!(fc.variance[0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(fc.variance[1], 2.5, epsilon = 1e-12);
        assert_relative_eq!(fc.variance[2], 2.625, epsilon = 1e-12);
        assert_relative_eq!(fc.variance[3], 2.625, epsilon = 1e-12);
    }

    #[test]
    fn test_conf_int_width() {
        let fc = random_walk().get_forecast(1).unwrap();
        let (lower, upper) = fc.conf_int(0.2).unwrap()[0];
        // z(0.9) * sqrt(0.04)
        assert_relative_eq!(upper - 4.0, 1.2815515655446004 * 0.2, epsilon = 1e-6);
        assert_relative_eq!(4.0 - lower, upper - 4.0, epsilon = 1e-12);
        assert!(fc.conf_int(1.0).is_err());
    }

    #[test]
    fn test_validate_rejects_short_tail() {
        let mut model = random_walk();
        model.ar = vec![0.3, 0.2];
        assert!(model.validate().is_err());
    }

    #[test]
    fn test_horizon_limit() {
        let mut model = random_walk();
        model.max_horizon = 5;
        assert!(matches!(
            model.get_forecast(6),
            Err(DashboardError::ForecastError { horizon: 6, .. })
        ));
        assert!(model.get_forecast(0).is_err());
    }
}
