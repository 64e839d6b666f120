//! Additive trend + yearly seasonality model (Prophet-style)
//!
//! The artifact holds the MAP parameters of a piecewise-linear trend with
//! changepoints and a Fourier yearly seasonality, fitted offline. Prediction
//! runs over the training frame extended by the requested number of months;
//! intervals come from simulated trajectories with new future changepoints
//! and observation noise.

use crate::error::{DashboardError, Result};
use crate::models::{check_horizon, read_artifact, ForecastAdapter, ForecastRow, ModelForecast};
use crate::utils::{days_since_epoch, month_range, month_starts_after, quantile};
use chrono::NaiveDate;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Exp1, Poisson, StandardNormal};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::path::Path;
use tracing::{debug, warn};

/// Days per year used by the yearly Fourier terms
const YEAR_DAYS: f64 = 365.25;

fn default_interval_width() -> f64 {
    0.8
}

fn default_uncertainty_samples() -> usize {
    1000
}

fn default_max_horizon() -> usize {
    1440
}

/// Pre-trained additive trend/seasonality model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProphetModel {
    /// First month of the training data
    pub history_start: NaiveDate,
    /// Last month of the training data
    pub history_end: NaiveDate,
    /// Scale applied to the target during fitting
    pub y_scale: f64,
    /// Base growth rate
    pub k: f64,
    /// Trend offset
    pub m: f64,
    /// Changepoint locations on the scaled time axis, ascending
    #[serde(default)]
    pub changepoints_t: Vec<f64>,
    /// Rate adjustments at each changepoint
    #[serde(default)]
    pub delta: Vec<f64>,
    /// Number of yearly Fourier pairs
    #[serde(default)]
    pub yearly_order: usize,
    /// Seasonality coefficients, sin/cos interleaved
    #[serde(default)]
    pub beta: Vec<f64>,
    /// Observation noise on the scaled target
    pub sigma_obs: f64,
    /// Nominal interval mass
    #[serde(default = "default_interval_width")]
    pub interval_width: f64,
    /// Trajectories simulated for the interval
    #[serde(default = "default_uncertainty_samples")]
    pub uncertainty_samples: usize,
    /// RNG seed; fixed so repeated runs give identical bands
    #[serde(default)]
    pub seed: u64,
    /// Longest horizon the model will forecast
    #[serde(default = "default_max_horizon")]
    pub max_horizon: usize,
}

/// One predicted row of the extended frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProphetPrediction {
    /// Month start
    pub ds: NaiveDate,
    /// Point estimate
    pub yhat: f64,
    /// Lower interval bound
    pub yhat_lower: f64,
    /// Upper interval bound
    pub yhat_upper: f64,
}

impl ProphetModel {
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
        if self.history_end <= self.history_start {
            return Err(format!(
                "history_end {} must come after history_start {}",
                self.history_end, self.history_start
            ));
        }
        if self.changepoints_t.len() != self.delta.len() {
            return Err(format!(
                "{} changepoints but {} deltas",
                self.changepoints_t.len(),
                self.delta.len()
            ));
        }
        if self.changepoints_t.windows(2).any(|w| w[0] > w[1]) {
            return Err("changepoints_t must be ascending".to_string());
        }
        if self.beta.len() != 2 * self.yearly_order {
            return Err(format!(
                "yearly_order {} needs {} beta coefficients, got {}",
                self.yearly_order,
                2 * self.yearly_order,
                self.beta.len()
            ));
        }
        if !(self.sigma_obs >= 0.0) || !(self.y_scale > 0.0) {
            return Err("sigma_obs must be non-negative and y_scale positive".to_string());
        }
        if !(self.interval_width > 0.0 && self.interval_width < 1.0) {
            return Err(format!(
                "interval_width must be between 0 and 1, got {}",
                self.interval_width
            ));
        }
        if self.uncertainty_samples == 0 || self.max_horizon == 0 {
            return Err("uncertainty_samples and max_horizon must be positive".to_string());
        }
        Ok(())
    }

    /// `validate` as a crate error, for models built in code
    fn check(&self) -> Result<()> {
        self.validate()
            .map_err(|reason| DashboardError::InvalidParameter(format!("Prophet: {}", reason)))
    }

    /// Training frame extended by `periods` month starts
    pub fn make_future_frame(&self, periods: usize) -> Result<Vec<NaiveDate>> {
        check_horizon("Prophet", periods, self.max_horizon)?;

        let mut frame = month_range(self.history_start, self.history_end)?;
        frame.extend(month_starts_after(self.history_end, periods)?);
        Ok(frame)
    }

    /// Predict point values and interval bounds for an ascending frame
    pub fn predict(&self, frame: &[NaiveDate]) -> Result<Vec<ProphetPrediction>> {
        self.check()?;
        if frame.windows(2).any(|w| w[0] >= w[1]) {
            return Err(DashboardError::InvalidParameter(
                "Prediction frame must be strictly ascending".to_string(),
            ));
        }

        let t: Vec<f64> = frame.iter().map(|ds| self.scaled_time(*ds)).collect();
        let seasonal: Vec<f64> = frame.iter().map(|ds| self.yearly(*ds)).collect();

        let base_changepoints: Vec<(f64, f64)> = self
            .changepoints_t
            .iter()
            .copied()
            .zip(self.delta.iter().copied())
            .collect();
        let trend = piecewise_linear(&t, self.k, self.m, &base_changepoints);

        let samples = self.sample_trajectories(&t, &seasonal)?;

        let lower_q = (1.0 - self.interval_width) / 2.0;
        let upper_q = (1.0 + self.interval_width) / 2.0;

        let mut predictions = Vec::with_capacity(frame.len());
        let mut widened = 0usize;
        for (i, mut draws) in samples.into_iter().enumerate() {
            let yhat = (trend[i] + seasonal[i]) * self.y_scale;

            draws.sort_by(|a, b| a.total_cmp(b));
            let mut yhat_lower = quantile(&draws, lower_q)?;
            let mut yhat_upper = quantile(&draws, upper_q)?;
            if yhat_lower > yhat || yhat_upper < yhat {
                widened += 1;
                yhat_lower = yhat_lower.min(yhat);
                yhat_upper = yhat_upper.max(yhat);
            }

            predictions.push(ProphetPrediction {
                ds: frame[i],
                yhat,
                yhat_lower,
                yhat_upper,
            });
        }

        if widened > 0 {
            warn!(widened, "interval widened to contain the point estimate");
        }
        debug!(rows = predictions.len(), "computed Prophet prediction");

        Ok(predictions)
    }

    /// Time since `history_start`, with the training window mapped to [0, 1]
    fn scaled_time(&self, ds: NaiveDate) -> f64 {
        let span = (self.history_end - self.history_start).num_days() as f64;
        (ds - self.history_start).num_days() as f64 / span
    }

    /// Yearly seasonal component on the scaled target
    fn yearly(&self, ds: NaiveDate) -> f64 {
        let days = days_since_epoch(ds);
        (1..=self.yearly_order)
            .map(|i| {
                let angle = 2.0 * PI * i as f64 * days / YEAR_DAYS;
                self.beta[2 * (i - 1)] * angle.sin() + self.beta[2 * (i - 1) + 1] * angle.cos()
            })
            .sum()
    }

    /// Simulated values per frame row, one inner vector per row
    fn sample_trajectories(&self, t: &[f64], seasonal: &[f64]) -> Result<Vec<Vec<f64>>> {
        let mut rng = StdRng::seed_from_u64(self.seed);
        let t_max = t.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        // Future changepoints arrive at the historical rate, with magnitudes
        // drawn at the historical mean absolute size.
        let rate = self.changepoints_t.len() as f64 * (t_max - 1.0);
        let poisson = if rate > 0.0 {
            Some(Poisson::new(rate).map_err(|e| DashboardError::InvalidParameter(e.to_string()))?)
        } else {
            None
        };
        let scale = if self.delta.is_empty() {
            1e-8
        } else {
            self.delta.iter().map(|d| d.abs()).sum::<f64>() / self.delta.len() as f64 + 1e-8
        };

        let mut samples = vec![Vec::with_capacity(self.uncertainty_samples); t.len()];
        for _ in 0..self.uncertainty_samples {
            let mut changepoints: Vec<(f64, f64)> = self
                .changepoints_t
                .iter()
                .copied()
                .zip(self.delta.iter().copied())
                .collect();

            if let Some(poisson) = &poisson {
                let count: f64 = rng.sample(poisson);
                for _ in 0..count as usize {
                    let at = rng.gen_range(1.0..t_max);
                    let e1: f64 = rng.sample(Exp1);
                    let e2: f64 = rng.sample(Exp1);
                    changepoints.push((at, scale * (e1 - e2)));
                }
                changepoints.sort_by(|a, b| a.0.total_cmp(&b.0));
            }

            let trend = piecewise_linear(t, self.k, self.m, &changepoints);
            for (i, slot) in samples.iter_mut().enumerate() {
                let noise: f64 = rng.sample(StandardNormal);
                slot.push((trend[i] + seasonal[i] + self.sigma_obs * noise) * self.y_scale);
            }
        }

        Ok(samples)
    }
}

/// Piecewise-linear trend over ascending `t`, with `(location, delta)`
/// changepoints sorted by location
fn piecewise_linear(t: &[f64], k: f64, m: f64, changepoints: &[(f64, f64)]) -> Vec<f64> {
    let mut rate = k;
    let mut offset = m;
    let mut next = 0;

    t.iter()
        .map(|&ti| {
            while next < changepoints.len() && changepoints[next].0 <= ti {
                let (at, delta) = changepoints[next];
                rate += delta;
                offset -= at * delta;
                next += 1;
            }
            rate * ti + offset
        })
        .collect()
}

/// Adapter exposing a Prophet-style artifact through the common forecast
/// contract
#[derive(Debug, Clone)]
pub struct ProphetAdapter {
    model: ProphetModel,
}

impl ProphetAdapter {
    /// Wrap a model
    pub fn new(model: ProphetModel) -> Result<Self> {
        model.check()?;
        Ok(Self { model })
    }

    /// Load the artifact and wrap it
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::new(ProphetModel::from_json_file(path)?)
    }

    /// Underlying model
    pub fn model(&self) -> &ProphetModel {
        &self.model
    }
}

impl ForecastAdapter for ProphetAdapter {
    fn forecast(&self, periods: usize, last_date: NaiveDate) -> Result<ModelForecast> {
        check_horizon(self.name(), periods, self.model.max_horizon)?;

        let frame = self.model.make_future_frame(periods)?;
        let rows: Vec<ForecastRow> = self
            .model
            .predict(&frame)?
            .into_iter()
            .filter(|p| p.ds > last_date)
            .take(periods)
            .map(|p| ForecastRow {
                date: p.ds,
                point: p.yhat,
                lower: p.yhat_lower,
                upper: p.yhat_upper,
            })
            .collect();

        if rows.len() < periods {
            debug!(
                rows = rows.len(),
                periods,
                history_end = %self.model.history_end,
                %last_date,
                "training window ends before the forecast origin"
            );
        }

        ModelForecast::new(self.name(), rows)
    }

    fn interval_width(&self) -> f64 {
        self.model.interval_width
    }

    fn name(&self) -> &str {
        "Prophet"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn flat_model() -> ProphetModel {
        ProphetModel {
            history_start: ymd(2022, 1, 1),
            history_end: ymd(2023, 12, 1),
            y_scale: 10.0,
            k: 0.0,
            m: 0.4,
            changepoints_t: Vec::new(),
            delta: Vec::new(),
            yearly_order: 0,
            beta: Vec::new(),
            sigma_obs: 0.01,
            interval_width: 0.8,
            uncertainty_samples: 200,
            seed: 7,
            max_horizon: 1440,
        }
    }

    #[test]
    fn test_piecewise_linear_changepoint() {
        let trend = piecewise_linear(&[0.0, 0.5, 1.0], 1.0, 0.0, &[(0.5, -1.0)]);
        assert_relative_eq!(trend[0], 0.0);
        assert_relative_eq!(trend[1], 0.5);
        // Slope drops to zero after the changepoint, trend stays continuous
        assert_relative_eq!(trend[2], 0.5);
    }

    #[test]
    fn test_future_frame_extends_history() {
        let frame = flat_model().make_future_frame(3).unwrap();
        assert_eq!(frame.len(), 24 + 3);
        assert_eq!(frame[0], ymd(2022, 1, 1));
        assert_eq!(frame[frame.len() - 1], ymd(2024, 3, 1));
    }

    #[test]
    fn test_flat_prediction_and_bounds() {
        let model = flat_model();
        let frame = model.make_future_frame(2).unwrap();
        let predictions = model.predict(&frame).unwrap();
        for p in &predictions {
            assert_relative_eq!(p.yhat, 4.0, epsilon = 1e-12);
            assert!(p.yhat_lower <= p.yhat && p.yhat <= p.yhat_upper);
            assert!(p.yhat_upper - p.yhat_lower < 1.0);
        }
    }

    #[test]
    fn test_prediction_is_reproducible() {
        let mut model = flat_model();
        model.changepoints_t = vec![0.5];
        model.delta = vec![0.05];
        let frame = model.make_future_frame(12).unwrap();
        assert_eq!(model.predict(&frame).unwrap(), model.predict(&frame).unwrap());
    }

    #[test]
    fn test_validate_beta_length() {
        let mut model = flat_model();
        model.yearly_order = 2;
        model.beta = vec![0.1, 0.2];
        assert!(model.validate().is_err());
    }
}
