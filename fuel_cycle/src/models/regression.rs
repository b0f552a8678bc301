//! Trained hike classifier stacked into a next-day delta regressor
//!
//! Both stages are plain gradient-descent fits over standardized
//! features, so training is deterministic for a given series. Forecasts
//! are produced recursively: each predicted day is appended to the
//! working history before the next day's features are computed.

use super::{
    round_tenth, Forecast, ForecastContext, ForecastModel, ForecastPoint, HorizonForecaster,
};
use crate::data::DailySeries;
use crate::error::{CycleError, Result};
use chrono::Duration;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Days of history a feature row looks back over
const LOOKBACK_DAYS: usize = 14;
const VOLATILITY_WINDOW: usize = 7;
const FEATURE_COUNT: usize = 6;

type FeatureRow = [f64; FEATURE_COUNT];

/// Training hyper-parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionParams {
    /// Next-day rise (cpl) labelled as a hike
    pub hike_delta: f64,
    pub iterations: usize,
    pub learning_rate: f64,
    /// Loss weight of hike rows relative to quiet rows
    pub positive_weight: f64,
    /// Fewest labelled rows accepted for training
    pub min_training_rows: usize,
}

impl Default for RegressionParams {
    fn default() -> Self {
        Self {
            hike_delta: 3.0,
            iterations: 500,
            learning_rate: 0.1,
            positive_weight: 4.0,
            min_training_rows: 10,
        }
    }
}

/// Untrained hike regression model
#[derive(Debug, Clone, Default)]
pub struct HikeRegression {
    params: RegressionParams,
}

/// Fitted classifier and regressor, ready to forecast
#[derive(Debug, Clone)]
pub struct TrainedHikeRegression {
    params: RegressionParams,
    scaler: Scaler,
    classifier: LinearFit,
    regressor: LinearFit,
    training_rows: usize,
}

/// Per-column standardization fitted on the training rows
#[derive(Debug, Clone)]
struct Scaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl Scaler {
    fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;
        let mut means = vec![0.0; width];
        let mut scales = vec![1.0; width];

        for j in 0..width {
            let mean = rows.iter().map(|r| r[j]).sum::<f64>() / n;
            let var = rows.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n;
            means[j] = mean;
            if var.sqrt() > f64::EPSILON {
                scales[j] = var.sqrt();
            }
        }

        Self { means, scales }
    }

    fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.scales))
            .map(|(x, (m, s))| (x - m) / s)
            .collect()
    }
}

/// Weights plus intercept of a linear model
#[derive(Debug, Clone)]
struct LinearFit {
    weights: Vec<f64>,
    bias: f64,
}

impl LinearFit {
    fn score(&self, x: &[f64]) -> f64 {
        self.bias + self.weights.iter().zip(x).map(|(w, v)| w * v).sum::<f64>()
    }

    fn probability(&self, x: &[f64]) -> f64 {
        sigmoid(self.score(x))
    }

    /// Weighted logistic regression by batch gradient descent
    fn fit_logistic(x: &[Vec<f64>], y: &[f64], params: &RegressionParams) -> Self {
        let width = x.first().map_or(0, Vec::len);
        let mut fit = Self {
            weights: vec![0.0; width],
            bias: 0.0,
        };
        let sample_weights: Vec<f64> = y
            .iter()
            .map(|&label| if label > 0.5 { params.positive_weight } else { 1.0 })
            .collect();
        let total_weight: f64 = sample_weights.iter().sum();

        for _ in 0..params.iterations {
            let mut grad = vec![0.0; width];
            let mut grad_bias = 0.0;
            for ((row, &label), &weight) in x.iter().zip(y).zip(&sample_weights) {
                let err = (fit.probability(row) - label) * weight;
                for (g, v) in grad.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_bias += err;
            }
            for (w, g) in fit.weights.iter_mut().zip(&grad) {
                *w -= params.learning_rate * g / total_weight;
            }
            fit.bias -= params.learning_rate * grad_bias / total_weight;
        }

        fit
    }

    /// Least-squares linear regression by batch gradient descent
    fn fit_least_squares(x: &[Vec<f64>], y: &[f64], params: &RegressionParams) -> Self {
        let width = x.first().map_or(0, Vec::len);
        let n = x.len() as f64;
        let mut fit = Self {
            weights: vec![0.0; width],
            bias: y.iter().sum::<f64>() / n,
        };

        for _ in 0..params.iterations {
            let mut grad = vec![0.0; width];
            let mut grad_bias = 0.0;
            for (row, &target) in x.iter().zip(y) {
                let err = fit.score(row) - target;
                for (g, v) in grad.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_bias += err;
            }
            for (w, g) in fit.weights.iter_mut().zip(&grad) {
                *w -= params.learning_rate * g / n;
            }
            fit.bias -= params.learning_rate * grad_bias / n;
        }

        fit
    }
}

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Features describing day `t`, or `None` without enough lookback.
///
/// Columns: 1-day velocity, 7-day velocity, 1-day acceleration, 7-day
/// volatility, margin over the prior 14-day low, and the low itself as a
/// wholesale proxy.
fn feature_row(prices: &[f64], t: usize) -> Option<FeatureRow> {
    if t < LOOKBACK_DAYS || t >= prices.len() {
        return None;
    }

    let wholesale_proxy = prices[t - LOOKBACK_DAYS..t]
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let volatility = cycle_math::sample_std_dev(&prices[t + 1 - VOLATILITY_WINDOW..=t]).ok()?;

    let velo_1d = prices[t] - prices[t - 1];
    let prev_velo = prices[t - 1] - prices[t - 2];

    Some([
        velo_1d,
        prices[t] - prices[t - 7],
        velo_1d - prev_velo,
        volatility,
        prices[t] - wholesale_proxy,
        wholesale_proxy,
    ])
}

impl HikeRegression {
    pub fn new(params: RegressionParams) -> Result<Self> {
        if params.learning_rate <= 0.0 || !params.learning_rate.is_finite() {
            return Err(CycleError::InvalidParameter(
                "learning_rate must be positive".to_string(),
            ));
        }
        if params.iterations == 0 {
            return Err(CycleError::InvalidParameter(
                "iterations must be at least 1".to_string(),
            ));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &RegressionParams {
        &self.params
    }
}

impl ForecastModel for HikeRegression {
    type Trained = TrainedHikeRegression;

    fn train(&self, history: &DailySeries) -> Result<Self::Trained> {
        let prices = history.prices();

        let mut raw_rows = Vec::new();
        let mut deltas = Vec::new();
        for t in LOOKBACK_DAYS..prices.len().saturating_sub(1) {
            if let Some(row) = feature_row(&prices, t) {
                raw_rows.push(row.to_vec());
                deltas.push(prices[t + 1] - prices[t]);
            }
        }

        if raw_rows.len() < self.params.min_training_rows {
            return Err(CycleError::InsufficientData(format!(
                "Need at least {} training rows, got {} from {} days",
                self.params.min_training_rows,
                raw_rows.len(),
                prices.len()
            )));
        }

        let labels: Vec<f64> = deltas
            .iter()
            .map(|&d| if d > self.params.hike_delta { 1.0 } else { 0.0 })
            .collect();

        let scaler = Scaler::fit(&raw_rows);
        let scaled: Vec<Vec<f64>> = raw_rows.iter().map(|r| scaler.transform(r)).collect();
        let classifier = LinearFit::fit_logistic(&scaled, &labels, &self.params);

        let stacked: Vec<Vec<f64>> = scaled
            .iter()
            .map(|row| {
                let probability = classifier.probability(row);
                let mut row = row.clone();
                row.push(probability);
                row
            })
            .collect();
        let regressor = LinearFit::fit_least_squares(&stacked, &deltas, &self.params);

        debug!(
            rows = raw_rows.len(),
            hikes = labels.iter().filter(|&&l| l > 0.5).count(),
            "trained hike regression"
        );

        Ok(TrainedHikeRegression {
            params: self.params,
            scaler,
            classifier,
            regressor,
            training_rows: raw_rows.len(),
        })
    }

    fn name(&self) -> &str {
        "hike-regression"
    }
}

impl TrainedHikeRegression {
    pub fn params(&self) -> &RegressionParams {
        &self.params
    }

    /// Rows the model was fitted on
    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    /// Hike probability and expected delta for the day after `t`
    fn step(&self, prices: &[f64], t: usize) -> Option<(f64, f64)> {
        let row = self.scaler.transform(&feature_row(prices, t)?);
        let probability = self.classifier.probability(&row);
        let mut stacked = row;
        stacked.push(probability);
        Some((probability, self.regressor.score(&stacked)))
    }
}

impl HorizonForecaster for TrainedHikeRegression {
    fn predict_horizon(
        &self,
        history: &DailySeries,
        _context: &ForecastContext,
        days: usize,
    ) -> Result<Forecast> {
        let last = history.last().ok_or_else(|| {
            CycleError::InsufficientData("Cannot forecast from an empty series".to_string())
        })?;
        if history.len() <= LOOKBACK_DAYS {
            return Err(CycleError::InsufficientData(format!(
                "Need more than {} days of history, got {}",
                LOOKBACK_DAYS,
                history.len()
            )));
        }

        let mut prices = history.prices();
        let mut points = Vec::with_capacity(days);

        for step in 1..=days {
            let t = prices.len() - 1;
            let (probability, delta) = self.step(&prices, t).ok_or_else(|| {
                CycleError::DataError(format!("Could not build features for day {}", t))
            })?;
            let next = prices[t] + delta;
            if !next.is_finite() {
                return Err(CycleError::DataError(
                    "Forecast diverged to a non-finite price".to_string(),
                ));
            }
            prices.push(next);
            points.push(ForecastPoint::new(
                last.date + Duration::days(step as i64),
                round_tenth(next),
                probability,
            ));
        }

        Ok(Forecast {
            model: HorizonForecaster::name(self).to_string(),
            points,
        })
    }

    fn name(&self) -> &str {
        "hike-regression"
    }
}
