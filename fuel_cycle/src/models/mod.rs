//! Forward price forecasters
//!
//! Every backend implements [`HorizonForecaster`], so the deterministic
//! cycle-shape simulation and the trained regression model can be swapped
//! at construction time without touching callers.

use crate::data::DailySeries;
use crate::error::Result;
use crate::phase::Phase;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod cycle_shape;
pub mod regression;

pub use cycle_shape::{CycleShapeForecaster, CycleShapeParams};
pub use regression::{HikeRegression, RegressionParams, TrainedHikeRegression};

/// Default forecast horizon in days
pub const DEFAULT_HORIZON_DAYS: usize = 14;

/// Market state a forecast starts from, beyond the price history itself
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastContext {
    /// Wholesale benchmark (cpl)
    pub wholesale_reference: f64,
    pub days_since_last_hike: i64,
    /// Phase reported by a phase predictor for the latest day
    pub current_status: Phase,
    /// Average cycle length in days
    pub cycle_length_days: f64,
}

/// "Rockets and feathers": fast rises, slow falls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Rocket,
    Feather,
}

impl Trend {
    pub fn from_probability(hike_probability: f64) -> Self {
        if hike_probability > 0.5 {
            Trend::Rocket
        } else {
            Trend::Feather
        }
    }
}

/// One forecast day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub predicted_price: f64,
    pub hike_probability: f64,
    pub trend: Trend,
}

impl ForecastPoint {
    pub fn new(date: NaiveDate, predicted_price: f64, hike_probability: f64) -> Self {
        let hike_probability = hike_probability.clamp(0.0, 1.0);
        Self {
            date,
            predicted_price,
            hike_probability,
            trend: Trend::from_probability(hike_probability),
        }
    }
}

/// Dated price trace produced by a forecaster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Forecast {
    pub model: String,
    pub points: Vec<ForecastPoint>,
}

impl Forecast {
    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.predicted_price).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Common interface for forward forecasters
pub trait HorizonForecaster: Debug {
    /// Project `days` days past the end of `history`
    fn predict_horizon(
        &self,
        history: &DailySeries,
        context: &ForecastContext,
        days: usize,
    ) -> Result<Forecast>;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Forecast model that must be trained on history before use
pub trait ForecastModel: Debug + Clone {
    /// The type of trained model produced
    type Trained: HorizonForecaster;

    /// Train the model on a daily series
    fn train(&self, history: &DailySeries) -> Result<Self::Trained>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

/// Round to one decimal place, as prices are quoted
pub(crate) fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
