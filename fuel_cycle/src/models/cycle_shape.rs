//! Parametric Edgeworth cycle simulation
//!
//! Prices are stepped forward one day at a time through three regimes:
//! a fast climb toward the hike peak, a short stabilisation at the peak,
//! and a relenting decay that slows as the margin thins. The output is
//! fully determined by the inputs.

use super::{round_tenth, Forecast, ForecastContext, ForecastPoint, HorizonForecaster};
use crate::data::DailySeries;
use crate::error::{CycleError, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Shape constants of the simulated cycle, in cpl relative to wholesale
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleShapeParams {
    /// Peak of a hike above wholesale
    pub peak_offset: f64,
    /// Level above wholesale where decay stops accelerating
    pub bottom_offset: f64,
    /// Hard floor above wholesale
    pub floor_offset: f64,
    /// Price must be below wholesale plus this for hike risk to build
    pub near_floor_offset: f64,
    /// Days after a hike spent easing toward the peak
    pub peak_window_days: i64,
    /// Cycle age after which hike risk starts to ramp
    pub overdue_onset_days: i64,
    /// Days over which hike risk ramps from 0 to 1
    pub risk_ramp_days: f64,
    /// Hike risk above which a simulated hike fires
    pub hike_trigger: f64,
    /// Days forced into a hike when the current status says one is underway
    pub forced_hike_days: usize,
    /// Share of the distance to the peak closed per hiking day
    pub climb_rate: f64,
    /// Share of the distance to the peak closed per stabilising day
    pub settle_rate: f64,
    /// Distance from the peak at which the cycle restarts
    pub peak_tolerance: f64,
    pub base_decay: f64,
    /// Extra decay per cpl of excess over the bottom level
    pub excess_decay: f64,
}

impl Default for CycleShapeParams {
    fn default() -> Self {
        Self {
            peak_offset: 24.0,
            bottom_offset: 2.0,
            floor_offset: 0.5,
            near_floor_offset: 4.0,
            peak_window_days: 5,
            overdue_onset_days: 25,
            risk_ramp_days: 10.0,
            hike_trigger: 0.8,
            forced_hike_days: 3,
            climb_rate: 0.5,
            settle_rate: 0.2,
            peak_tolerance: 2.0,
            base_decay: 1.5,
            excess_decay: 0.02,
        }
    }
}

/// Rule-based forecaster that needs no training
#[derive(Debug, Clone, Default)]
pub struct CycleShapeForecaster {
    params: CycleShapeParams,
}

impl CycleShapeForecaster {
    pub fn new(params: CycleShapeParams) -> Result<Self> {
        if params.risk_ramp_days <= 0.0 {
            return Err(CycleError::InvalidParameter(
                "risk_ramp_days must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&params.climb_rate) || !(0.0..=1.0).contains(&params.settle_rate) {
            return Err(CycleError::InvalidParameter(
                "climb_rate and settle_rate must be within [0, 1]".to_string(),
            ));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &CycleShapeParams {
        &self.params
    }

    /// Simulate `horizon` days after `start_date`, starting from `latest_price`
    pub fn forecast(
        &self,
        start_date: NaiveDate,
        latest_price: f64,
        context: &ForecastContext,
        horizon: usize,
    ) -> Forecast {
        let p = &self.params;
        let wholesale = context.wholesale_reference;
        let peak = wholesale + p.peak_offset;
        let force_hike = context.current_status.is_hike_underway();

        let mut sim_price = latest_price;
        let mut sim_days = context.days_since_last_hike;
        let mut points = Vec::with_capacity(horizon);

        for step in 1..=horizon {
            sim_days += 1;

            let mut hike_probability = 0.0;
            if sim_days > p.overdue_onset_days && sim_price < wholesale + p.near_floor_offset {
                hike_probability = (sim_days - p.overdue_onset_days) as f64 / p.risk_ramp_days;
            }
            if force_hike && step <= p.forced_hike_days {
                hike_probability = 1.0;
            }

            if hike_probability > p.hike_trigger {
                sim_price += (peak - sim_price) * p.climb_rate;
                if sim_price > peak - p.peak_tolerance {
                    sim_days = 0;
                }
            } else if sim_days < p.peak_window_days {
                sim_price += (peak - sim_price) * p.settle_rate;
            } else {
                let excess = (sim_price - (wholesale + p.bottom_offset)).max(0.0);
                sim_price -= p.base_decay + excess * p.excess_decay;
                sim_price = sim_price.max(wholesale + p.floor_offset);
            }

            points.push(ForecastPoint::new(
                start_date + Duration::days(step as i64),
                round_tenth(sim_price),
                hike_probability,
            ));
        }

        Forecast {
            model: HorizonForecaster::name(self).to_string(),
            points,
        }
    }
}

impl HorizonForecaster for CycleShapeForecaster {
    fn predict_horizon(
        &self,
        history: &DailySeries,
        context: &ForecastContext,
        days: usize,
    ) -> Result<Forecast> {
        let latest = history.last().ok_or_else(|| {
            CycleError::InsufficientData("Cannot forecast from an empty series".to_string())
        })?;
        Ok(self.forecast(latest.date, latest.price_cpl, context, days))
    }

    fn name(&self) -> &str {
        "cycle-shape"
    }
}
