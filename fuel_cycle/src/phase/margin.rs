//! Margin and volatility phase model
//!
//! Retail margin over the wholesale reference drives the hike probability;
//! dispersion of station-level moves detects a hike already in progress.

use super::{Phase, PhasePredictor, PhaseStatus};
use crate::market;
use serde::{Deserialize, Serialize};

/// Live market inputs for [`MarginModel`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MarketSignals {
    /// Median retail price across stations (cpl)
    pub current_median_price: f64,
    /// Wholesale benchmark (cpl)
    pub wholesale_reference_price: f64,
    /// Days since the last hike started
    pub days_elapsed: i64,
    /// Latest daily change of the wholesale benchmark (cpl)
    pub wholesale_trend_delta: f64,
    /// Standard deviation of per-station price changes between two snapshots
    pub cross_station_volatility: f64,
}

/// Weights and cut points of the margin model
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarginModelParams {
    /// Margin below which a squeeze starts
    pub squeeze_margin: f64,
    pub squeeze_weight: f64,
    /// Margin below which retail is under wholesale
    pub negative_margin: f64,
    pub negative_margin_weight: f64,
    /// Days since the last hike after which the cycle is overdue
    pub overdue_days: i64,
    pub overdue_weight: f64,
    /// Wholesale daily change below which falling costs delay the next hike
    pub falling_wholesale_delta: f64,
    pub falling_wholesale_weight: f64,
    /// Station dispersion above which a hike has started
    pub volatility_trigger: f64,
    pub imminent_probability: f64,
    pub warning_probability: f64,
    /// Margin above which prices are relenting
    pub dropping_margin: f64,
    /// Margin below which prices are at the floor
    pub bottom_margin: f64,
}

impl Default for MarginModelParams {
    fn default() -> Self {
        Self {
            squeeze_margin: 2.0,
            squeeze_weight: 0.50,
            negative_margin: 0.0,
            negative_margin_weight: 0.30,
            overdue_days: 35,
            overdue_weight: 0.10,
            falling_wholesale_delta: -0.5,
            falling_wholesale_weight: 0.40,
            volatility_trigger: 5.0,
            imminent_probability: 0.7,
            warning_probability: 0.4,
            dropping_margin: 20.0,
            bottom_margin: 5.0,
        }
    }
}

/// Hike probability in [0, 1] from margin pressure, cycle age and wholesale trend
pub fn estimate_hike_probability(
    params: &MarginModelParams,
    margin: f64,
    days_elapsed: i64,
    wholesale_trend_delta: f64,
) -> f64 {
    let mut probability = 0.0;

    if margin < params.squeeze_margin {
        probability += params.squeeze_weight;
    }
    if margin < params.negative_margin {
        probability += params.negative_margin_weight;
    }
    if days_elapsed > params.overdue_days {
        probability += params.overdue_weight;
    }
    if wholesale_trend_delta < params.falling_wholesale_delta {
        probability -= params.falling_wholesale_weight;
    }

    probability.clamp(0.0, 1.0)
}

/// Phase model driven by live margin and station dispersion
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MarginModel {
    params: MarginModelParams,
}

impl MarginModel {
    pub fn new(params: MarginModelParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MarginModelParams {
        &self.params
    }
}

impl PhasePredictor for MarginModel {
    type Input = MarketSignals;

    fn predict(&self, input: &MarketSignals) -> PhaseStatus {
        let p = &self.params;
        let margin = market::margin(input.current_median_price, input.wholesale_reference_price);

        if !margin.is_finite() {
            return PhaseStatus::new(Phase::Unknown, input.days_elapsed);
        }

        let trend = if input.wholesale_trend_delta.is_finite() {
            input.wholesale_trend_delta
        } else {
            0.0
        };
        let probability = estimate_hike_probability(p, margin, input.days_elapsed, trend);

        let volatility = if input.cross_station_volatility.is_finite() {
            input.cross_station_volatility
        } else {
            0.0
        };

        let phase = if volatility > p.volatility_trigger {
            Phase::HikeStarted
        } else if probability > p.imminent_probability {
            Phase::HikeImminent
        } else if probability > p.warning_probability {
            Phase::Warning
        } else if margin > p.dropping_margin {
            Phase::Dropping
        } else if margin < p.bottom_margin {
            Phase::Bottom
        } else {
            Phase::Stable
        };

        let mut status = PhaseStatus::new(phase, input.days_elapsed);
        status.hike_probability = Some(probability);
        status.margin = Some(margin);
        status
    }

    fn name(&self) -> &str {
        "margin-volatility"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rstest::rstest;

    fn signals(margin: f64, days_elapsed: i64, trend: f64, volatility: f64) -> MarketSignals {
        MarketSignals {
            current_median_price: 170.0 + margin,
            wholesale_reference_price: 170.0,
            days_elapsed,
            wholesale_trend_delta: trend,
            cross_station_volatility: volatility,
        }
    }

    #[test]
    fn test_negative_margin_is_imminent() {
        let status = MarginModel::default().predict(&signals(-1.0, 10, 0.0, 0.0));
        assert_approx_eq!(status.hike_probability.unwrap(), 0.8);
        assert_eq!(status.status, Phase::HikeImminent);
        assert_eq!(status.advice, "FILL NOW");
    }

    #[test]
    fn test_wide_margin_is_dropping() {
        let status = MarginModel::default().predict(&signals(25.0, 5, 0.0, 0.5));
        assert_eq!(status.status, Phase::Dropping);
        assert_eq!(status.hike_probability, Some(0.0));
    }

    #[rstest]
    #[case(1.0, 10, 0.0, 0.0, Phase::Warning)]
    #[case(1.0, 40, 0.0, 0.0, Phase::Warning)]
    #[case(-1.0, 40, 0.0, 0.0, Phase::HikeImminent)]
    #[case(-1.0, 10, -1.0, 0.0, Phase::Bottom)]
    #[case(10.0, 10, 0.0, 0.0, Phase::Stable)]
    #[case(4.0, 10, 0.0, 0.0, Phase::Bottom)]
    #[case(25.0, 10, 0.0, 6.0, Phase::HikeStarted)]
    fn test_status_table(
        #[case] margin: f64,
        #[case] days: i64,
        #[case] trend: f64,
        #[case] volatility: f64,
        #[case] expected: Phase,
    ) {
        let status = MarginModel::default().predict(&signals(margin, days, trend, volatility));
        assert_eq!(status.status, expected);
    }

    #[test]
    fn test_probability_always_bounded() {
        let params = MarginModelParams::default();
        for margin in [-50.0, -0.1, 0.0, 1.9, 2.0, 30.0] {
            for days in [0, 35, 36, 90] {
                for trend in [-3.0, -0.5, 0.0, 2.0] {
                    let p = estimate_hike_probability(&params, margin, days, trend);
                    assert!((0.0..=1.0).contains(&p), "p={} out of range", p);
                }
            }
        }
    }

    #[test]
    fn test_missing_wholesale_is_unknown() {
        let mut input = signals(0.0, 10, 0.0, 0.0);
        input.wholesale_reference_price = f64::NAN;
        let status = MarginModel::default().predict(&input);
        assert_eq!(status.status, Phase::Unknown);
        assert!(status.hike_probability.is_none());
    }
}
