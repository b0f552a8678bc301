//! Market-wide signals derived from station snapshots

use crate::data::{DailyPrice, PriceObservation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Retail median minus wholesale reference (cpl)
pub fn margin(retail_median: f64, wholesale_reference: f64) -> f64 {
    retail_median - wholesale_reference
}

/// Latest day-over-day change of a wholesale series; 0.0 with fewer than two days
pub fn wholesale_trend(wholesale: &[DailyPrice]) -> f64 {
    let tail: Vec<f64> = wholesale.iter().rev().take(2).rev().map(|p| p.price_cpl).collect();
    cycle_math::day_over_day(&tail).last().copied().unwrap_or(0.0)
}

fn latest_per_station(snapshot: &[PriceObservation]) -> HashMap<&str, &PriceObservation> {
    let mut latest: HashMap<&str, &PriceObservation> = HashMap::new();
    for obs in snapshot {
        latest
            .entry(obs.station_id.as_str())
            .and_modify(|seen| {
                if obs.observed_at >= seen.observed_at {
                    *seen = obs;
                }
            })
            .or_insert(obs);
    }
    latest
}

/// Dispersion of station-level price changes between two snapshots.
///
/// Stations are matched by id, using each station's latest report in
/// either snapshot. Uniform moves give a low value; a hike that only some
/// stations have followed gives a high one. Fewer than two matched
/// stations gives 0.0.
pub fn cross_station_volatility(
    current: &[PriceObservation],
    previous: &[PriceObservation],
) -> f64 {
    let before = latest_per_station(previous);
    let mut changes: Vec<(&str, f64)> = latest_per_station(current)
        .into_iter()
        .filter_map(|(id, now)| before.get(id).map(|prev| (id, now.price_cpl - prev.price_cpl)))
        .collect();
    changes.sort_by(|a, b| a.0.cmp(b.0));

    let deltas: Vec<f64> = changes.into_iter().map(|(_, d)| d).collect();
    cycle_math::sample_std_dev(&deltas).unwrap_or(0.0)
}

/// Pricing behaviour of a station relative to the daily market mean
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StationStrategy {
    /// Consistently cheaper than the market
    Discounter,
    /// Consistently dearer than the market
    Premium,
    Follower,
}

/// Average deviation of one station from the market
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationProfile {
    pub station_id: String,
    /// Mean of (station price - same-day market mean); negative is cheaper
    pub mean_deviation: f64,
    pub strategy: StationStrategy,
}

impl StationProfile {
    /// How far below the market the station sits (positive is cheaper)
    pub fn discount_depth(&self) -> f64 {
        -self.mean_deviation
    }
}

const PROFILE_BAND: f64 = 3.0;

/// Classify each station by its mean deviation from the daily market mean
pub fn profile_stations(observations: &[PriceObservation]) -> Vec<StationProfile> {
    let mut by_day: BTreeMap<NaiveDate, Vec<f64>> = BTreeMap::new();
    for obs in observations.iter().filter(|o| o.price_cpl.is_finite()) {
        by_day.entry(obs.date()).or_default().push(obs.price_cpl);
    }
    let market_mean: BTreeMap<NaiveDate, f64> = by_day
        .into_iter()
        .filter_map(|(day, prices)| cycle_math::mean(&prices).ok().map(|m| (day, m)))
        .collect();

    let mut deviations: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for obs in observations {
        if let Some(mean) = market_mean.get(&obs.date()) {
            if obs.price_cpl.is_finite() {
                deviations
                    .entry(obs.station_id.as_str())
                    .or_default()
                    .push(obs.price_cpl - mean);
            }
        }
    }

    deviations
        .into_iter()
        .filter_map(|(station, devs)| {
            let mean_deviation = cycle_math::mean(&devs).ok()?;
            let strategy = if mean_deviation < -PROFILE_BAND {
                StationStrategy::Discounter
            } else if mean_deviation > PROFILE_BAND {
                StationStrategy::Premium
            } else {
                StationStrategy::Follower
            };
            Some(StationProfile {
                station_id: station.to_string(),
                mean_deviation,
                strategy,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use chrono::NaiveDateTime;

    fn ts(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 6, 3)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap()
    }

    fn snapshot(hour: u32, prices: &[(&str, f64)]) -> Vec<PriceObservation> {
        prices
            .iter()
            .map(|(id, p)| PriceObservation::new(*id, *p, ts(hour)))
            .collect()
    }

    #[test]
    fn test_uniform_move_has_no_volatility() {
        let before = snapshot(1, &[("a", 170.0), ("b", 172.0), ("c", 171.0)]);
        let after = snapshot(20, &[("a", 169.0), ("b", 171.0), ("c", 170.0)]);
        assert_approx_eq!(cross_station_volatility(&after, &before), 0.0);
    }

    #[test]
    fn test_partial_hike_is_volatile() {
        let before = snapshot(1, &[("a", 165.0), ("b", 165.0), ("c", 165.0), ("d", 165.0)]);
        let after = snapshot(20, &[("a", 205.0), ("b", 165.0), ("c", 204.0), ("d", 164.0)]);
        assert!(cross_station_volatility(&after, &before) > 5.0);
    }

    #[test]
    fn test_unmatched_stations_ignored() {
        let before = snapshot(1, &[("a", 165.0)]);
        let after = snapshot(20, &[("a", 200.0), ("z", 150.0)]);
        assert_eq!(cross_station_volatility(&after, &before), 0.0);
    }

    #[test]
    fn test_wholesale_trend() {
        let d = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let series = crate::data::DailySeries::from_prices(d, &[160.0, 159.2, 158.5]);
        assert_approx_eq!(wholesale_trend(&series), -0.7, 1e-9);
        assert_eq!(wholesale_trend(&series[..1]), 0.0);
    }

    #[test]
    fn test_profile_stations() {
        let obs = snapshot(9, &[("cheap", 160.0), ("mid", 170.0), ("dear", 180.0)]);
        let profiles = profile_stations(&obs);

        let by_id: HashMap<_, _> = profiles.iter().map(|p| (p.station_id.as_str(), p)).collect();
        assert_eq!(by_id["cheap"].strategy, StationStrategy::Discounter);
        assert_eq!(by_id["mid"].strategy, StationStrategy::Follower);
        assert_eq!(by_id["dear"].strategy, StationStrategy::Premium);
        assert_approx_eq!(by_id["cheap"].discount_depth(), 10.0);
    }
}
