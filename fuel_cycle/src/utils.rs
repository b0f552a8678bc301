//! Synthetic price series for tests and demos

use crate::data::{DailySeries, PriceObservation};
use chrono::{Duration, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate a clean Edgeworth sawtooth.
///
/// Day 0 sits at the peak (`trough + hike_size`); prices then fall in
/// equal steps to `trough` on the last day of each cycle and jump back to
/// the peak every `cycle_days` days.
///
/// # Arguments
/// * `start` - Date of the first point
/// * `days` - Number of daily points
/// * `cycle_days` - Days between hikes (at least 2)
/// * `trough` - Lowest price of each cycle
/// * `hike_size` - Size of each jump
pub fn sawtooth_series(
    start: NaiveDate,
    days: usize,
    cycle_days: usize,
    trough: f64,
    hike_size: f64,
) -> DailySeries {
    let cycle_days = cycle_days.max(2);
    let step = hike_size / (cycle_days - 1) as f64;

    let prices: Vec<f64> = (0..days)
        .map(|i| trough + hike_size - step * (i % cycle_days) as f64)
        .collect();

    DailySeries::from_prices(start, &prices)
}

/// Sawtooth with uniform noise of up to `noise` cpl, reproducible from `seed`
pub fn noisy_sawtooth_series(
    start: NaiveDate,
    days: usize,
    cycle_days: usize,
    trough: f64,
    hike_size: f64,
    noise: f64,
    seed: u64,
) -> DailySeries {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = noise.abs();

    let prices: Vec<f64> = sawtooth_series(start, days, cycle_days, trough, hike_size)
        .iter()
        .map(|p| {
            if noise > 0.0 {
                p.price_cpl + rng.gen_range(-noise..=noise)
            } else {
                p.price_cpl
            }
        })
        .collect();

    DailySeries::from_prices(start, &prices)
}

/// Expand a daily series into per-station observations around each day's price.
///
/// Station `i` quotes the daily price plus `offsets[i]`, at noon.
pub fn station_observations(series: &DailySeries, offsets: &[f64]) -> Vec<PriceObservation> {
    series
        .iter()
        .flat_map(|day| {
            let noon = day.date.and_hms_opt(12, 0, 0).unwrap_or_default();
            offsets.iter().enumerate().map(move |(i, offset)| {
                PriceObservation::new(
                    format!("station-{}", i + 1),
                    day.price_cpl + offset,
                    noon + Duration::minutes(i as i64),
                )
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cycle::CycleAnalyzer;

    fn start() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn test_sawtooth_shape() {
        let series = sawtooth_series(start(), 25, 10, 160.0, 18.0);
        assert_eq!(series.len(), 25);
        assert_eq!(series[0].price_cpl, 178.0);
        assert_eq!(series[9].price_cpl, 160.0);
        assert_eq!(series[10].price_cpl, 178.0);

        let hikes = CycleAnalyzer::default().hike_events(&series, 8.0);
        assert_eq!(hikes.len(), 2);
        assert_eq!((hikes[1].date - hikes[0].date).num_days(), 10);
    }

    #[test]
    fn test_noisy_series_is_seeded() {
        let a = noisy_sawtooth_series(start(), 40, 10, 160.0, 18.0, 0.5, 7);
        let b = noisy_sawtooth_series(start(), 40, 10, 160.0, 18.0, 0.5, 7);
        assert_eq!(a, b);

        let clean = sawtooth_series(start(), 40, 10, 160.0, 18.0);
        for (noisy, clean) in a.iter().zip(clean.iter()) {
            assert!((noisy.price_cpl - clean.price_cpl).abs() <= 0.5);
        }
    }

    #[test]
    fn test_station_observations() {
        let series = sawtooth_series(start(), 3, 10, 160.0, 18.0);
        let observations = station_observations(&series, &[-1.0, 0.0, 2.5]);
        assert_eq!(observations.len(), 9);
        assert_eq!(observations[2].station_id, "station-3");
        assert_eq!(observations[2].price_cpl, 180.5);
        assert_eq!(observations[3].date(), start() + Duration::days(1));
    }
}
