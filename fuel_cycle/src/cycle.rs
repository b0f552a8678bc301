//! Hike event detection and cycle statistics
//!
//! A hike is any day whose median price rose by more than the hike
//! threshold over the previous *present* day. Missing days are not
//! reconstructed, so a hike spread over a gap still counts as one jump.

use crate::data::DailyPrice;
use chrono::{Duration, Local, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default day-over-day increase (cpl) that marks a hike
pub const DEFAULT_HIKE_THRESHOLD: f64 = 8.0;

/// A day on which the median price jumped above the hike threshold
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HikeEvent {
    pub date: NaiveDate,
    pub price_before: f64,
    pub price_after: f64,
    pub delta: f64,
}

/// Summary of the detected cycle rhythm
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleStats {
    pub avg_cycle_length_days: f64,
    pub avg_relenting_days: f64,
    pub last_hike_date: NaiveDate,
    /// Number of hikes the averages rest on; 0 or 1 means fallback values
    pub hike_count: usize,
}

impl CycleStats {
    /// Whether the averages were measured rather than defaulted
    pub fn is_measured(&self) -> bool {
        self.hike_count >= 2
    }

    /// Last hike plus one average cycle, rounded to whole days
    pub fn next_hike_estimate(&self) -> NaiveDate {
        self.last_hike_date + Duration::days(self.avg_cycle_length_days.round() as i64)
    }
}

/// Cycle-shape constants used by the analyzer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CycleParams {
    /// Share of a cycle spent relenting; the remainder is hike and plateau
    pub relenting_fraction: f64,
    /// (cycle, relenting) days when no hike has been seen
    pub no_hike_fallback: (f64, f64),
    /// (cycle, relenting) days anchored on a single hike
    pub single_hike_fallback: (f64, f64),
}

impl Default for CycleParams {
    fn default() -> Self {
        Self {
            relenting_fraction: 0.8,
            no_hike_fallback: (30.0, 20.0),
            single_hike_fallback: (35.0, 28.0),
        }
    }
}

/// Scans a daily series for hikes and averages the gaps between them
#[derive(Debug, Clone, Copy, Default)]
pub struct CycleAnalyzer {
    params: CycleParams,
}

impl CycleAnalyzer {
    pub fn new(params: CycleParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &CycleParams {
        &self.params
    }

    /// All days whose delta over the previous present day exceeds `hike_threshold`
    pub fn hike_events(&self, points: &[DailyPrice], hike_threshold: f64) -> Vec<HikeEvent> {
        let prices: Vec<f64> = points.iter().map(|p| p.price_cpl).collect();
        points
            .windows(2)
            .zip(cycle_math::day_over_day(&prices))
            .filter_map(|(w, delta)| {
                (delta > hike_threshold).then_some(HikeEvent {
                    date: w[1].date,
                    price_before: w[0].price_cpl,
                    price_after: w[1].price_cpl,
                    delta,
                })
            })
            .collect()
    }

    /// Analyze with today's local date as the fallback anchor
    pub fn analyze(&self, points: &[DailyPrice], hike_threshold: f64) -> CycleStats {
        self.analyze_as_of(points, hike_threshold, Local::now().date_naive())
    }

    /// Analyze, anchoring the no-hike fallback on `as_of`.
    ///
    /// Never fails: short or flat series produce the documented fallbacks.
    pub fn analyze_as_of(
        &self,
        points: &[DailyPrice],
        hike_threshold: f64,
        as_of: NaiveDate,
    ) -> CycleStats {
        let hikes = self.hike_events(points, hike_threshold);

        match hikes.as_slice() {
            [] => {
                debug!(
                    days = points.len(),
                    hike_threshold,
                    "no hikes detected, using fallback cycle"
                );
                let (cycle, relenting) = self.params.no_hike_fallback;
                CycleStats {
                    avg_cycle_length_days: cycle,
                    avg_relenting_days: relenting,
                    last_hike_date: as_of,
                    hike_count: 0,
                }
            }
            [only] => {
                debug!(date = %only.date, "single hike detected, using conservative cycle");
                let (cycle, relenting) = self.params.single_hike_fallback;
                CycleStats {
                    avg_cycle_length_days: cycle,
                    avg_relenting_days: relenting,
                    last_hike_date: only.date,
                    hike_count: 1,
                }
            }
            [.., last] => {
                let gaps: Vec<f64> = hikes
                    .windows(2)
                    .map(|w| (w[1].date - w[0].date).num_days() as f64)
                    .collect();
                let avg_cycle =
                    cycle_math::mean(&gaps).unwrap_or(self.params.single_hike_fallback.0);

                CycleStats {
                    avg_cycle_length_days: avg_cycle,
                    avg_relenting_days: avg_cycle * self.params.relenting_fraction,
                    last_hike_date: last.date,
                    hike_count: hikes.len(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DailySeries;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(n)
    }

    #[test]
    fn test_flat_series_falls_back() {
        let series = DailySeries::from_prices(day(0), &[170.0; 20]);
        let stats = CycleAnalyzer::default().analyze_as_of(&series, 8.0, day(40));

        assert_eq!(stats.avg_cycle_length_days, 30.0);
        assert_eq!(stats.avg_relenting_days, 20.0);
        assert_eq!(stats.last_hike_date, day(40));
        assert!(!stats.is_measured());
    }

    #[test]
    fn test_empty_and_single_point_series() {
        let analyzer = CycleAnalyzer::default();
        assert_eq!(analyzer.analyze_as_of(&[], 8.0, day(0)).hike_count, 0);

        let one = DailySeries::from_prices(day(0), &[170.0]);
        assert_eq!(analyzer.analyze_as_of(&one, 8.0, day(0)).hike_count, 0);
    }

    #[test]
    fn test_single_hike_uses_conservative_defaults() {
        let series = DailySeries::from_prices(day(0), &[160.0, 160.0, 185.0, 184.0]);
        let stats = CycleAnalyzer::default().analyze_as_of(&series, 8.0, day(10));

        assert_eq!(stats.avg_cycle_length_days, 35.0);
        assert_eq!(stats.avg_relenting_days, 28.0);
        assert_eq!(stats.last_hike_date, day(2));
    }

    #[test]
    fn test_delta_equal_to_threshold_is_not_a_hike() {
        let series = DailySeries::from_prices(day(0), &[160.0, 168.0]);
        assert!(CycleAnalyzer::default().hike_events(&series, 8.0).is_empty());
    }

    #[test]
    fn test_gap_delta_uses_previous_present_day() {
        let points = vec![
            DailyPrice::new(day(0), 160.0),
            DailyPrice::new(day(3), 175.0),
        ];
        let hikes = CycleAnalyzer::default().hike_events(&points, 8.0);
        assert_eq!(hikes.len(), 1);
        assert_eq!(hikes[0].date, day(3));
        assert_eq!(hikes[0].delta, 15.0);
    }

    #[test]
    fn test_measured_cycle_averages_hike_gaps() {
        let mut prices = vec![160.0; 40];
        for hike in [2, 12, 32] {
            prices[hike..].iter_mut().for_each(|p| *p += 20.0);
        }
        let series = DailySeries::from_prices(day(0), &prices);
        let stats = CycleAnalyzer::default().analyze_as_of(&series, 8.0, day(39));

        assert_eq!(stats.hike_count, 3);
        assert_eq!(stats.avg_cycle_length_days, 15.0);
        assert!((stats.avg_relenting_days - 12.0).abs() < 1e-9);
        assert_eq!(stats.last_hike_date, day(32));
    }

    #[test]
    fn test_next_hike_estimate() {
        let stats = CycleStats {
            avg_cycle_length_days: 29.6,
            avg_relenting_days: 23.68,
            last_hike_date: day(10),
            hike_count: 3,
        };
        assert_eq!(stats.next_hike_estimate(), day(40));
    }
}
