//! Walk-forward backtesting of the elapsed-time phase model
//!
//! Each evaluated day sees only the series up to and including itself.
//! The following `lookahead_days` are used for ground truth only.

use crate::cycle::{CycleAnalyzer, DEFAULT_HIKE_THRESHOLD};
use crate::data::DailySeries;
use crate::metrics::{ClassificationMetrics, ConfusionMatrix};
use crate::phase::{ElapsedTimeModel, Phase};
use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default number of future days checked for a hike
pub const DEFAULT_LOOKAHEAD_DAYS: usize = 7;
/// Default rise (cpl) within the lookahead window that counts as a real hike
pub const DEFAULT_GROUND_TRUTH_THRESHOLD: f64 = 5.0;

const MIN_HISTORY_DAYS: usize = 5;
const MIN_HISTORY_FRACTION: f64 = 0.2;

/// One evaluated historical day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestRecord {
    pub date: NaiveDate,
    pub price: f64,
    /// Phase predicted from history up to `date`
    pub phase: Phase,
    pub signal_hike: u8,
    pub actual_hike: u8,
}

/// Scored walk-forward run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Hike threshold the analyzer used
    pub hike_threshold: f64,
    pub metrics: ClassificationMetrics,
    pub records: Vec<BacktestRecord>,
}

/// Replays a daily series through the analyzer and elapsed-time model
#[derive(Debug, Clone, Copy)]
pub struct Backtester {
    analyzer: CycleAnalyzer,
    model: ElapsedTimeModel,
    default_threshold: f64,
}

impl Default for Backtester {
    fn default() -> Self {
        Self::new(CycleAnalyzer::default(), DEFAULT_HIKE_THRESHOLD)
    }
}

impl Backtester {
    /// `default_threshold` is used when a run does not name its own
    pub fn new(analyzer: CycleAnalyzer, default_threshold: f64) -> Self {
        Self {
            analyzer,
            model: ElapsedTimeModel,
            default_threshold,
        }
    }

    pub fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    /// Days of history required before the first evaluation
    pub fn min_history(series_len: usize) -> usize {
        MIN_HISTORY_DAYS.max((series_len as f64 * MIN_HISTORY_FRACTION) as usize)
    }

    /// Run the backtest. `None` when the series is too short to evaluate.
    pub fn run(
        &self,
        series: &DailySeries,
        lookahead_days: usize,
        ground_truth_threshold: f64,
        algo_threshold: Option<f64>,
    ) -> Option<BacktestReport> {
        let hike_threshold = algo_threshold.unwrap_or(self.default_threshold);
        let min_history = Self::min_history(series.len());

        if lookahead_days == 0 || series.len() < min_history + lookahead_days + 1 {
            debug!(
                days = series.len(),
                min_history, lookahead_days, "not enough history to backtest"
            );
            return None;
        }

        let stop = series.len() - lookahead_days;
        let records: Vec<BacktestRecord> = (min_history..stop)
            .into_par_iter()
            .map(|i| {
                self.evaluate_day(
                    series,
                    i,
                    lookahead_days,
                    ground_truth_threshold,
                    hike_threshold,
                )
            })
            .collect();

        let confusion = ConfusionMatrix::from_pairs(
            records
                .iter()
                .map(|r| (r.signal_hike == 1, r.actual_hike == 1)),
        );
        let metrics = ClassificationMetrics::from_confusion(confusion);

        info!(
            hike_threshold,
            days = metrics.total_days,
            accuracy = metrics.accuracy,
            f1 = metrics.f1_score,
            "backtest complete"
        );

        Some(BacktestReport {
            hike_threshold,
            metrics,
            records,
        })
    }

    fn evaluate_day(
        &self,
        series: &DailySeries,
        i: usize,
        lookahead_days: usize,
        ground_truth_threshold: f64,
        hike_threshold: f64,
    ) -> BacktestRecord {
        let today = series[i];
        let history = &series[..=i];

        let stats = self
            .analyzer
            .analyze_as_of(history, hike_threshold, today.date);
        let status = self
            .model
            .predict_at(stats.avg_relenting_days, stats.last_hike_date, today.date);

        let future_max = series[i + 1..i + 1 + lookahead_days]
            .iter()
            .map(|p| p.price_cpl)
            .fold(f64::NEG_INFINITY, f64::max);
        let actual = future_max - today.price_cpl > ground_truth_threshold;

        BacktestRecord {
            date: today.date,
            price: today.price_cpl,
            phase: status.status,
            signal_hike: u8::from(status.status.signals_hike()),
            actual_hike: u8::from(actual),
        }
    }
}
