//! Grid search over the hike threshold
//!
//! Evaluation only: the recommended config is returned to the caller and
//! persisting it is a separate, explicit step.

use crate::backtest::{Backtester, DEFAULT_LOOKAHEAD_DAYS};
use crate::config::AlgoConfig;
use crate::data::DailySeries;
use serde::Serialize;
use tracing::{debug, info};

/// Minimum score gain before a new threshold is recommended
const MIN_IMPROVEMENT: f64 = 0.01;
/// Candidates within this distance of the current threshold score the baseline
const BASELINE_TOLERANCE: f64 = 0.1;

/// Candidate grid, inclusive on both ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdGrid {
    pub start: f64,
    pub end: f64,
    pub step: f64,
}

impl Default for ThresholdGrid {
    fn default() -> Self {
        Self {
            start: 4.0,
            end: 12.0,
            step: 0.5,
        }
    }
}

impl ThresholdGrid {
    /// Candidate thresholds, computed by index so steps do not accumulate error
    pub fn candidates(&self) -> Vec<f64> {
        if self.step <= 0.0 || self.end < self.start {
            return vec![self.start];
        }
        let count = ((self.end - self.start) / self.step + 1e-9).floor() as usize + 1;
        (0..count)
            .map(|k| self.start + k as f64 * self.step)
            .collect()
    }
}

/// Score of one grid candidate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CandidateScore {
    pub hike_threshold: f64,
    /// `None` when the backtest had too little data
    pub score: Option<f64>,
}

/// Result of a threshold search
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizationOutcome {
    /// Config to use: the improved threshold, or the current one unchanged
    pub recommended: AlgoConfig,
    pub improved: bool,
    pub best_score: f64,
    pub baseline_score: f64,
    pub message: String,
    pub candidates: Vec<CandidateScore>,
}

/// Searches the hike threshold that best predicts real hikes
#[derive(Debug, Clone, Copy)]
pub struct ThresholdOptimizer {
    backtester: Backtester,
    grid: ThresholdGrid,
    lookahead_days: usize,
}

impl Default for ThresholdOptimizer {
    fn default() -> Self {
        Self::new(Backtester::default())
    }
}

impl ThresholdOptimizer {
    pub fn new(backtester: Backtester) -> Self {
        Self {
            backtester,
            grid: ThresholdGrid::default(),
            lookahead_days: DEFAULT_LOOKAHEAD_DAYS,
        }
    }

    pub fn with_grid(mut self, grid: ThresholdGrid) -> Self {
        self.grid = grid;
        self
    }

    pub fn with_lookahead(mut self, lookahead_days: usize) -> Self {
        self.lookahead_days = lookahead_days;
        self
    }

    /// Score every candidate and compare the best against `current`
    pub fn optimize(
        &self,
        series: &DailySeries,
        ground_truth_threshold: f64,
        current: &AlgoConfig,
    ) -> OptimizationOutcome {
        let current_threshold = current.hike_threshold;
        let mut best_score = -1.0;
        let mut best_threshold = current_threshold;
        let mut baseline_score = 0.0;
        let mut candidates = Vec::new();

        for threshold in self.grid.candidates() {
            let score = self
                .backtester
                .run(series, self.lookahead_days, ground_truth_threshold, Some(threshold))
                .map(|report| report.metrics.selection_score());
            debug!(threshold, ?score, "scored threshold candidate");
            candidates.push(CandidateScore {
                hike_threshold: threshold,
                score,
            });

            let Some(score) = score else { continue };
            if (threshold - current_threshold).abs() < BASELINE_TOLERANCE {
                baseline_score = score;
            }
            if score > best_score {
                best_score = score;
                best_threshold = threshold;
            }
        }

        let improvement = best_score - baseline_score;
        let improved = improvement > MIN_IMPROVEMENT;

        let (recommended, message) = if improved {
            let relative = if baseline_score > 0.0 {
                format!("{:+.1}%", improvement / baseline_score * 100.0)
            } else {
                "from a zero baseline".to_string()
            };
            let mut config = current.clone();
            config.hike_threshold = best_threshold;
            (
                config,
                format!(
                    "Found optimized threshold: {}c (score {:.2} vs {:.2}, +{:.2} absolute, \
                     {} relative)",
                    best_threshold, best_score, baseline_score, improvement, relative
                ),
            )
        } else {
            (
                current.clone(),
                format!("Current threshold ({}c) is already optimal.", current_threshold),
            )
        };

        info!(improved, best_threshold, best_score, baseline_score, "threshold search complete");

        OptimizationOutcome {
            recommended,
            improved,
            best_score,
            baseline_score,
            message,
            candidates,
        }
    }
}
