//! Cycle phase prediction
//!
//! Two interchangeable predictors share the [`PhaseStatus`] output:
//!
//! - [`ElapsedTimeModel`]: where are we, given days since the last hike and
//!   the average relenting length?
//! - [`MarginModel`]: how squeezed is the retail margin over wholesale, and
//!   is the market already fragmenting?
//!
//! Both are pure functions of their inputs. Callers choose one explicitly.

use crate::cycle::{CycleAnalyzer, CycleStats};
use crate::data::DailyPrice;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

mod elapsed;
mod margin;

pub use elapsed::{ElapsedInput, ElapsedTimeModel};
pub use margin::{estimate_hike_probability, MarginModel, MarginModelParams, MarketSignals};

/// Discrete position in the Edgeworth cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// A hike happened within the last few days
    Hike,
    /// Stations are jumping unevenly; a hike is propagating
    HikeStarted,
    /// Margin squeeze makes a hike very likely
    HikeImminent,
    /// Elevated hike risk
    Warning,
    /// Relenting: prices are falling
    Dropping,
    /// Near the floor of the cycle
    Bottom,
    /// Past the expected end of relenting
    Overdue,
    Stable,
    Unknown,
}

impl Phase {
    /// Short recommendation for a motorist
    pub fn advice(&self) -> &'static str {
        match self {
            Phase::Hike => "Wait",
            Phase::HikeStarted | Phase::HikeImminent | Phase::Overdue => "FILL NOW",
            Phase::Warning => "Top Up",
            Phase::Dropping => "Wait",
            Phase::Bottom => "Buy",
            Phase::Stable => "Hold",
            Phase::Unknown => "Not enough data",
        }
    }

    /// Whether prices are already on their way up
    pub fn is_hike_underway(&self) -> bool {
        matches!(self, Phase::HikeStarted | Phase::HikeImminent)
    }

    /// Whether this phase counts as a positive hike signal in backtests
    pub fn signals_hike(&self) -> bool {
        matches!(self, Phase::Hike | Phase::Overdue)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Phase::Hike => "HIKE",
            Phase::HikeStarted => "HIKE_STARTED",
            Phase::HikeImminent => "HIKE_IMMINENT",
            Phase::Warning => "WARNING",
            Phase::Dropping => "DROPPING",
            Phase::Bottom => "BOTTOM",
            Phase::Overdue => "OVERDUE",
            Phase::Stable => "STABLE",
            Phase::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}

/// Result of one phase evaluation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseStatus {
    pub status: Phase,
    pub days_elapsed: i64,
    /// Estimated days of relenting left; only the elapsed-time model sets this
    pub days_remaining: Option<i64>,
    /// Probability of a hike in [0, 1]; only the margin model sets this
    pub hike_probability: Option<f64>,
    /// Retail minus wholesale, when known
    pub margin: Option<f64>,
    pub advice: String,
}

impl PhaseStatus {
    pub(crate) fn new(status: Phase, days_elapsed: i64) -> Self {
        Self {
            status,
            days_elapsed,
            days_remaining: None,
            hike_probability: None,
            margin: None,
            advice: status.advice().to_string(),
        }
    }
}

/// A phase prediction strategy
pub trait PhasePredictor {
    /// Inputs this strategy reads
    type Input;

    fn predict(&self, input: &Self::Input) -> PhaseStatus;

    fn name(&self) -> &str;
}

/// Cycle statistics, current phase and next-hike estimate for one series
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleOutlook {
    pub stats: CycleStats,
    pub status: PhaseStatus,
    pub next_hike_estimate: NaiveDate,
}

impl CycleOutlook {
    /// Run the analyzer and the elapsed-time model as of `today`
    pub fn evaluate(
        analyzer: &CycleAnalyzer,
        model: &ElapsedTimeModel,
        points: &[DailyPrice],
        hike_threshold: f64,
        today: NaiveDate,
    ) -> Self {
        let stats = analyzer.analyze_as_of(points, hike_threshold, today);
        let status = model.predict(&ElapsedInput {
            avg_relenting_days: stats.avg_relenting_days,
            last_hike_date: stats.last_hike_date,
            today,
        });

        Self {
            next_hike_estimate: stats.next_hike_estimate(),
            stats,
            status,
        }
    }
}
