//! Elapsed-time phase model

use super::{Phase, PhasePredictor, PhaseStatus};
use chrono::NaiveDate;

/// Days after a hike during which the market still counts as hiking
const HIKE_WINDOW_DAYS: i64 = 3;
/// Remaining relenting days at or below which the market is near the floor
const BOTTOM_WINDOW_DAYS: f64 = 3.0;

/// Inputs for [`ElapsedTimeModel`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElapsedInput {
    pub avg_relenting_days: f64,
    pub last_hike_date: NaiveDate,
    pub today: NaiveDate,
}

/// Places the market in the cycle from days since the last hike
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ElapsedTimeModel;

impl ElapsedTimeModel {
    pub fn predict_at(
        &self,
        avg_relenting_days: f64,
        last_hike_date: NaiveDate,
        today: NaiveDate,
    ) -> PhaseStatus {
        self.predict(&ElapsedInput {
            avg_relenting_days,
            last_hike_date,
            today,
        })
    }

    /// Status for a `(days_elapsed, remaining)` pair; first matching rule wins
    pub fn classify(days_elapsed: i64, remaining: f64) -> Phase {
        if days_elapsed < HIKE_WINDOW_DAYS {
            Phase::Hike
        } else if remaining > BOTTOM_WINDOW_DAYS {
            Phase::Dropping
        } else if remaining > 0.0 {
            Phase::Bottom
        } else {
            Phase::Overdue
        }
    }
}

impl PhasePredictor for ElapsedTimeModel {
    type Input = ElapsedInput;

    fn predict(&self, input: &ElapsedInput) -> PhaseStatus {
        let days_elapsed = (input.today - input.last_hike_date).num_days();
        let remaining = input.avg_relenting_days - days_elapsed as f64;

        let mut status = PhaseStatus::new(Self::classify(days_elapsed, remaining), days_elapsed);
        status.days_remaining = Some(if remaining > 0.0 { remaining as i64 } else { 0 });
        status
    }

    fn name(&self) -> &str {
        "elapsed-time"
    }
}
