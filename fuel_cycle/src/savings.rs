//! Dollar value of timing a fill against the price cycle
//!
//! Three figures are reported for one tank: the instant saving of the
//! cheapest local station over the market average, the cycle opportunity
//! (waiting for the floor while relenting, or beating the peak during a
//! restoration), and a yearly benchmark scaled to the driver's volume.

use crate::error::{CycleError, Result};
use crate::phase::Phase;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which leg of the cycle a fill decision is made in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleLeg {
    /// Prices are jumping back up
    Restoration,
    /// Prices are undercutting towards the floor
    Relenting,
    Stable,
}

impl From<Phase> for CycleLeg {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::HikeStarted | Phase::HikeImminent | Phase::Overdue => CycleLeg::Restoration,
            Phase::Dropping | Phase::Bottom | Phase::Warning => CycleLeg::Relenting,
            Phase::Hike | Phase::Stable | Phase::Unknown => CycleLeg::Stable,
        }
    }
}

impl fmt::Display for CycleLeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CycleLeg::Restoration => "Restoration",
            CycleLeg::Relenting => "Relenting",
            CycleLeg::Stable => "Stable",
        };
        f.write_str(label)
    }
}

/// Calibration of the savings figures
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SavingsParams {
    /// How far above the predicted floor a restoration peaks (cpl)
    pub peak_premium: f64,
    /// Yearly saving of a cycle-aware driver at the benchmark volume ($)
    pub benchmark_annual_saving: f64,
    /// Litres per year the benchmark assumes (50 L weekly)
    pub benchmark_annual_litres: f64,
    /// Litres suggested as a stop-gap while waiting for the floor
    pub top_up_litres: u32,
    /// Opportunity ($) above which waiting is clearly worth it
    pub strong_wait_dollars: f64,
    /// Opportunity ($) above which waiting is marginally worth it
    pub weak_wait_dollars: f64,
}

impl Default for SavingsParams {
    fn default() -> Self {
        Self {
            peak_premium: 45.0,
            benchmark_annual_saving: 490.0,
            benchmark_annual_litres: 50.0 * 52.0,
            top_up_litres: 10,
            strong_wait_dollars: 5.0,
            weak_wait_dollars: 1.0,
        }
    }
}

/// Market and driver inputs for one fill decision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FillContext {
    /// Market average price (cpl)
    pub market_average: f64,
    /// Cheapest price within reach (cpl)
    pub best_local_price: f64,
    pub leg: CycleLeg,
    /// Forecast floor of the current cycle (cpl)
    pub predicted_bottom: f64,
    pub tank_litres: u32,
    pub fills_per_year: u32,
}

impl FillContext {
    pub fn new(
        market_average: f64,
        best_local_price: f64,
        leg: CycleLeg,
        predicted_bottom: f64,
        tank_litres: u32,
    ) -> Self {
        Self {
            market_average,
            best_local_price,
            leg,
            predicted_bottom,
            tank_litres,
            fills_per_year: 52,
        }
    }

    pub fn with_fills_per_year(mut self, fills_per_year: u32) -> Self {
        self.fills_per_year = fills_per_year;
        self
    }
}

/// Savings figures rounded to cents, plus advice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavingsReport {
    pub immediate_saving_dollars: f64,
    pub opportunity_dollars: f64,
    pub projected_annual_saving: f64,
    pub recommendation: String,
    pub leg: CycleLeg,
    pub tank_litres: u32,
    pub benchmark_price: f64,
}

/// Prices the value of filling now versus waiting
#[derive(Debug, Clone)]
pub struct SavingsCalculator {
    params: SavingsParams,
    context: FillContext,
}

fn cents_to_dollars(cpl: f64, litres: u32) -> f64 {
    cpl * f64::from(litres) / 100.0
}

fn round_cents(dollars: f64) -> f64 {
    (dollars * 100.0).round() / 100.0
}

impl SavingsCalculator {
    pub fn new(context: FillContext) -> Result<Self> {
        Self::with_params(context, SavingsParams::default())
    }

    pub fn with_params(context: FillContext, params: SavingsParams) -> Result<Self> {
        let prices = [
            context.market_average,
            context.best_local_price,
            context.predicted_bottom,
        ];
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(CycleError::InvalidParameter(format!(
                "Savings prices must be finite, got {:?}",
                prices
            )));
        }
        if params.benchmark_annual_litres <= 0.0 {
            return Err(CycleError::InvalidParameter(
                "benchmark_annual_litres must be positive".to_string(),
            ));
        }
        Ok(Self { params, context })
    }

    pub fn context(&self) -> &FillContext {
        &self.context
    }

    /// Expected restoration peak (cpl)
    pub fn predicted_peak(&self) -> f64 {
        self.context.predicted_bottom + self.params.peak_premium
    }

    /// Dollars saved on a full tank at the cheapest station; never negative
    pub fn instant_savings(&self) -> f64 {
        let c = &self.context;
        cents_to_dollars(c.market_average - c.best_local_price, c.tank_litres).max(0.0)
    }

    /// Dollars at stake in timing this fill.
    ///
    /// Relenting: what waiting for the floor saves. Restoration: what
    /// filling before the peak avoids. Stable: nothing.
    pub fn opportunity(&self) -> f64 {
        let c = &self.context;
        let cpl = match c.leg {
            CycleLeg::Relenting => c.best_local_price - c.predicted_bottom,
            CycleLeg::Restoration => self.predicted_peak() - c.best_local_price,
            CycleLeg::Stable => 0.0,
        };
        cents_to_dollars(cpl.max(0.0), c.tank_litres)
    }

    /// Benchmark yearly saving scaled by the driver's yearly volume
    pub fn annualized(&self) -> f64 {
        let litres = f64::from(self.context.tank_litres) * f64::from(self.context.fills_per_year);
        let scale = litres / self.params.benchmark_annual_litres;
        round_cents(self.params.benchmark_annual_saving * scale)
    }

    /// Advice text for the current leg and opportunity
    pub fn recommendation(&self, opportunity: f64) -> String {
        let p = &self.params;
        match self.context.leg {
            CycleLeg::Restoration => format!(
                "PRICE HIKE ALERT: Fill {}L NOW. Waiting could cost you an extra ${:.2}.",
                self.context.tank_litres, opportunity
            ),
            CycleLeg::Relenting if opportunity > p.strong_wait_dollars => format!(
                "Prices dropping: fill only {}L today. Wait for the cycle bottom to save ~${:.2} \
                 on a full tank.",
                p.top_up_litres, opportunity
            ),
            CycleLeg::Relenting if opportunity > p.weak_wait_dollars => format!(
                "Prices dropping slowly. You can wait, but current savings are minimal (${:.2}).",
                opportunity
            ),
            CycleLeg::Relenting => {
                "BOTTOM OF CYCLE: Excellent time to fill up. Market is at its cheapest.".to_string()
            }
            CycleLeg::Stable => "Market is stable. Fill as needed.".to_string(),
        }
    }

    pub fn report(&self) -> SavingsReport {
        let opportunity = self.opportunity();
        SavingsReport {
            immediate_saving_dollars: round_cents(self.instant_savings()),
            opportunity_dollars: round_cents(opportunity),
            projected_annual_saving: self.annualized(),
            recommendation: self.recommendation(opportunity),
            leg: self.context.leg,
            tank_litres: self.context.tank_litres,
            benchmark_price: self.context.market_average,
        }
    }
}
