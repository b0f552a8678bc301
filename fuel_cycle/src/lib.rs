//! # Fuel Cycle
//!
//! A Rust library for detecting and forecasting Edgeworth price cycles in
//! retail fuel markets.
//!
//! ## Features
//!
//! - Station price ingestion (CSV) reduced to a daily median series
//! - Hike detection and average cycle/relenting length estimation
//! - Two phase predictors: elapsed-time (Strategy A) and margin/volatility (Strategy B)
//! - Walk-forward backtesting with hike classification metrics
//! - Grid search over the hike threshold, persisted as JSON config
//! - Forward forecasting through interchangeable backends
//! - Fill-timing savings estimates driven by the current phase
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fuel_cycle::data::{load_observations_csv, DailySeriesBuilder, TimestampRule};
//! use fuel_cycle::backtest::Backtester;
//! use fuel_cycle::cycle::CycleAnalyzer;
//! use fuel_cycle::phase::{CycleOutlook, ElapsedTimeModel};
//!
//! let observations = load_observations_csv("prices.csv", TimestampRule::PreferReported)?;
//! let series = DailySeriesBuilder::new().build(&observations);
//!
//! let today = series.last().map(|p| p.date).unwrap_or_default();
//! let outlook = CycleOutlook::evaluate(
//!     &CycleAnalyzer::default(),
//!     &ElapsedTimeModel,
//!     &series,
//!     8.0,
//!     today,
//! );
//! println!("{} ({})", outlook.status.status, outlook.status.advice);
//!
//! if let Some(report) = Backtester::default().run(&series, 7, 5.0, None) {
//!     println!("{}", report.metrics);
//! }
//! # Ok::<(), fuel_cycle::error::CycleError>(())
//! ```

pub mod backtest;
pub mod config;
pub mod cycle;
pub mod data;
pub mod error;
pub mod market;
pub mod metrics;
pub mod models;
pub mod optimizer;
pub mod phase;
pub mod savings;
pub mod utils;

pub use backtest::{BacktestRecord, BacktestReport, Backtester};
pub use config::{AlgoConfig, ConfigStore};
pub use cycle::{CycleAnalyzer, CycleStats, HikeEvent};
pub use data::{DailyPrice, DailySeries, DailySeriesBuilder, PriceObservation};
pub use error::{CycleError, Result};
pub use metrics::{ClassificationMetrics, ConfusionMatrix};
pub use models::{Forecast, ForecastContext, HorizonForecaster};
pub use optimizer::{OptimizationOutcome, ThresholdOptimizer};
pub use phase::{Phase, PhasePredictor, PhaseStatus};
pub use savings::{SavingsCalculator, SavingsReport};

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Name of the library
pub const NAME: &str = env!("CARGO_PKG_NAME");
