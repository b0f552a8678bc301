//! # Fuel Cycle Workspace
//!
//! Umbrella crate re-exporting the workspace members:
//!
//! - [`cycle_math`]: median, mean, deviation and day-over-day helpers
//! - [`fuel_cycle`]: ingestion, cycle analysis, phase models, backtesting and forecasting
//!
//! ## Example
//!
//! ```
//! use chrono::NaiveDate;
//! use fuel_cycle_workspace::fuel_cycle::cycle::CycleAnalyzer;
//! use fuel_cycle_workspace::fuel_cycle::utils::sawtooth_series;
//!
//! let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
//! let series = sawtooth_series(start, 60, 20, 160.0, 24.0);
//!
//! let stats = CycleAnalyzer::default().analyze_as_of(&series, 8.0, start);
//! assert_eq!(stats.avg_cycle_length_days, 20.0);
//! assert_eq!(stats.avg_relenting_days, 16.0);
//! ```

pub use cycle_math;
pub use fuel_cycle;
