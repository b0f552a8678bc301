//! # Cycle Math
//!
//! Numerical building blocks shared by the fuel price cycle crates.
//! Everything here is a pure function of its inputs: robust central
//! tendency, dispersion and day-over-day differencing.

use thiserror::Error;

pub mod statistics;

pub use statistics::{day_over_day, mean, median, sample_std_dev};

/// Errors that can occur in cycle math calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for cycle math operations
pub type Result<T> = std::result::Result<T, MathError>;
