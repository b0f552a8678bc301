//! Error types for the fuel_cycle crate

use thiserror::Error;

/// Custom error types for the fuel_cycle crate
#[derive(Debug, Error)]
pub enum CycleError {
    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Not enough history for the requested operation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV reading
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from config (de)serialization
    #[error("Config error: {0}")]
    ConfigError(#[from] serde_json::Error),

    /// Error from the numerical helpers
    #[error("Math error: {0}")]
    MathError(#[from] cycle_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, CycleError>;
