//! Risk scoring errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors from the risk scoring engine
#[derive(Debug, Error)]
pub enum RiskError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Invalid {field} score: {value} (must be within 0..=100)")]
    InvalidScore { field: String, value: Decimal },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for risk operations
pub type RiskResult<T> = Result<T, RiskError>;
