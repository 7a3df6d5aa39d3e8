//! Compliance errors

use thiserror::Error;
use uuid::Uuid;

/// Errors from alerting, screening and workflow operations
#[derive(Debug, Error)]
pub enum ComplianceError {
    #[error("Document not found: {0}")]
    DocumentNotFound(Uuid),

    #[error("Compliance officer not found: {0}")]
    OfficerNotFound(String),

    #[error("Alert {id} already {status}")]
    AlertAlreadyResolved { id: Uuid, status: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

/// Result type for compliance operations
pub type ComplianceResult<T> = Result<T, ComplianceError>;
