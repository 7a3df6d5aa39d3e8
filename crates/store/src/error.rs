//! Store errors

use thiserror::Error;
use uuid::Uuid;

/// Errors from a [`crate::KycStore`]
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Customer not found: {0}")]
    CustomerNotFound(Uuid),

    #[error("Alert not found: {0}")]
    AlertNotFound(Uuid),

    #[error("Version conflict for customer {customer_id}: expected {expected}, found {actual}")]
    Conflict {
        customer_id: Uuid,
        expected: u64,
        actual: u64,
    },

    #[error("Audit chain rejected for customer {customer_id}: {reason}")]
    AuditChain { customer_id: Uuid, reason: String },

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
