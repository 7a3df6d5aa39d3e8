//! Engine errors

use kycflow_compliance::ComplianceError;
use kycflow_core::{ChainError, CoreError};
use kycflow_risk::RiskError;
use kycflow_store::StoreError;
use serde::{Deserialize, Serialize};
use strum_macros::Display;
use thiserror::Error;
use uuid::Uuid;

/// Error classes exposed to callers; an API layer maps these to client statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidState,
    Configuration,
    ExternalServiceTimeout,
    Validation,
    Storage,
}

/// Engine errors
#[derive(Debug, Error)]
pub enum KycError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Risk(#[from] RiskError),

    #[error(transparent)]
    Compliance(#[from] ComplianceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Audit trail integrity check failed: {0}")]
    AuditChain(#[from] ChainError),

    #[error("Screening provider timed out after {timeout_ms}ms for customer {customer_id}")]
    ExternalServiceTimeout { customer_id: Uuid, timeout_ms: u64 },

    #[error("Screening provider failed: {0}")]
    ScreeningProvider(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl KycError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            KycError::Core(CoreError::Validation { .. }) => ErrorKind::Validation,

            KycError::Risk(e) => match e {
                RiskError::Validation(_) | RiskError::InvalidScore { .. } => ErrorKind::Validation,
                RiskError::Configuration(_) | RiskError::Io(_) | RiskError::Serde(_) => {
                    ErrorKind::Configuration
                }
            },

            KycError::Compliance(e) => match e {
                ComplianceError::DocumentNotFound(_) | ComplianceError::OfficerNotFound(_) => {
                    ErrorKind::NotFound
                }
                ComplianceError::AlertAlreadyResolved { .. } | ComplianceError::InvalidState(_) => {
                    ErrorKind::InvalidState
                }
                ComplianceError::Validation(_) => ErrorKind::Validation,
                ComplianceError::Configuration(_)
                | ComplianceError::Io(_)
                | ComplianceError::Serde(_) => ErrorKind::Configuration,
            },

            KycError::Store(e) => match e {
                StoreError::CustomerNotFound(_) | StoreError::AlertNotFound(_) => {
                    ErrorKind::NotFound
                }
                _ => ErrorKind::Storage,
            },
            KycError::AuditChain(_) => ErrorKind::Storage,

            KycError::ExternalServiceTimeout { .. } | KycError::ScreeningProvider(_) => {
                ErrorKind::ExternalServiceTimeout
            }
            KycError::InvalidState(_) => ErrorKind::InvalidState,
            KycError::Configuration(_) => ErrorKind::Configuration,
        }
    }

    /// Worth retrying later without operator action
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            KycError::ExternalServiceTimeout { .. }
                | KycError::ScreeningProvider(_)
                | KycError::Store(StoreError::Conflict { .. })
        )
    }
}

pub type KycResult<T> = Result<T, KycError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        let id = Uuid::new_v4();
        assert_eq!(
            KycError::from(StoreError::CustomerNotFound(id)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            KycError::from(ComplianceError::OfficerNotFound("ghost".into())).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            KycError::from(ComplianceError::DocumentNotFound(id)).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            KycError::from(ComplianceError::Validation("confidence".into())).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            KycError::from(ComplianceError::InvalidState("done".into())).kind(),
            ErrorKind::InvalidState
        );
        assert_eq!(
            KycError::from(RiskError::Configuration("weights".into())).kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            KycError::from(CoreError::validation("email", "missing '@'")).kind(),
            ErrorKind::Validation
        );

        let timeout = KycError::ExternalServiceTimeout {
            customer_id: id,
            timeout_ms: 5000,
        };
        assert_eq!(timeout.kind(), ErrorKind::ExternalServiceTimeout);
        assert!(timeout.is_recoverable());
        assert_eq!(timeout.kind().to_string(), "external_service_timeout");

        let provider = KycError::ScreeningProvider("HTTP 503".into());
        assert_eq!(provider.kind(), ErrorKind::ExternalServiceTimeout);
        assert!(provider.is_recoverable());
    }
}
