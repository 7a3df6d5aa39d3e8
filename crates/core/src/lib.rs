//! KycFlow Core - shared domain types
//!
//! Everything the onboarding engine reads or writes for a customer lives here:
//!
//! ```text
//! CustomerRecord (one per customer, mutated under a per-customer lock)
//! ├── Customer          identity, status, risk mirror, screening flags
//! ├── Vec<Document>     uploaded evidence
//! ├── RiskAssessment    component scores + versioned risk factors
//! └── WorkflowState     onboarding step + completion flags
//!
//! ComplianceAlert       many per customer, deduplicated by (customer, type)
//! AuditEntry            append-only, hash-chained per customer
//! ```

pub mod alert;
pub mod assessment;
pub mod audit;
pub mod customer;
pub mod document;
pub mod error;
pub mod record;
pub mod types;
pub mod workflow;

pub use alert::ComplianceAlert;
pub use assessment::{ComponentScore, RiskAssessment, RiskFactors, ThresholdSnapshot, RISK_FACTORS_SCHEMA_VERSION};
pub use audit::{calculate_entry_hash, verify_chain, AuditChain, AuditEntry, ChainError, GENESIS_HASH};
pub use customer::{
    Actor, BeneficialOwner, CorporateDetails, Customer, CustomerIntake, IndividualDetails,
};
pub use document::{Document, DocumentUpload};
pub use error::CoreError;
pub use record::CustomerRecord;
pub use types::{
    AlertStatus, AlertType, AssessmentMethod, AuditAction, CustomerStatus, CustomerType,
    DocumentType, KycType, RiskFactor, RiskLevel, Severity, VerificationCheck,
    VerificationStatus, WorkflowStep,
};
pub use workflow::{WorkflowCheck, WorkflowState};
