//! KycFlow Compliance - alerting, screening and onboarding workflow
//!
//! Every component here operates on an in-memory [`CustomerRecord`] and the
//! customer's existing alerts, and hands back what changed plus the audit
//! entries describing it. Nothing is persisted here; the caller commits the
//! result atomically while holding the customer's lock.
//!
//! ```text
//! ScreeningResult ──► ScreeningCoordinator ──┐
//!                                            ├──► AlertEngine (dedup by customer + type)
//! RiskScoringEngine escalation ──────────────┘
//!
//! documents / checks ──► WorkflowStateMachine ──► step advances, decisions
//! ```
//!
//! [`CustomerRecord`]: kycflow_core::CustomerRecord

pub mod alert;
pub mod config;
pub mod error;
pub mod review;
pub mod screening;
pub mod workflow;

pub use alert::{AlertEngine, AlertRequest, RaiseOutcome};
pub use config::{ComplianceConfig, RequiredDocuments, ReviewFrequency};
pub use error::{ComplianceError, ComplianceResult};
pub use review::{expiring_document_alerts, is_review_due, schedule_next_review, review_due_alert};
pub use screening::{ScreeningCoordinator, ScreeningMatch, ScreeningOutcome, ScreeningResult};
pub use workflow::WorkflowStateMachine;
