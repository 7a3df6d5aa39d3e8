//! Enumerations shared across the workspace
//!
//! All enums serialize as `snake_case` (JSON) and round-trip through
//! `Display`/`FromStr` with the same spelling, which is what the SQLite store
//! and the CLI use.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// Individual person or legal entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CustomerType {
    Individual,
    Corporate,
}

/// Application status as seen by the customer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CustomerStatus {
    Pending,
    UnderReview,
    Approved,
    Rejected,
    Suspended,
    RequiresAdditionalInfo,
}

impl CustomerStatus {
    /// A compliance decision has been taken; approve/reject/request-info no longer apply
    pub fn is_decided(&self) -> bool {
        matches!(
            self,
            CustomerStatus::Approved | CustomerStatus::Rejected | CustomerStatus::Suspended
        )
    }
}

/// Risk tier - ordered from lowest to highest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for RiskLevel {
    fn default() -> Self {
        RiskLevel::Medium
    }
}

impl RiskLevel {
    /// High and critical customers need enhanced due diligence
    pub fn is_elevated(&self) -> bool {
        matches!(self, RiskLevel::High | RiskLevel::Critical)
    }
}

/// Due-diligence intensity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum KycType {
    /// Customer Due Diligence
    Cdd,
    /// Enhanced Customer Due Diligence
    Ecdd,
    /// Simplified Due Diligence
    Sdd,
}

impl Default for KycType {
    fn default() -> Self {
        KycType::Cdd
    }
}

/// Onboarding pipeline stage
///
/// Declaration order is the forward order of the pipeline; `Rejected` sits
/// outside it and is only reachable through an explicit rejection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowStep {
    Initiated,
    DocumentsUploaded,
    InitialReview,
    RiskAssessment,
    ComplianceReview,
    FinalApproval,
    Completed,
    Rejected,
}

impl WorkflowStep {
    /// The step that follows this one in the forward pipeline
    pub fn next(&self) -> Option<WorkflowStep> {
        match self {
            WorkflowStep::Initiated => Some(WorkflowStep::DocumentsUploaded),
            WorkflowStep::DocumentsUploaded => Some(WorkflowStep::InitialReview),
            WorkflowStep::InitialReview => Some(WorkflowStep::RiskAssessment),
            WorkflowStep::RiskAssessment => Some(WorkflowStep::ComplianceReview),
            WorkflowStep::ComplianceReview => Some(WorkflowStep::FinalApproval),
            WorkflowStep::FinalApproval => Some(WorkflowStep::Completed),
            WorkflowStep::Completed | WorkflowStep::Rejected => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowStep::Completed | WorkflowStep::Rejected)
    }
}

/// Kind of compliance alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertType {
    SanctionsHit,
    PepMatch,
    AdverseMedia,
    HighRiskCountry,
    DocumentExpiry,
    ReviewDue,
    UnusualActivity,
}

/// Alert severity - ordered from lowest to highest
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Alert lifecycle: `open -> investigating -> resolved | false_positive`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Investigating,
    Resolved,
    FalsePositive,
}

impl AlertStatus {
    /// Open and investigating alerts count for deduplication
    pub fn is_active(&self) -> bool {
        matches!(self, AlertStatus::Open | AlertStatus::Investigating)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

/// How a risk assessment was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AssessmentMethod {
    Automated,
    ExternalApi,
}

/// The four weighted risk components
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RiskFactor {
    Country,
    Customer,
    Product,
    Transaction,
}

/// Audit trail action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
    Create,
    Update,
    Approve,
    Reject,
    Suspend,
    DocumentUpload,
    DocumentVerify,
    RiskAssess,
    StatusChange,
    Screening,
    WorkflowAdvance,
    AlertRaise,
    AlertUpdate,
}

/// Supported KYC document kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DocumentType {
    Passport,
    NationalId,
    DriverLicense,
    UtilityBill,
    BankStatement,
    IncorporationCertificate,
    MemorandumArticles,
    BoardResolution,
    FinancialStatements,
    TaxCertificate,
    RegulatoryLicense,
    Other,
}

impl DocumentType {
    /// Which verification check a verified document of this type satisfies
    pub fn evidences(&self) -> Option<VerificationCheck> {
        match self {
            DocumentType::Passport
            | DocumentType::NationalId
            | DocumentType::DriverLicense
            | DocumentType::IncorporationCertificate => Some(VerificationCheck::Identity),
            DocumentType::UtilityBill
            | DocumentType::BankStatement
            | DocumentType::MemorandumArticles => Some(VerificationCheck::Address),
            _ => None,
        }
    }
}

/// Document verification status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationStatus {
    Pending,
    Verified,
    Rejected,
    Expired,
}

/// Manual verification checks backed by documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum VerificationCheck {
    Identity,
    Address,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_risk_level_ordering() {
        assert!(RiskLevel::Low < RiskLevel::Medium);
        assert!(RiskLevel::Medium < RiskLevel::High);
        assert!(RiskLevel::High < RiskLevel::Critical);
        assert!(RiskLevel::High.is_elevated());
        assert!(!RiskLevel::Medium.is_elevated());
    }

    #[test]
    fn test_workflow_step_forward_order() {
        let mut step = WorkflowStep::Initiated;
        let mut visited = vec![step];
        while let Some(next) = step.next() {
            assert!(next > step);
            visited.push(next);
            step = next;
        }
        assert_eq!(step, WorkflowStep::Completed);
        assert_eq!(visited.len(), 7);
        assert!(WorkflowStep::Rejected.next().is_none());
    }

    #[test]
    fn test_string_round_trip() {
        assert_eq!(WorkflowStep::InitialReview.to_string(), "initial_review");
        assert_eq!(
            WorkflowStep::from_str("compliance_review").unwrap(),
            WorkflowStep::ComplianceReview
        );
        assert_eq!(KycType::Ecdd.to_string(), "ECDD");
        assert_eq!(KycType::from_str("CDD").unwrap(), KycType::Cdd);
        assert_eq!(
            CustomerStatus::RequiresAdditionalInfo.to_string(),
            "requires_additional_info"
        );
    }

    #[test]
    fn test_serde_matches_display() {
        let json = serde_json::to_string(&AlertType::SanctionsHit).unwrap();
        assert_eq!(json, "\"sanctions_hit\"");
        let json = serde_json::to_string(&KycType::Ecdd).unwrap();
        assert_eq!(json, "\"ECDD\"");
    }

    #[test]
    fn test_alert_status_activity() {
        assert!(AlertStatus::Open.is_active());
        assert!(AlertStatus::Investigating.is_active());
        assert!(AlertStatus::Resolved.is_terminal());
        assert!(AlertStatus::FalsePositive.is_terminal());
    }

    #[test]
    fn test_document_evidence() {
        assert_eq!(DocumentType::Passport.evidences(), Some(VerificationCheck::Identity));
        assert_eq!(DocumentType::UtilityBill.evidences(), Some(VerificationCheck::Address));
        assert_eq!(DocumentType::TaxCertificate.evidences(), None);
    }
}
