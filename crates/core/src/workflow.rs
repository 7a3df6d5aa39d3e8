//! Onboarding workflow state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::types::WorkflowStep;

/// Completion flags tracked by the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkflowCheck {
    DocumentsComplete,
    IdentityVerified,
    AddressVerified,
    SanctionsCleared,
    PepCleared,
    AdverseMediaCleared,
    RiskAssessed,
    ComplianceApproved,
}

/// Workflow position and completion flags for one customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    pub current_step: WorkflowStep,

    pub documents_complete: bool,
    pub identity_verified: bool,
    pub address_verified: bool,
    pub sanctions_cleared: bool,
    pub pep_cleared: bool,
    pub adverse_media_cleared: bool,
    pub risk_assessed: bool,
    pub compliance_approved: bool,

    pub assigned_to: Option<String>,
    pub initiated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkflowState {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            current_step: WorkflowStep::Initiated,
            documents_complete: false,
            identity_verified: false,
            address_verified: false,
            sanctions_cleared: false,
            pep_cleared: false,
            adverse_media_cleared: false,
            risk_assessed: false,
            compliance_approved: false,
            assigned_to: None,
            initiated_at: now,
            completed_at: None,
        }
    }

    pub fn is_set(&self, check: WorkflowCheck) -> bool {
        match check {
            WorkflowCheck::DocumentsComplete => self.documents_complete,
            WorkflowCheck::IdentityVerified => self.identity_verified,
            WorkflowCheck::AddressVerified => self.address_verified,
            WorkflowCheck::SanctionsCleared => self.sanctions_cleared,
            WorkflowCheck::PepCleared => self.pep_cleared,
            WorkflowCheck::AdverseMediaCleared => self.adverse_media_cleared,
            WorkflowCheck::RiskAssessed => self.risk_assessed,
            WorkflowCheck::ComplianceApproved => self.compliance_approved,
        }
    }

    /// Set a flag, returning its previous value
    pub fn set(&mut self, check: WorkflowCheck, value: bool) -> bool {
        let slot = match check {
            WorkflowCheck::DocumentsComplete => &mut self.documents_complete,
            WorkflowCheck::IdentityVerified => &mut self.identity_verified,
            WorkflowCheck::AddressVerified => &mut self.address_verified,
            WorkflowCheck::SanctionsCleared => &mut self.sanctions_cleared,
            WorkflowCheck::PepCleared => &mut self.pep_cleared,
            WorkflowCheck::AdverseMediaCleared => &mut self.adverse_media_cleared,
            WorkflowCheck::RiskAssessed => &mut self.risk_assessed,
            WorkflowCheck::ComplianceApproved => &mut self.compliance_approved,
        };
        std::mem::replace(slot, value)
    }

    pub fn is_terminal(&self) -> bool {
        self.current_step.is_terminal()
    }

    /// Flags that are still unset, in declaration order
    pub fn outstanding(&self) -> Vec<WorkflowCheck> {
        [
            WorkflowCheck::DocumentsComplete,
            WorkflowCheck::IdentityVerified,
            WorkflowCheck::AddressVerified,
            WorkflowCheck::SanctionsCleared,
            WorkflowCheck::PepCleared,
            WorkflowCheck::AdverseMediaCleared,
            WorkflowCheck::RiskAssessed,
            WorkflowCheck::ComplianceApproved,
        ]
        .into_iter()
        .filter(|c| !self.is_set(*c))
        .collect()
    }
}
