//! Onboarding workflow state machine
//!
//! ```text
//! initiated ─► documents_uploaded ─► initial_review ─► risk_assessment
//!     ─► compliance_review ─► final_approval ─► completed
//!
//! any non-terminal step ──reject──► rejected
//! ```
//!
//! Steps only move forward. Each forward move is gated on the flags
//! required to leave the current step:
//!
//! | leaving              | requires                                              |
//! |----------------------|-------------------------------------------------------|
//! | initiated            | at least one document on file                         |
//! | documents_uploaded   | documents_complete                                    |
//! | initial_review       | documents_complete                                    |
//! | risk_assessment      | risk_assessed                                         |
//! | compliance_review    | identity + address verified, all screenings cleared   |
//! | final_approval       | compliance_approved                                   |

use chrono::{DateTime, Utc};
use kycflow_core::{
    Actor, AuditAction, AuditEntry, CustomerRecord, CustomerStatus, Document, DocumentUpload,
    VerificationStatus, WorkflowCheck, WorkflowStep,
};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::ComplianceConfig;
use crate::error::{ComplianceError, ComplianceResult};

/// Drives a customer's workflow and compliance decisions
#[derive(Debug, Clone)]
pub struct WorkflowStateMachine {
    config: ComplianceConfig,
}

impl WorkflowStateMachine {
    pub fn new(config: ComplianceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ComplianceConfig {
        &self.config
    }

    /// Can the record leave its current step?
    pub fn is_ready(&self, record: &CustomerRecord) -> bool {
        let w = &record.workflow;
        match w.current_step {
            WorkflowStep::Initiated => !record.documents.is_empty(),
            WorkflowStep::DocumentsUploaded | WorkflowStep::InitialReview => w.documents_complete,
            WorkflowStep::RiskAssessment => w.risk_assessed,
            WorkflowStep::ComplianceReview => {
                w.identity_verified
                    && w.address_verified
                    && w.sanctions_cleared
                    && w.pep_cleared
                    && w.adverse_media_cleared
            }
            WorkflowStep::FinalApproval => w.compliance_approved,
            WorkflowStep::Completed | WorkflowStep::Rejected => false,
        }
    }

    /// Move one step forward if the current step's preconditions hold
    ///
    /// Fails with `InvalidState` on a terminal workflow.
    pub fn advance_if_ready(
        &self,
        record: &mut CustomerRecord,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ComplianceResult<Option<AuditEntry>> {
        let current = record.workflow.current_step;
        if current.is_terminal() {
            return Err(ComplianceError::InvalidState(format!(
                "workflow for customer {} is already {}",
                record.id(),
                current
            )));
        }
        if !self.is_ready(record) {
            debug!(customer_id = %record.id(), step = %current, "Workflow not ready to advance");
            return Ok(None);
        }
        let next = match current.next() {
            Some(next) => next,
            None => return Ok(None),
        };

        record.workflow.current_step = next;
        if next == WorkflowStep::Completed {
            record.workflow.completed_at = Some(now);
        }

        let previous_status = record.customer.status;
        if matches!(
            previous_status,
            CustomerStatus::Pending | CustomerStatus::RequiresAdditionalInfo
        ) {
            record.customer.status = CustomerStatus::UnderReview;
        }
        record.touch(now);

        info!(customer_id = %record.id(), from = %current, to = %next, "Workflow advanced");

        Ok(Some(
            AuditEntry::new(
                record.id(),
                AuditAction::WorkflowAdvance,
                format!("Workflow advanced from {} to {}", current, next),
                actor,
                now,
            )
            .with_change("current_step", current, next)
            .with_data(json!({
                "status_before": previous_status,
                "status_after": record.customer.status,
            })),
        ))
    }

    /// Advance repeatedly until a precondition is missing; no-op when terminal
    pub fn advance_while_ready(
        &self,
        record: &mut CustomerRecord,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> Vec<AuditEntry> {
        let mut entries = Vec::new();
        while !record.workflow.is_terminal() {
            match self.advance_if_ready(record, actor, now) {
                Ok(Some(entry)) => entries.push(entry),
                _ => break,
            }
        }
        entries
    }

    /// Approve the customer and complete the workflow
    pub fn approve(
        &self,
        record: &mut CustomerRecord,
        reviewer: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        ensure_undecided(record, "approve")?;
        let previous_status = record.customer.status;
        let previous_step = record.workflow.current_step;
        let next_review = now + self.config.review_interval(record.customer.risk_level);

        let customer = &mut record.customer;
        customer.status = CustomerStatus::Approved;
        customer.reviewed_by = Some(reviewer.id.clone());
        customer.review_notes = notes.to_string();
        customer.approved_at = Some(now);
        customer.next_review_date = Some(next_review);

        record.workflow.compliance_approved = true;
        record.workflow.current_step = WorkflowStep::Completed;
        record.workflow.completed_at = Some(now);
        record.touch(now);

        info!(customer_id = %record.id(), reviewer = %reviewer.id, "Customer approved");

        Ok(AuditEntry::new(
            record.id(),
            AuditAction::Approve,
            format!("Customer approved by {}", reviewer.name),
            reviewer,
            now,
        )
        .with_change("status", previous_status, CustomerStatus::Approved)
        .with_data(json!({
            "notes": notes,
            "step_before": previous_step,
            "step_after": WorkflowStep::Completed,
            "next_review_date": next_review,
        })))
    }

    /// Reject the customer; terminal
    pub fn reject(
        &self,
        record: &mut CustomerRecord,
        reviewer: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        ensure_undecided(record, "reject")?;
        let previous_status = record.customer.status;
        let previous_step = record.workflow.current_step;

        let customer = &mut record.customer;
        customer.status = CustomerStatus::Rejected;
        customer.reviewed_by = Some(reviewer.id.clone());
        customer.review_notes = notes.to_string();
        customer.rejected_at = Some(now);

        record.workflow.current_step = WorkflowStep::Rejected;
        record.touch(now);

        info!(customer_id = %record.id(), reviewer = %reviewer.id, "Customer rejected");

        Ok(AuditEntry::new(
            record.id(),
            AuditAction::Reject,
            format!("Customer rejected by {}", reviewer.name),
            reviewer,
            now,
        )
        .with_change("status", previous_status, CustomerStatus::Rejected)
        .with_data(json!({
            "notes": notes,
            "step_before": previous_step,
            "step_after": WorkflowStep::Rejected,
        })))
    }

    /// Ask the customer for more information
    ///
    /// The workflow step and completion flags are left untouched.
    pub fn request_additional_info(
        &self,
        record: &mut CustomerRecord,
        reviewer: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        ensure_undecided(record, "request additional information for")?;
        let previous_status = record.customer.status;

        record.customer.status = CustomerStatus::RequiresAdditionalInfo;
        record.customer.reviewed_by = Some(reviewer.id.clone());
        record.customer.review_notes = notes.to_string();
        record.touch(now);

        Ok(AuditEntry::new(
            record.id(),
            AuditAction::StatusChange,
            format!("Additional information requested by {}", reviewer.name),
            reviewer,
            now,
        )
        .with_change("status", previous_status, CustomerStatus::RequiresAdditionalInfo)
        .with_data(json!({
            "notes": notes,
            "step": record.workflow.current_step,
        })))
    }

    /// Suspend an approved customer
    pub fn suspend(
        &self,
        record: &mut CustomerRecord,
        reviewer: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        if record.customer.status != CustomerStatus::Approved {
            return Err(ComplianceError::InvalidState(format!(
                "cannot suspend customer {} in status {}",
                record.id(),
                record.customer.status
            )));
        }
        record.customer.status = CustomerStatus::Suspended;
        record.customer.review_notes = notes.to_string();
        record.customer.reviewed_by = Some(reviewer.id.clone());
        record.touch(now);

        info!(customer_id = %record.id(), reviewer = %reviewer.id, "Customer suspended");

        Ok(AuditEntry::new(
            record.id(),
            AuditAction::Suspend,
            format!("Customer suspended by {}", reviewer.name),
            reviewer,
            now,
        )
        .with_change("status", CustomerStatus::Approved, CustomerStatus::Suspended)
        .with_data(json!({ "notes": notes })))
    }

    /// Attach a document; sets `documents_complete` once every required type is on file
    pub fn record_document(
        &self,
        record: &mut CustomerRecord,
        upload: DocumentUpload,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ComplianceResult<(Uuid, AuditEntry)> {
        upload
            .validate()
            .map_err(|e| ComplianceError::Validation(e.to_string()))?;
        if record.workflow.current_step == WorkflowStep::Rejected {
            return Err(ComplianceError::InvalidState(format!(
                "customer {} has been rejected",
                record.id()
            )));
        }

        let document = Document::from_upload(upload, now);
        let document_id = document.id;
        let description = format!(
            "Document uploaded: {} ({})",
            document.document_name, document.document_type
        );
        let document_type = document.document_type;
        record.documents.push(document);

        let required = self.config.required_documents.for_type(record.customer.customer_type);
        let completed_now = !record.workflow.documents_complete && record.has_documents(required);
        if completed_now {
            record.workflow.set(WorkflowCheck::DocumentsComplete, true);
        }
        record.touch(now);

        let entry = AuditEntry::new(record.id(), AuditAction::DocumentUpload, description, actor, now)
            .with_data(json!({
                "document_id": document_id,
                "document_type": document_type,
                "documents_complete": record.workflow.documents_complete,
            }));
        Ok((document_id, entry))
    }

    /// Mark a pending document verified; sets the identity/address check it evidences
    pub fn verify_document(
        &self,
        record: &mut CustomerRecord,
        document_id: Uuid,
        verifier: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        let document = pending_document(record, document_id)?;
        document.verification_status = VerificationStatus::Verified;
        document.verified_by = Some(verifier.id.clone());
        document.verified_at = Some(now);
        document.verification_notes = notes.to_string();
        let document_type = document.document_type;
        let document_name = document.document_name.clone();

        let check = document_type.evidences().map(|c| match c {
            kycflow_core::VerificationCheck::Identity => WorkflowCheck::IdentityVerified,
            kycflow_core::VerificationCheck::Address => WorkflowCheck::AddressVerified,
        });
        if let Some(check) = check {
            record.workflow.set(check, true);
        }
        record.touch(now);

        Ok(AuditEntry::new(
            record.id(),
            AuditAction::DocumentVerify,
            format!("Document verified: {} ({})", document_name, document_type),
            verifier,
            now,
        )
        .with_change("verification_status", VerificationStatus::Pending, VerificationStatus::Verified)
        .with_data(json!({
            "document_id": document_id,
            "notes": notes,
            "check": check,
        })))
    }

    /// Mark a pending document rejected
    pub fn reject_document(
        &self,
        record: &mut CustomerRecord,
        document_id: Uuid,
        verifier: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        let document = pending_document(record, document_id)?;
        document.verification_status = VerificationStatus::Rejected;
        document.verified_by = Some(verifier.id.clone());
        document.verified_at = Some(now);
        document.verification_notes = notes.to_string();
        let description = format!(
            "Document rejected: {} ({})",
            document.document_name, document.document_type
        );
        record.touch(now);

        Ok(AuditEntry::new(record.id(), AuditAction::DocumentVerify, description, verifier, now)
            .with_change("verification_status", VerificationStatus::Pending, VerificationStatus::Rejected)
            .with_data(json!({ "document_id": document_id, "notes": notes })))
    }

    /// Assign the customer's compliance officer
    ///
    /// The officer's existence is checked by the caller.
    pub fn assign_officer(
        &self,
        record: &mut CustomerRecord,
        officer_id: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> AuditEntry {
        let previous = record
            .customer
            .compliance_officer
            .replace(officer_id.to_string())
            .unwrap_or_default();
        record.workflow.assigned_to = Some(officer_id.to_string());
        record.touch(now);

        AuditEntry::new(
            record.id(),
            AuditAction::Update,
            format!("Compliance officer assigned: {}", officer_id),
            actor,
            now,
        )
        .with_change("compliance_officer", previous, officer_id)
    }
}

fn ensure_undecided(record: &CustomerRecord, action: &str) -> ComplianceResult<()> {
    let status = record.customer.status;
    if status.is_decided() || record.workflow.is_terminal() {
        return Err(ComplianceError::InvalidState(format!(
            "cannot {} customer {} in status {} (step {})",
            action,
            record.id(),
            status,
            record.workflow.current_step
        )));
    }
    Ok(())
}

fn pending_document(record: &mut CustomerRecord, document_id: Uuid) -> ComplianceResult<&mut Document> {
    let document = record
        .document_mut(document_id)
        .ok_or(ComplianceError::DocumentNotFound(document_id))?;
    if document.verification_status != VerificationStatus::Pending {
        return Err(ComplianceError::InvalidState(format!(
            "document {} is already {}",
            document_id, document.verification_status
        )));
    }
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kycflow_core::{CustomerIntake, CustomerType, DocumentType, RiskLevel};

    fn record() -> CustomerRecord {
        CustomerRecord::new(
            CustomerIntake {
                customer_type: CustomerType::Individual,
                name: "Jane Doe".to_string(),
                email: "jane@example.com".to_string(),
                phone_number: None,
                individual_details: None,
                corporate_details: None,
            },
            "CUST-20240101-0001".to_string(),
            Utc::now(),
        )
    }

    fn upload(document_type: DocumentType) -> DocumentUpload {
        DocumentUpload {
            document_type,
            document_name: format!("{}.pdf", document_type),
            file_hash: "deadbeef".to_string(),
            file_size: 1024,
            document_number: None,
            issue_date: None,
            expiry_date: None,
        }
    }

    fn machine() -> WorkflowStateMachine {
        WorkflowStateMachine::new(ComplianceConfig::default())
    }

    fn officer() -> Actor {
        Actor::new("officer-1", "Officer One")
    }

    #[test]
    fn test_documents_drive_first_steps() {
        let m = machine();
        let mut r = record();
        let now = Utc::now();

        assert!(m.advance_while_ready(&mut r, &officer(), now).is_empty());

        m.record_document(&mut r, upload(DocumentType::Passport), &officer(), now).unwrap();
        let moved = m.advance_while_ready(&mut r, &officer(), now);
        assert_eq!(moved.len(), 1);
        assert_eq!(r.workflow.current_step, WorkflowStep::DocumentsUploaded);
        assert_eq!(r.customer.status, CustomerStatus::UnderReview);

        m.record_document(&mut r, upload(DocumentType::UtilityBill), &officer(), now).unwrap();
        assert!(r.workflow.documents_complete);
        let moved = m.advance_while_ready(&mut r, &officer(), now);
        assert_eq!(moved.len(), 2);
        assert_eq!(r.workflow.current_step, WorkflowStep::RiskAssessment);
    }

    #[test]
    fn test_full_forward_walk() {
        let m = machine();
        let mut r = record();
        let now = Utc::now();

        let (passport, _) = m.record_document(&mut r, upload(DocumentType::Passport), &officer(), now).unwrap();
        let (bill, _) = m.record_document(&mut r, upload(DocumentType::UtilityBill), &officer(), now).unwrap();
        r.workflow.risk_assessed = true;
        m.advance_while_ready(&mut r, &officer(), now);
        assert_eq!(r.workflow.current_step, WorkflowStep::ComplianceReview);

        m.verify_document(&mut r, passport, &officer(), "ok", now).unwrap();
        m.verify_document(&mut r, bill, &officer(), "ok", now).unwrap();
        assert!(r.workflow.identity_verified && r.workflow.address_verified);
        m.advance_while_ready(&mut r, &officer(), now);
        // Screening has not cleared yet
        assert_eq!(r.workflow.current_step, WorkflowStep::ComplianceReview);

        r.workflow.sanctions_cleared = true;
        r.workflow.pep_cleared = true;
        r.workflow.adverse_media_cleared = true;
        m.advance_while_ready(&mut r, &officer(), now);
        assert_eq!(r.workflow.current_step, WorkflowStep::FinalApproval);
    }

    #[test]
    fn test_advance_never_regresses() {
        let m = machine();
        let mut r = record();
        let now = Utc::now();
        let mut last = r.workflow.current_step;

        m.record_document(&mut r, upload(DocumentType::Passport), &officer(), now).unwrap();
        m.record_document(&mut r, upload(DocumentType::UtilityBill), &officer(), now).unwrap();
        r.workflow.risk_assessed = true;
        for entry in m.advance_while_ready(&mut r, &officer(), now) {
            let to: WorkflowStep = entry.new_value.unwrap().parse().unwrap();
            assert!(to > last);
            last = to;
        }
    }

    #[test]
    fn test_approve_completes_workflow() {
        let m = machine();
        let mut r = record();
        r.customer.risk_level = RiskLevel::High;
        let now = Utc::now();

        let entry = m.approve(&mut r, &officer(), "all good", now).unwrap();
        assert_eq!(r.customer.status, CustomerStatus::Approved);
        assert_eq!(r.workflow.current_step, WorkflowStep::Completed);
        assert!(r.workflow.compliance_approved);
        assert_eq!(r.customer.approved_at, Some(now));
        assert_eq!(r.customer.next_review_date, Some(now + chrono::Duration::days(90)));
        assert_eq!(entry.action, AuditAction::Approve);
        assert_eq!(entry.new_value.as_deref(), Some("approved"));
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        let m = machine();
        let now = Utc::now();

        let mut approved = record();
        m.approve(&mut approved, &officer(), "", now).unwrap();
        assert!(matches!(
            m.reject(&mut approved, &officer(), "", now),
            Err(ComplianceError::InvalidState(_))
        ));
        assert!(m.approve(&mut approved, &officer(), "", now).is_err());
        assert!(m.advance_if_ready(&mut approved, &officer(), now).is_err());

        let mut rejected = record();
        m.reject(&mut rejected, &officer(), "fraud", now).unwrap();
        assert_eq!(rejected.workflow.current_step, WorkflowStep::Rejected);
        assert!(m.approve(&mut rejected, &officer(), "", now).is_err());
        assert!(m.request_additional_info(&mut rejected, &officer(), "", now).is_err());
        assert!(m.record_document(&mut rejected, upload(DocumentType::Passport), &officer(), now).is_err());
    }

    #[test]
    fn test_request_info_keeps_progress() {
        let m = machine();
        let mut r = record();
        let now = Utc::now();
        m.record_document(&mut r, upload(DocumentType::Passport), &officer(), now).unwrap();
        m.record_document(&mut r, upload(DocumentType::UtilityBill), &officer(), now).unwrap();
        m.advance_while_ready(&mut r, &officer(), now);
        let step = r.workflow.current_step;

        m.request_additional_info(&mut r, &officer(), "proof of address is blurry", now)
            .unwrap();
        assert_eq!(r.customer.status, CustomerStatus::RequiresAdditionalInfo);
        assert_eq!(r.workflow.current_step, step);
        assert!(r.workflow.documents_complete);
    }

    #[test]
    fn test_suspend_requires_approval() {
        let m = machine();
        let now = Utc::now();
        let mut r = record();
        assert!(m.suspend(&mut r, &officer(), "", now).is_err());

        m.approve(&mut r, &officer(), "", now).unwrap();
        m.suspend(&mut r, &officer(), "adverse news", now).unwrap();
        assert_eq!(r.customer.status, CustomerStatus::Suspended);
        assert!(m.request_additional_info(&mut r, &officer(), "", now).is_err());
    }

    #[test]
    fn test_document_verification_rules() {
        let m = machine();
        let now = Utc::now();
        let mut r = record();
        let (id, _) = m.record_document(&mut r, upload(DocumentType::Passport), &officer(), now).unwrap();

        m.reject_document(&mut r, id, &officer(), "expired scan", now).unwrap();
        assert!(!r.workflow.identity_verified);
        assert!(matches!(
            m.verify_document(&mut r, id, &officer(), "", now),
            Err(ComplianceError::InvalidState(_))
        ));
        assert!(matches!(
            m.verify_document(&mut r, Uuid::new_v4(), &officer(), "", now),
            Err(ComplianceError::DocumentNotFound(_))
        ));
    }

    #[test]
    fn test_assign_officer() {
        let m = machine();
        let mut r = record();
        let entry = m.assign_officer(&mut r, "officer-7", &officer(), Utc::now());
        assert_eq!(r.customer.compliance_officer.as_deref(), Some("officer-7"));
        assert_eq!(r.workflow.assigned_to.as_deref(), Some("officer-7"));
        assert_eq!(entry.new_value.as_deref(), Some("officer-7"));
    }
}
