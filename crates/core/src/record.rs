//! Per-customer aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::assessment::RiskAssessment;
use crate::customer::{Customer, CustomerIntake};
use crate::document::Document;
use crate::types::{CustomerStatus, DocumentType};
use crate::workflow::WorkflowState;

/// Customer plus everything mutated together with it
///
/// `version` is bumped by the store on every commit and checked against the
/// stored value, so a stale copy can never overwrite a newer one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub customer: Customer,
    pub documents: Vec<Document>,
    pub risk_assessment: RiskAssessment,
    pub workflow: WorkflowState,
    pub risk_assessed_at: Option<DateTime<Utc>>,
    pub version: u64,
}

impl CustomerRecord {
    /// New aggregate with assessment and workflow initialised
    pub fn new(intake: CustomerIntake, reference: String, now: DateTime<Utc>) -> Self {
        Self {
            customer: Customer::from_intake(intake, reference, now),
            documents: Vec::new(),
            risk_assessment: RiskAssessment::initial(),
            workflow: WorkflowState::new(now),
            risk_assessed_at: None,
            version: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.customer.id
    }

    pub fn status(&self) -> CustomerStatus {
        self.customer.status
    }

    pub fn document(&self, id: Uuid) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn document_mut(&mut self, id: Uuid) -> Option<&mut Document> {
        self.documents.iter_mut().find(|d| d.id == id)
    }

    /// Is at least one non-rejected document of each required type on file?
    pub fn has_documents(&self, required: &[DocumentType]) -> bool {
        required.iter().all(|doc_type| {
            self.documents.iter().any(|d| {
                d.document_type == *doc_type
                    && d.verification_status != crate::types::VerificationStatus::Rejected
            })
        })
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.customer.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::DocumentUpload;
    use crate::types::{CustomerType, VerificationStatus, WorkflowStep};

    fn record() -> CustomerRecord {
        let intake = CustomerIntake {
            customer_type: CustomerType::Individual,
            name: "Jane Doe".to_string(),
            email: "jane@example.com".to_string(),
            phone_number: None,
            individual_details: None,
            corporate_details: None,
        };
        CustomerRecord::new(intake, "CUST-20240101-0001".to_string(), Utc::now())
    }

    fn doc(doc_type: DocumentType) -> Document {
        Document::from_upload(
            DocumentUpload {
                document_type: doc_type,
                document_name: format!("{}.pdf", doc_type),
                file_hash: "hash".to_string(),
                file_size: 1,
                document_number: None,
                issue_date: None,
                expiry_date: None,
            },
            Utc::now(),
        )
    }

    #[test]
    fn test_new_record_is_initialised() {
        let r = record();
        assert_eq!(r.version, 0);
        assert_eq!(r.workflow.current_step, WorkflowStep::Initiated);
        assert!(r.risk_assessed_at.is_none());
        assert_eq!(r.status(), CustomerStatus::Pending);
    }

    #[test]
    fn test_required_documents() {
        let mut r = record();
        let required = [DocumentType::Passport, DocumentType::UtilityBill];
        r.documents.push(doc(DocumentType::Passport));
        assert!(!r.has_documents(&required));

        r.documents.push(doc(DocumentType::UtilityBill));
        assert!(r.has_documents(&required));

        r.documents[1].verification_status = VerificationStatus::Rejected;
        assert!(!r.has_documents(&required));
    }
}
