//! Periodic review and document expiry rules

use chrono::{DateTime, Utc};
use kycflow_core::{
    Actor, AlertType, AuditAction, AuditEntry, CustomerRecord, CustomerStatus, Severity,
};
use serde_json::json;

use crate::alert::AlertRequest;
use crate::config::ComplianceConfig;

/// An approved customer whose review date has passed
pub fn is_review_due(record: &CustomerRecord, now: DateTime<Utc>) -> bool {
    record.customer.status == CustomerStatus::Approved
        && record
            .customer
            .next_review_date
            .map(|due| due <= now)
            .unwrap_or(false)
}

/// `review_due` alert for a customer
pub fn review_due_alert(record: &CustomerRecord) -> AlertRequest {
    let customer = &record.customer;
    AlertRequest {
        customer_id: customer.id,
        alert_type: AlertType::ReviewDue,
        severity: Severity::Medium,
        title: format!("Periodic review due for {}", customer.name),
        description: format!(
            "Customer {} ({} risk) is due for periodic review",
            customer.customer_reference, customer.risk_level
        ),
        triggered_by: "periodic_review".to_string(),
        evidence: json!({
            "risk_level": customer.risk_level,
            "next_review_date": customer.next_review_date,
        }),
    }
}

/// Move `next_review_date` forward by the cadence for the customer's risk level
pub fn schedule_next_review(
    record: &mut CustomerRecord,
    config: &ComplianceConfig,
    actor: &Actor,
    now: DateTime<Utc>,
) -> AuditEntry {
    let previous = record.customer.next_review_date;
    let next = now + config.review_interval(record.customer.risk_level);
    record.customer.next_review_date = Some(next);
    record.touch(now);

    AuditEntry::new(
        record.id(),
        AuditAction::Update,
        format!("Next periodic review scheduled for {}", next.date_naive()),
        actor,
        now,
    )
    .with_change(
        "next_review_date",
        previous.map(|d| d.to_rfc3339()).unwrap_or_default(),
        next.to_rfc3339(),
    )
}

/// `document_expiry` alerts for verified documents inside the expiry window
pub fn expiring_document_alerts(
    record: &CustomerRecord,
    config: &ComplianceConfig,
    now: DateTime<Utc>,
) -> Vec<AlertRequest> {
    let today = now.date_naive();
    record
        .documents
        .iter()
        .filter(|d| d.expires_within(today, config.document_expiry_window_days))
        .filter_map(|d| {
            let expiry = d.expiry_date?;
            let days_left = (expiry - today).num_days();
            Some(AlertRequest {
                customer_id: record.id(),
                alert_type: AlertType::DocumentExpiry,
                severity: Severity::Medium,
                title: format!("Document expiring: {}", d.document_type),
                description: format!(
                    "{} for {} expires on {} ({} days)",
                    d.document_name, record.customer.name, expiry, days_left
                ),
                triggered_by: "document_expiry_check".to_string(),
                evidence: json!({
                    "document_id": d.id,
                    "document_type": d.document_type,
                    "expiry_date": expiry,
                    "days_left": days_left,
                }),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};
    use kycflow_core::{
        CustomerIntake, CustomerType, Document, DocumentType, DocumentUpload, RiskLevel,
        VerificationStatus,
    };

    fn record(now: DateTime<Utc>) -> CustomerRecord {
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
            now,
        )
    }

    fn verified(document_type: DocumentType, expiry: NaiveDate, now: DateTime<Utc>) -> Document {
        let mut doc = Document::from_upload(
            DocumentUpload {
                document_type,
                document_name: format!("{}.pdf", document_type),
                file_hash: "cafe".to_string(),
                file_size: 10,
                document_number: None,
                issue_date: None,
                expiry_date: Some(expiry),
            },
            now,
        );
        doc.verification_status = VerificationStatus::Verified;
        doc
    }

    #[test]
    fn test_review_due_only_for_approved() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let mut r = record(now);
        r.customer.next_review_date = Some(now - chrono::Duration::days(1));
        assert!(!is_review_due(&r, now));

        r.customer.status = CustomerStatus::Approved;
        assert!(is_review_due(&r, now));

        r.customer.next_review_date = Some(now + chrono::Duration::days(1));
        assert!(!is_review_due(&r, now));
    }

    #[test]
    fn test_schedule_next_review_by_risk() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let config = ComplianceConfig::default();
        let mut r = record(now);
        r.customer.status = CustomerStatus::Approved;
        r.customer.risk_level = RiskLevel::Critical;
        r.customer.next_review_date = Some(now);

        let entry = schedule_next_review(&mut r, &config, &Actor::system("scheduler"), now);
        assert_eq!(r.customer.next_review_date, Some(now + chrono::Duration::days(30)));
        assert!(!is_review_due(&r, now));
        assert_eq!(entry.field_changed.as_deref(), Some("next_review_date"));
    }

    #[test]
    fn test_expiring_documents() {
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let config = ComplianceConfig::default();
        let mut r = record(now);
        r.documents.push(verified(DocumentType::Passport, NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(), now));
        r.documents.push(verified(DocumentType::UtilityBill, NaiveDate::from_ymd_opt(2024, 9, 1).unwrap(), now));

        let alerts = expiring_document_alerts(&r, &config, now);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::DocumentExpiry);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert_eq!(alerts[0].evidence["days_left"], 14);
    }
}
