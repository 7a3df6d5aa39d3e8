//! Store behaviour, exercised against both backends

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use kycflow_core::{
    Actor, AlertStatus, AlertType, AuditAction, AuditChain, AuditEntry, ComplianceAlert,
    CustomerIntake, CustomerRecord, CustomerStatus, CustomerType, Document, DocumentType,
    DocumentUpload, RiskLevel, Severity, VerificationStatus,
};
use kycflow_store::{
    AlertFilter, ChangeSet, CustomerFilter, KycStore, MemoryStore, SqliteStore, StoreError,
};
use tempfile::TempDir;
use uuid::Uuid;

fn now() -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 9, 30, 0).unwrap()
}

fn record(name: &str, customer_type: CustomerType) -> CustomerRecord {
    CustomerRecord::new(
        CustomerIntake {
            customer_type,
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            phone_number: None,
            individual_details: None,
            corporate_details: None,
        },
        format!("CUST-20240301-{:04}", name.len()),
        now(),
    )
}

fn created_entry(record: &CustomerRecord) -> AuditEntry {
    AuditEntry::new(
        record.id(),
        AuditAction::Create,
        "Customer created",
        &Actor::system("test"),
        now(),
    )
}

fn alert(customer_id: Uuid, severity: Severity) -> ComplianceAlert {
    ComplianceAlert {
        id: Uuid::new_v4(),
        customer_id,
        alert_type: AlertType::SanctionsHit,
        severity,
        status: AlertStatus::Open,
        title: "Sanctions match".to_string(),
        description: "Screening reported a sanctions match".to_string(),
        triggered_by: "screening".to_string(),
        source_data: serde_json::json!({ "list": "OFAC" }),
        assigned_to: None,
        resolved_by: None,
        resolution_notes: String::new(),
        resolved_at: None,
        created_at: now(),
        updated_at: now(),
    }
}

async fn create(store: &dyn KycStore, record: CustomerRecord) -> CustomerRecord {
    let mut chain = store.last_audit_link(record.id()).await.unwrap();
    let entry = chain.seal(created_entry(&record));
    let id = record.id();
    store
        .commit(ChangeSet::for_customer(record).with_audit([entry]))
        .await
        .unwrap();
    store.load_customer(id).await.unwrap()
}

async fn commit_and_versioning(store: &dyn KycStore) {
    let stored = create(store, record("Jane Doe", CustomerType::Individual)).await;
    assert_eq!(stored.version, 1);

    let mut updated = stored.clone();
    updated.customer.status = CustomerStatus::UnderReview;
    let version = store.commit(ChangeSet::for_customer(updated)).await.unwrap();
    assert_eq!(version, Some(2));

    // Writing the stale copy again must conflict
    let result = store.commit(ChangeSet::for_customer(stored.clone())).await;
    assert!(matches!(
        result,
        Err(StoreError::Conflict { expected: 1, actual: 2, .. })
    ));

    let reloaded = store.load_customer(stored.id()).await.unwrap();
    assert_eq!(reloaded.customer.status, CustomerStatus::UnderReview);
    assert_eq!(reloaded.version, 2);
}

async fn missing_rows(store: &dyn KycStore) {
    let id = Uuid::new_v4();
    assert!(matches!(
        store.load_customer(id).await,
        Err(StoreError::CustomerNotFound(missing)) if missing == id
    ));
    assert!(matches!(
        store.load_alert(id).await,
        Err(StoreError::AlertNotFound(_))
    ));
    assert!(store.audit_trail(id).await.unwrap().is_empty());
    assert_eq!(store.last_audit_link(id).await.unwrap(), AuditChain::genesis());
}

async fn audit_chain_is_enforced(store: &dyn KycStore) {
    let stored = create(store, record("Audit Person", CustomerType::Individual)).await;
    let id = stored.id();

    // Unsealed entries are rejected
    let unsealed = created_entry(&stored);
    let result = store.commit(ChangeSet::default().with_audit([unsealed])).await;
    assert!(matches!(result, Err(StoreError::AuditChain { .. })));

    // An entry sealed against genesis does not extend the stored chain
    let forked = AuditChain::genesis().seal(created_entry(&stored));
    let result = store.commit(ChangeSet::default().with_audit([forked])).await;
    assert!(matches!(result, Err(StoreError::AuditChain { .. })));

    // Tampered content fails the hash check
    let mut chain = store.last_audit_link(id).await.unwrap();
    let mut tampered = chain.seal(created_entry(&stored));
    tampered.description = "something else".to_string();
    let result = store.commit(ChangeSet::default().with_audit([tampered])).await;
    assert!(matches!(result, Err(StoreError::AuditChain { .. })));

    // A failed commit writes nothing, including the customer update
    let mut changed = stored.clone();
    changed.customer.status = CustomerStatus::Rejected;
    let bad = AuditChain::genesis().seal(created_entry(&stored));
    assert!(store
        .commit(ChangeSet::for_customer(changed).with_audit([bad]))
        .await
        .is_err());
    assert_eq!(
        store.load_customer(id).await.unwrap().customer.status,
        CustomerStatus::Pending
    );

    // Two well-formed entries in one change set
    let mut chain = store.last_audit_link(id).await.unwrap();
    let entries = chain.seal_all(vec![created_entry(&stored), created_entry(&stored)]);
    store
        .commit(ChangeSet::default().with_audit(entries))
        .await
        .unwrap();

    let trail = store.audit_trail(id).await.unwrap();
    assert_eq!(trail.len(), 3);
    assert_eq!(
        trail.iter().map(|e| e.sequence).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(kycflow_core::verify_chain(&trail).is_ok());
}

async fn filters_and_stats(store: &dyn KycStore) {
    let individual = create(store, record("Ann Lee", CustomerType::Individual)).await;
    let mut corporate = create(store, record("Acme Holdings", CustomerType::Corporate)).await;
    corporate.customer.risk_level = RiskLevel::High;
    corporate.customer.status = CustomerStatus::UnderReview;
    store
        .commit(ChangeSet::for_customer(corporate.clone()))
        .await
        .unwrap();

    let corporates = store
        .query_customers(&CustomerFilter {
            customer_type: Some(CustomerType::Corporate),
            ..CustomerFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(corporates.len(), 1);
    assert_eq!(corporates[0].id(), corporate.id());

    let high = store
        .query_customers(&CustomerFilter {
            risk_level: Some(RiskLevel::High),
            status: Some(CustomerStatus::UnderReview),
            ..CustomerFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(high.len(), 1);

    let limited = store
        .query_customers(&CustomerFilter {
            limit: Some(1),
            ..CustomerFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(limited.len(), 1);

    let later = store
        .query_customers(&CustomerFilter {
            created_from: Some(now() + Duration::seconds(1)),
            ..CustomerFilter::default()
        })
        .await
        .unwrap();
    assert!(later.is_empty());

    let critical = alert(individual.id(), Severity::Critical);
    let mut investigating = alert(corporate.id(), Severity::High);
    investigating.status = AlertStatus::Investigating;
    store
        .commit(ChangeSet::default().with_alerts([critical.clone(), investigating]))
        .await
        .unwrap();

    let open = store
        .query_alerts(&AlertFilter {
            status: Some(AlertStatus::Open),
            ..AlertFilter::default()
        })
        .await
        .unwrap();
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, critical.id);
    assert_eq!(store.load_alert(critical.id).await.unwrap(), critical);
    assert_eq!(
        store.alerts_for_customer(individual.id()).await.unwrap().len(),
        1
    );

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total_customers, 2);
    assert_eq!(stats.customers_by_status.get("pending"), Some(&1));
    assert_eq!(stats.customers_by_status.get("under_review"), Some(&1));
    assert_eq!(stats.customers_by_risk_level.get("high"), Some(&1));
    assert_eq!(stats.open_alerts, 1);
    assert_eq!(stats.investigating_alerts, 1);
    assert_eq!(stats.critical_open_alerts, 1);
}

async fn scheduling_queries(store: &dyn KycStore) {
    let mut due = create(store, record("Due Customer", CustomerType::Individual)).await;
    due.customer.status = CustomerStatus::Approved;
    due.customer.next_review_date = Some(now() - Duration::days(1));

    let passport = Document::from_upload(
        DocumentUpload {
            document_type: DocumentType::Passport,
            document_name: "passport.pdf".to_string(),
            file_hash: "abc123".to_string(),
            file_size: 2048,
            document_number: Some("P123".to_string()),
            issue_date: None,
            expiry_date: NaiveDate::from_ymd_opt(2024, 3, 20),
        },
        now(),
    );
    let mut verified = passport.clone();
    verified.id = Uuid::new_v4();
    verified.verification_status = VerificationStatus::Verified;
    due.documents.push(passport);
    due.documents.push(verified);
    store.commit(ChangeSet::for_customer(due.clone())).await.unwrap();

    let mut not_due = create(store, record("Later Customer", CustomerType::Individual)).await;
    not_due.customer.status = CustomerStatus::Approved;
    not_due.customer.next_review_date = Some(now() + Duration::days(30));
    store.commit(ChangeSet::for_customer(not_due)).await.unwrap();

    assert_eq!(store.customers_due_for_review(now()).await.unwrap(), vec![due.id()]);

    let today = now().date_naive();
    let expiring = store
        .customers_with_expiring_documents(today, today + Duration::days(30))
        .await
        .unwrap();
    assert_eq!(expiring, vec![due.id()]);

    let none = store
        .customers_with_expiring_documents(today, today + Duration::days(7))
        .await
        .unwrap();
    assert!(none.is_empty());
}

async fn reference_counter(store: &dyn KycStore) {
    let day = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    assert_eq!(store.next_reference_sequence(day).await.unwrap(), 1);
    assert_eq!(store.next_reference_sequence(day).await.unwrap(), 2);
    assert_eq!(store.next_reference_sequence(day.succ_opt().unwrap()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_memory_store() {
    commit_and_versioning(&MemoryStore::new()).await;
    missing_rows(&MemoryStore::new()).await;
    audit_chain_is_enforced(&MemoryStore::new()).await;
    filters_and_stats(&MemoryStore::new()).await;
    scheduling_queries(&MemoryStore::new()).await;
    reference_counter(&MemoryStore::new()).await;
}

#[tokio::test]
async fn test_sqlite_store() {
    commit_and_versioning(&SqliteStore::in_memory().unwrap()).await;
    missing_rows(&SqliteStore::in_memory().unwrap()).await;
    audit_chain_is_enforced(&SqliteStore::in_memory().unwrap()).await;
    filters_and_stats(&SqliteStore::in_memory().unwrap()).await;
    scheduling_queries(&SqliteStore::in_memory().unwrap()).await;
    reference_counter(&SqliteStore::in_memory().unwrap()).await;
}

#[tokio::test]
async fn test_sqlite_audit_rows_are_append_only() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("kycflow.db");
    let store = SqliteStore::open(&path).unwrap();
    let stored = create(&store, record("Jane Doe", CustomerType::Individual)).await;
    drop(store);

    let conn = rusqlite::Connection::open(&path).unwrap();
    let update = conn.execute("UPDATE audit_trail SET description = 'x'", []);
    assert!(update.is_err());
    let delete = conn.execute("DELETE FROM audit_trail", []);
    assert!(delete.is_err());

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM audit_trail WHERE customer_id = ?1",
            [stored.id().to_string()],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_sqlite_persists_across_reopen() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("kycflow.db");

    let id = {
        let store = SqliteStore::open(&path).unwrap();
        let day = now().date_naive();
        assert_eq!(store.next_reference_sequence(day).await.unwrap(), 1);
        create(&store, record("Jane Doe", CustomerType::Individual)).await.id()
    };

    let store = SqliteStore::open(&path).unwrap();
    let record = store.load_customer(id).await.unwrap();
    assert_eq!(record.customer.name, "Jane Doe");
    assert_eq!(record.version, 1);
    assert_eq!(
        store.next_reference_sequence(now().date_naive()).await.unwrap(),
        2
    );

    let trail = store.audit_trail(id).await.unwrap();
    assert_eq!(trail.len(), 1);
    assert!(kycflow_core::verify_chain(&trail).is_ok());
    assert_eq!(store.last_audit_link(id).await.unwrap().next_sequence, 2);
}
