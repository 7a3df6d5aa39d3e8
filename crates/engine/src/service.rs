//! KYC service - the operations exposed to the API layer
//!
//! Every mutating operation follows the same shape:
//!
//! 1. take the customer's lock
//! 2. load the aggregate (and the customer's alerts when alerting)
//! 3. let the components mutate it and collect their audit entries
//! 4. seal the entries onto the customer's audit chain
//! 5. commit aggregate, alerts and audit entries as one change set
//! 6. after commit, send notifications
//!
//! A failure at any step before 5 leaves storage untouched.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use kycflow_compliance::{
    AlertEngine, AlertRequest, RaiseOutcome, ScreeningCoordinator, ScreeningResult,
    WorkflowStateMachine,
};
use kycflow_core::customer::customer_reference;
use kycflow_core::{
    verify_chain, Actor, AlertStatus, AuditAction, AuditEntry, ComplianceAlert, Customer,
    CustomerIntake, CustomerRecord, Document, DocumentUpload, RiskAssessment, WorkflowState,
};
use kycflow_risk::{AssessmentOutcome, ExternalAssessment, RiskScoringEngine};
use kycflow_store::{AlertFilter, ChangeSet, CustomerFilter, KycStore, StoreStats};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::KycConfig;
use crate::error::{KycError, KycResult};
use crate::locks::CustomerLocks;
use crate::notify::{NotificationKind, Notifier, TracingNotifier};
use crate::officers::{OfficerDirectory, StaticOfficerDirectory};
use crate::screening::{ScreeningProvider, ScreeningRequest, StaticScreeningProvider};

/// Onboarding and compliance service over a [`KycStore`]
pub struct KycService {
    config: KycConfig,
    store: Arc<dyn KycStore>,
    risk: RiskScoringEngine,
    workflow: WorkflowStateMachine,
    alerts: AlertEngine,
    screening: ScreeningCoordinator,
    provider: Arc<dyn ScreeningProvider>,
    notifier: Arc<dyn Notifier>,
    officers: Arc<dyn OfficerDirectory>,
    pub(crate) locks: CustomerLocks,
}

impl KycService {
    /// Service with a clear-by-default screening provider, logging notifier
    /// and an empty officer directory
    pub fn new(config: KycConfig, store: Arc<dyn KycStore>) -> KycResult<Self> {
        config.validate()?;
        let risk = RiskScoringEngine::new(config.risk.clone())?;
        let workflow = WorkflowStateMachine::new(config.compliance.clone());
        let alerts = AlertEngine::new();

        Ok(Self {
            config,
            store,
            risk,
            workflow,
            alerts,
            screening: ScreeningCoordinator::new(alerts),
            provider: Arc::new(StaticScreeningProvider::new()),
            notifier: Arc::new(TracingNotifier),
            officers: Arc::new(StaticOfficerDirectory::default()),
            locks: CustomerLocks::new(),
        })
    }

    pub fn with_screening_provider(mut self, provider: Arc<dyn ScreeningProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_officers(mut self, officers: Arc<dyn OfficerDirectory>) -> Self {
        self.officers = officers;
        self
    }

    /// Replace the scoring engine (e.g. one with custom calculators)
    pub fn with_risk_engine(mut self, risk: RiskScoringEngine) -> Self {
        self.config.risk = risk.config().clone();
        self.risk = risk;
        self
    }

    pub fn config(&self) -> &KycConfig {
        &self.config
    }

    pub(crate) fn store(&self) -> &dyn KycStore {
        self.store.as_ref()
    }

    // === Commit helpers ===

    /// Seal `entries` onto the customer's chain and commit with the aggregate
    pub(crate) async fn commit_record(
        &self,
        mut record: CustomerRecord,
        alerts: Vec<ComplianceAlert>,
        entries: Vec<AuditEntry>,
    ) -> KycResult<CustomerRecord> {
        let mut chain = self.store.last_audit_link(record.id()).await?;
        let audit = chain.seal_all(entries);
        let changes = ChangeSet::for_customer(record.clone())
            .with_alerts(alerts)
            .with_audit(audit);
        if let Some(version) = self.store.commit(changes).await? {
            record.version = version;
        }
        Ok(record)
    }

    /// Commit alert changes of one customer without touching the aggregate
    pub(crate) async fn commit_alerts(
        &self,
        customer_id: Uuid,
        alerts: Vec<ComplianceAlert>,
        entries: Vec<AuditEntry>,
    ) -> KycResult<()> {
        let mut chain = self.store.last_audit_link(customer_id).await?;
        let audit = chain.seal_all(entries);
        self.store
            .commit(ChangeSet::default().with_alerts(alerts).with_audit(audit))
            .await?;
        Ok(())
    }

    async fn notify(&self, customer: &Customer, kind: NotificationKind) {
        let notification = kind.render(customer, None);
        if let Err(e) = self.notifier.deliver(&notification).await {
            warn!(
                customer_id = %customer.id,
                kind = %kind,
                notifier = self.notifier.name(),
                error = %e,
                "Notification delivery failed"
            );
        }
    }

    /// Raise an alert against `existing`, recording it there when created
    pub(crate) fn raise_into(
        &self,
        existing: &mut Vec<ComplianceAlert>,
        request: AlertRequest,
        actor: &Actor,
        now: DateTime<Utc>,
        alerts: &mut Vec<ComplianceAlert>,
        entries: &mut Vec<AuditEntry>,
    ) -> RaiseOutcome {
        let outcome = self.alerts.raise(existing, request, actor, now);
        if let RaiseOutcome::Raised { alert, audit } = &outcome {
            existing.push(alert.clone());
            alerts.push(alert.clone());
            entries.push(audit.clone());
        }
        outcome
    }

    // === Intake & documents ===

    /// Register a new application
    pub async fn create_customer(
        &self,
        intake: CustomerIntake,
        actor: &Actor,
    ) -> KycResult<CustomerRecord> {
        intake.validate()?;
        let now = Utc::now();
        let sequence = self.store.next_reference_sequence(now.date_naive()).await?;
        let record = CustomerRecord::new(intake, customer_reference(now, sequence), now);
        let _guard = self.locks.acquire(record.id()).await;

        let entry = AuditEntry::new(
            record.id(),
            AuditAction::Create,
            format!("Customer created: {}", record.customer.name),
            actor,
            now,
        )
        .with_data(json!({
            "customer_reference": record.customer.customer_reference,
            "customer_type": record.customer.customer_type,
        }));

        let record = self.commit_record(record, Vec::new(), vec![entry]).await?;
        info!(
            customer_id = %record.id(),
            reference = %record.customer.customer_reference,
            customer_type = %record.customer.customer_type,
            "Customer created"
        );
        self.notify(&record.customer, NotificationKind::ApplicationReceived)
            .await;
        Ok(record)
    }

    /// Attach a document and advance the workflow while ready
    pub async fn upload_document(
        &self,
        customer_id: Uuid,
        upload: DocumentUpload,
        actor: &Actor,
    ) -> KycResult<Document> {
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut record = self.store.load_customer(customer_id).await?;

        let (document_id, entry) = self.workflow.record_document(&mut record, upload, actor, now)?;
        let mut entries = vec![entry];
        entries.extend(self.workflow.advance_while_ready(&mut record, actor, now));

        let record = self.commit_record(record, Vec::new(), entries).await?;
        info!(customer_id = %customer_id, document_id = %document_id, "Document uploaded");
        record
            .document(document_id)
            .cloned()
            .ok_or_else(|| KycError::InvalidState(format!("document {} was not stored", document_id)))
    }

    pub async fn verify_document(
        &self,
        customer_id: Uuid,
        document_id: Uuid,
        actor: &Actor,
        notes: &str,
    ) -> KycResult<CustomerRecord> {
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut record = self.store.load_customer(customer_id).await?;

        let entry = self
            .workflow
            .verify_document(&mut record, document_id, actor, notes, now)?;
        let mut entries = vec![entry];
        entries.extend(self.workflow.advance_while_ready(&mut record, actor, now));

        info!(customer_id = %customer_id, document_id = %document_id, "Document verified");
        self.commit_record(record, Vec::new(), entries).await
    }

    pub async fn reject_document(
        &self,
        customer_id: Uuid,
        document_id: Uuid,
        actor: &Actor,
        notes: &str,
    ) -> KycResult<CustomerRecord> {
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut record = self.store.load_customer(customer_id).await?;

        let entry = self
            .workflow
            .reject_document(&mut record, document_id, actor, notes, now)?;

        info!(customer_id = %customer_id, document_id = %document_id, "Document rejected");
        self.commit_record(record, Vec::new(), vec![entry]).await
    }

    // === Risk ===

    /// Score the customer, overwrite its assessment and escalate elevated tiers
    pub async fn run_risk_assessment(
        &self,
        customer_id: Uuid,
        actor: &Actor,
    ) -> KycResult<RiskAssessment> {
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let record = self.store.load_customer(customer_id).await?;
        let outcome = self.risk.assess(&record.customer)?;

        let record = self.apply_assessment(record, outcome, actor, now).await?;
        Ok(record.risk_assessment)
    }

    /// Record an assessment computed by an external system
    pub async fn apply_external_assessment(
        &self,
        customer_id: Uuid,
        external: ExternalAssessment,
        actor: &Actor,
    ) -> KycResult<RiskAssessment> {
        let assessment = external.into_assessment(&self.risk)?;
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let record = self.store.load_customer(customer_id).await?;
        let kyc_type = RiskScoringEngine::due_diligence(assessment.risk_level, &record.customer);
        let outcome = AssessmentOutcome {
            assessment,
            kyc_type,
        };

        let record = self.apply_assessment(record, outcome, actor, now).await?;
        Ok(record.risk_assessment)
    }

    async fn apply_assessment(
        &self,
        mut record: CustomerRecord,
        outcome: AssessmentOutcome,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> KycResult<CustomerRecord> {
        let mut entries = vec![outcome.apply(&mut record, actor, now)];
        entries.extend(self.workflow.advance_while_ready(&mut record, actor, now));

        let mut alerts = Vec::new();
        if let Some(escalation) = outcome.escalation(&record.customer) {
            let mut existing = self.store.alerts_for_customer(record.id()).await?;
            let request = AlertRequest {
                customer_id: record.id(),
                alert_type: escalation.alert_type,
                severity: escalation.severity,
                title: escalation.title,
                description: escalation.description,
                triggered_by: "risk_assessment".to_string(),
                evidence: escalation.evidence,
            };
            self.raise_into(&mut existing, request, actor, now, &mut alerts, &mut entries);
        }

        info!(
            customer_id = %record.id(),
            score = %outcome.assessment.overall_risk_score,
            risk_level = %outcome.risk_level(),
            kyc_type = %outcome.kyc_type,
            method = %outcome.assessment.assessment_method,
            "Risk assessment recorded"
        );
        self.commit_record(record, alerts, entries).await
    }

    // === Screening ===

    /// Apply a screening result that has already been obtained
    pub async fn apply_screening_result(
        &self,
        customer_id: Uuid,
        result: ScreeningResult,
        actor: &Actor,
    ) -> KycResult<WorkflowState> {
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut record = self.store.load_customer(customer_id).await?;
        let existing = self.store.alerts_for_customer(customer_id).await?;

        let outcome = self
            .screening
            .apply(&mut record, &existing, &result, actor, now);
        let mut entries = outcome.audit;
        entries.extend(self.workflow.advance_while_ready(&mut record, actor, now));

        if !outcome.deduplicated.is_empty() {
            debug!(
                customer_id = %customer_id,
                suppressed = outcome.deduplicated.len(),
                "Screening hits matched active alerts"
            );
        }
        let record = self.commit_record(record, outcome.alerts, entries).await?;
        Ok(record.workflow)
    }

    /// Apply a pushed (webhook) payload after validating its shape
    pub async fn apply_screening_payload(
        &self,
        customer_id: Uuid,
        payload: serde_json::Value,
        actor: &Actor,
    ) -> KycResult<WorkflowState> {
        let result = ScreeningResult::from_payload(payload)?;
        self.apply_screening_result(customer_id, result, actor).await
    }

    /// Ask the provider to screen the customer, then apply its answer
    ///
    /// The provider call runs without the customer lock. On timeout nothing is
    /// mutated and `ExternalServiceTimeout` is returned for a later retry.
    pub async fn screen_customer(
        &self,
        customer_id: Uuid,
        actor: &Actor,
    ) -> KycResult<WorkflowState> {
        let record = self.store.load_customer(customer_id).await?;
        let request = ScreeningRequest::for_customer(&record.customer);
        let timeout = self.config.compliance.screening_timeout();

        let result = match tokio::time::timeout(timeout, self.provider.screen(&request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    customer_id = %customer_id,
                    provider = self.provider.name(),
                    timeout_ms = self.config.compliance.screening_timeout_ms,
                    "Screening provider timed out"
                );
                return Err(KycError::ExternalServiceTimeout {
                    customer_id,
                    timeout_ms: self.config.compliance.screening_timeout_ms,
                });
            }
        };

        self.apply_screening_result(customer_id, result, actor).await
    }

    // === Decisions ===

    pub async fn approve(&self, customer_id: Uuid, actor: &Actor, notes: &str) -> KycResult<Customer> {
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut record = self.store.load_customer(customer_id).await?;
        let entry = self.workflow.approve(&mut record, actor, notes, now)?;

        let record = self.commit_record(record, Vec::new(), vec![entry]).await?;
        self.notify(&record.customer, NotificationKind::ApplicationApproved)
            .await;
        Ok(record.customer)
    }

    pub async fn reject(&self, customer_id: Uuid, actor: &Actor, notes: &str) -> KycResult<Customer> {
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut record = self.store.load_customer(customer_id).await?;
        let entry = self.workflow.reject(&mut record, actor, notes, now)?;

        let record = self.commit_record(record, Vec::new(), vec![entry]).await?;
        self.notify(&record.customer, NotificationKind::ApplicationRejected)
            .await;
        Ok(record.customer)
    }

    pub async fn request_additional_info(
        &self,
        customer_id: Uuid,
        actor: &Actor,
        notes: &str,
    ) -> KycResult<Customer> {
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut record = self.store.load_customer(customer_id).await?;
        let entry = self
            .workflow
            .request_additional_info(&mut record, actor, notes, now)?;

        let record = self.commit_record(record, Vec::new(), vec![entry]).await?;
        self.notify(&record.customer, NotificationKind::AdditionalInfoRequired)
            .await;
        Ok(record.customer)
    }

    pub async fn suspend(&self, customer_id: Uuid, actor: &Actor, notes: &str) -> KycResult<Customer> {
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut record = self.store.load_customer(customer_id).await?;
        let entry = self.workflow.suspend(&mut record, actor, notes, now)?;

        let record = self.commit_record(record, Vec::new(), vec![entry]).await?;
        Ok(record.customer)
    }

    pub async fn assign_compliance_officer(
        &self,
        customer_id: Uuid,
        officer_id: &str,
        actor: &Actor,
    ) -> KycResult<Customer> {
        self.ensure_officer(officer_id).await?;
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut record = self.store.load_customer(customer_id).await?;
        let entry = self.workflow.assign_officer(&mut record, officer_id, actor, now);

        let record = self.commit_record(record, Vec::new(), vec![entry]).await?;
        Ok(record.customer)
    }

    /// Assign one officer to many customers; returns how many were assigned
    ///
    /// Unknown customer ids are skipped. Each customer is locked and committed
    /// on its own.
    pub async fn bulk_assign_compliance_officer(
        &self,
        customer_ids: &[Uuid],
        officer_id: &str,
        actor: &Actor,
    ) -> KycResult<usize> {
        self.ensure_officer(officer_id).await?;
        let unique: BTreeSet<Uuid> = customer_ids.iter().copied().collect();

        let mut assigned = 0;
        for customer_id in unique {
            let _guard = self.locks.acquire(customer_id).await;
            let now = Utc::now();
            let mut record = match self.store.load_customer(customer_id).await {
                Ok(record) => record,
                Err(kycflow_store::StoreError::CustomerNotFound(_)) => {
                    debug!(customer_id = %customer_id, "Bulk assign skipped unknown customer");
                    continue;
                }
                Err(e) => return Err(e.into()),
            };
            let entry = self.workflow.assign_officer(&mut record, officer_id, actor, now);
            self.commit_record(record, Vec::new(), vec![entry]).await?;
            assigned += 1;
        }

        info!(
            requested = customer_ids.len(),
            assigned,
            officer = officer_id,
            "Bulk officer assignment"
        );
        Ok(assigned)
    }

    async fn ensure_officer(&self, officer_id: &str) -> KycResult<()> {
        match self.officers.find(officer_id).await? {
            Some(_) => Ok(()),
            None => Err(kycflow_compliance::ComplianceError::OfficerNotFound(
                officer_id.to_string(),
            )
            .into()),
        }
    }

    // === Alerts ===

    /// Raise an alert for an existing customer (deduplicated)
    pub async fn raise_alert(&self, request: AlertRequest, actor: &Actor) -> KycResult<RaiseOutcome> {
        let customer_id = request.customer_id;
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        self.store.load_customer(customer_id).await?;
        let mut existing = self.store.alerts_for_customer(customer_id).await?;

        let mut alerts = Vec::new();
        let mut entries = Vec::new();
        let outcome = self.raise_into(&mut existing, request, actor, now, &mut alerts, &mut entries);
        if outcome.is_raised() {
            self.commit_alerts(customer_id, alerts, entries).await?;
        }
        Ok(outcome)
    }

    pub async fn assign_alert(
        &self,
        alert_id: Uuid,
        officer_id: &str,
        actor: &Actor,
    ) -> KycResult<ComplianceAlert> {
        self.ensure_officer(officer_id).await?;
        self.update_alert(alert_id, |engine, alert, now| {
            engine.assign(alert, officer_id, actor, now)
        })
        .await
    }

    pub async fn resolve_alert(
        &self,
        alert_id: Uuid,
        actor: &Actor,
        notes: &str,
    ) -> KycResult<ComplianceAlert> {
        self.update_alert(alert_id, |engine, alert, now| {
            engine.resolve(alert, actor, notes, now)
        })
        .await
    }

    pub async fn mark_false_positive(
        &self,
        alert_id: Uuid,
        actor: &Actor,
        notes: &str,
    ) -> KycResult<ComplianceAlert> {
        self.update_alert(alert_id, |engine, alert, now| {
            engine.mark_false_positive(alert, actor, notes, now)
        })
        .await
    }

    async fn update_alert<F>(&self, alert_id: Uuid, change: F) -> KycResult<ComplianceAlert>
    where
        F: FnOnce(
            &AlertEngine,
            &mut ComplianceAlert,
            DateTime<Utc>,
        ) -> kycflow_compliance::ComplianceResult<AuditEntry>,
    {
        let customer_id = self.store.load_alert(alert_id).await?.customer_id;
        let _guard = self.locks.acquire(customer_id).await;
        let now = Utc::now();
        let mut alert = self.store.load_alert(alert_id).await?;

        let entry = change(&self.alerts, &mut alert, now)?;
        self.commit_alerts(customer_id, vec![alert.clone()], vec![entry])
            .await?;
        Ok(alert)
    }

    /// Resolve every `open` alert among `alert_ids`; returns how many were resolved
    ///
    /// Alerts that are missing or not open are skipped.
    pub async fn bulk_resolve_alerts(
        &self,
        alert_ids: &[Uuid],
        actor: &Actor,
        notes: &str,
    ) -> KycResult<usize> {
        let mut by_customer: BTreeMap<Uuid, BTreeSet<Uuid>> = BTreeMap::new();
        for &alert_id in alert_ids {
            match self.store.load_alert(alert_id).await {
                Ok(alert) => {
                    by_customer.entry(alert.customer_id).or_default().insert(alert_id);
                }
                Err(kycflow_store::StoreError::AlertNotFound(_)) => {
                    debug!(alert_id = %alert_id, "Bulk resolve skipped unknown alert");
                }
                Err(e) => return Err(e.into()),
            }
        }

        let mut resolved = 0;
        for (customer_id, ids) in by_customer {
            let _guard = self.locks.acquire(customer_id).await;
            let now = Utc::now();
            let mut alerts = Vec::with_capacity(ids.len());
            for id in ids {
                alerts.push(self.store.load_alert(id).await?);
            }

            let open: HashSet<Uuid> = alerts
                .iter()
                .filter(|a| a.status == AlertStatus::Open)
                .map(|a| a.id)
                .collect();
            let entries = self.alerts.bulk_resolve(&mut alerts, actor, notes, now);
            if entries.is_empty() {
                continue;
            }
            let changed: Vec<ComplianceAlert> =
                alerts.into_iter().filter(|a| open.contains(&a.id)).collect();
            resolved += entries.len();
            self.commit_alerts(customer_id, changed, entries).await?;
        }

        info!(requested = alert_ids.len(), resolved, "Bulk alert resolution");
        Ok(resolved)
    }

    // === Queries ===

    pub async fn customer(&self, customer_id: Uuid) -> KycResult<CustomerRecord> {
        Ok(self.store.load_customer(customer_id).await?)
    }

    pub async fn customers(&self, filter: &CustomerFilter) -> KycResult<Vec<CustomerRecord>> {
        Ok(self.store.query_customers(filter).await?)
    }

    pub async fn alerts(&self, filter: &AlertFilter) -> KycResult<Vec<ComplianceAlert>> {
        Ok(self.store.query_alerts(filter).await?)
    }

    pub async fn audit_trail(&self, customer_id: Uuid) -> KycResult<Vec<AuditEntry>> {
        Ok(self.store.audit_trail(customer_id).await?)
    }

    /// Verify the customer's hash chain; returns the number of entries checked
    pub async fn verify_audit_trail(&self, customer_id: Uuid) -> KycResult<usize> {
        self.store.load_customer(customer_id).await?;
        let entries = self.store.audit_trail(customer_id).await?;
        verify_chain(&entries)?;
        Ok(entries.len())
    }

    pub async fn dashboard_stats(&self) -> KycResult<StoreStats> {
        Ok(self.store.stats().await?)
    }
}
