//! Scheduled jobs
//!
//! Both jobs select candidates with a store query, then re-check each one
//! under its customer lock before changing anything. A job that runs twice
//! concurrently therefore raises no duplicate alert (dedup) and moves no
//! review date twice (the second run sees the date already advanced).
//!
//! Per-customer failures are logged and counted; the batch carries on.

use chrono::{DateTime, Duration, Utc};
use kycflow_compliance::{
    expiring_document_alerts, is_review_due, review_due_alert, schedule_next_review,
};
use kycflow_core::Actor;
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::error::KycResult;
use crate::service::KycService;

/// Summary of one job run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobReport {
    pub job: String,
    /// Candidates returned by the selection query
    pub examined: usize,
    pub alerts_raised: usize,
    /// Candidates no longer eligible once locked, or already alerted
    pub skipped: usize,
    pub failed: usize,
}

impl JobReport {
    fn new(job: &str) -> Self {
        Self {
            job: job.to_string(),
            ..Self::default()
        }
    }
}

impl KycService {
    /// Raise `document_expiry` alerts for verified documents expiring soon
    pub async fn check_document_expiry(&self, now: DateTime<Utc>) -> KycResult<JobReport> {
        let actor = Actor::system("document_expiry_check");
        let today = now.date_naive();
        let window = Duration::days(self.config().compliance.document_expiry_window_days);
        let candidates = self
            .store()
            .customers_with_expiring_documents(today, today + window)
            .await?;

        let mut report = JobReport::new("document_expiry_check");
        report.examined = candidates.len();
        for customer_id in candidates {
            match self.expiry_alerts_for(customer_id, &actor, now).await {
                Ok(0) => report.skipped += 1,
                Ok(raised) => report.alerts_raised += raised,
                Err(e) => {
                    error!(customer_id = %customer_id, error = %e, "Document expiry check failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            examined = report.examined,
            alerts_raised = report.alerts_raised,
            skipped = report.skipped,
            failed = report.failed,
            "Document expiry check completed"
        );
        Ok(report)
    }

    async fn expiry_alerts_for(
        &self,
        customer_id: Uuid,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> KycResult<usize> {
        let _guard = self.locks.acquire(customer_id).await;
        let record = self.store().load_customer(customer_id).await?;
        let requests = expiring_document_alerts(&record, &self.config().compliance, now);
        if requests.is_empty() {
            return Ok(0);
        }

        let mut existing = self.store().alerts_for_customer(customer_id).await?;
        let mut alerts = Vec::new();
        let mut entries = Vec::new();
        for request in requests {
            self.raise_into(&mut existing, request, actor, now, &mut alerts, &mut entries);
        }

        let raised = alerts.len();
        if raised > 0 {
            self.commit_alerts(customer_id, alerts, entries).await?;
        }
        Ok(raised)
    }

    /// Raise `review_due` alerts and reschedule approved customers past their review date
    pub async fn periodic_customer_review(&self, now: DateTime<Utc>) -> KycResult<JobReport> {
        let actor = Actor::system("periodic_review");
        let candidates = self.store().customers_due_for_review(now).await?;

        let mut report = JobReport::new("periodic_review");
        report.examined = candidates.len();
        for customer_id in candidates {
            match self.review_customer(customer_id, &actor, now).await {
                Ok(Some(true)) => report.alerts_raised += 1,
                Ok(Some(false)) | Ok(None) => report.skipped += 1,
                Err(e) => {
                    error!(customer_id = %customer_id, error = %e, "Periodic review failed");
                    report.failed += 1;
                }
            }
        }

        info!(
            examined = report.examined,
            alerts_raised = report.alerts_raised,
            skipped = report.skipped,
            failed = report.failed,
            "Periodic review completed"
        );
        Ok(report)
    }

    /// `None` when the customer is no longer due; otherwise whether an alert was raised
    async fn review_customer(
        &self,
        customer_id: Uuid,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> KycResult<Option<bool>> {
        let _guard = self.locks.acquire(customer_id).await;
        let mut record = self.store().load_customer(customer_id).await?;
        if !is_review_due(&record, now) {
            return Ok(None);
        }

        let mut existing = self.store().alerts_for_customer(customer_id).await?;
        let mut alerts = Vec::new();
        let mut entries = Vec::new();
        let outcome = self.raise_into(
            &mut existing,
            review_due_alert(&record),
            actor,
            now,
            &mut alerts,
            &mut entries,
        );
        entries.push(schedule_next_review(
            &mut record,
            &self.config().compliance,
            actor,
            now,
        ));

        self.commit_record(record, alerts, entries).await?;
        Ok(Some(outcome.is_raised()))
    }

    /// Run both jobs once
    pub async fn run_scheduled_jobs(&self, now: DateTime<Utc>) -> KycResult<Vec<JobReport>> {
        Ok(vec![
            self.check_document_expiry(now).await?,
            self.periodic_customer_review(now).await?,
        ])
    }
}
