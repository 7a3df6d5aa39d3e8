//! In-memory store for tests and single-process use

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kycflow_core::{
    AlertStatus, AuditChain, AuditEntry, ComplianceAlert, CustomerRecord, CustomerStatus,
    Severity,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    apply_limit, check_audit_appends, AlertFilter, ChangeSet, CustomerFilter, KycStore,
    StoreError, StoreResult, StoreStats,
};

#[derive(Default)]
struct State {
    customers: HashMap<Uuid, CustomerRecord>,
    alerts: HashMap<Uuid, ComplianceAlert>,
    audit: HashMap<Uuid, Vec<AuditEntry>>,
    reference_counters: HashMap<NaiveDate, u32>,
}

impl State {
    fn tail(&self, customer_id: Uuid) -> AuditChain {
        match self.audit.get(&customer_id).and_then(|entries| entries.last()) {
            Some(last) => AuditChain::resume(last.sequence, last.hash.clone()),
            None => AuditChain::genesis(),
        }
    }
}

/// A [`KycStore`] backed by hash maps behind a single lock
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KycStore for MemoryStore {
    async fn next_reference_sequence(&self, day: NaiveDate) -> StoreResult<u32> {
        let mut state = self.state.write().await;
        let counter = state.reference_counters.entry(day).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn load_customer(&self, id: Uuid) -> StoreResult<CustomerRecord> {
        let state = self.state.read().await;
        state
            .customers
            .get(&id)
            .cloned()
            .ok_or(StoreError::CustomerNotFound(id))
    }

    async fn load_alert(&self, id: Uuid) -> StoreResult<ComplianceAlert> {
        let state = self.state.read().await;
        state
            .alerts
            .get(&id)
            .cloned()
            .ok_or(StoreError::AlertNotFound(id))
    }

    async fn alerts_for_customer(&self, customer_id: Uuid) -> StoreResult<Vec<ComplianceAlert>> {
        self.query_alerts(&AlertFilter {
            customer_id: Some(customer_id),
            ..AlertFilter::default()
        })
        .await
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<Option<u64>> {
        let mut state = self.state.write().await;

        // Validate everything before touching state
        if let Some(record) = &changes.customer {
            let stored = state.customers.get(&record.id()).map(|r| r.version).unwrap_or(0);
            if stored != record.version {
                return Err(StoreError::Conflict {
                    customer_id: record.id(),
                    expected: record.version,
                    actual: stored,
                });
            }
        }
        check_audit_appends(&changes.audit, |id| Ok(state.tail(id)))?;

        let version = changes.customer.map(|mut record| {
            record.version += 1;
            let version = record.version;
            state.customers.insert(record.id(), record);
            version
        });
        for alert in changes.alerts {
            state.alerts.insert(alert.id, alert);
        }
        for entry in changes.audit {
            state.audit.entry(entry.customer_id).or_default().push(entry);
        }
        Ok(version)
    }

    async fn query_customers(&self, filter: &CustomerFilter) -> StoreResult<Vec<CustomerRecord>> {
        let state = self.state.read().await;
        let mut records: Vec<CustomerRecord> = state
            .customers
            .values()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.customer.created_at.cmp(&a.customer.created_at));
        Ok(apply_limit(records, filter.limit))
    }

    async fn query_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<ComplianceAlert>> {
        let state = self.state.read().await;
        let mut alerts: Vec<ComplianceAlert> = state
            .alerts
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(apply_limit(alerts, filter.limit))
    }

    async fn customers_due_for_review(&self, now: DateTime<Utc>) -> StoreResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .customers
            .values()
            .filter(|r| {
                r.customer.status == CustomerStatus::Approved
                    && r.customer.next_review_date.map_or(false, |d| d <= now)
            })
            .map(|r| r.id())
            .collect())
    }

    async fn customers_with_expiring_documents(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Uuid>> {
        let state = self.state.read().await;
        Ok(state
            .customers
            .values()
            .filter(|r| {
                r.documents.iter().any(|d| {
                    d.is_verified()
                        && d.expiry_date.map_or(false, |e| e > from && e <= to)
                })
            })
            .map(|r| r.id())
            .collect())
    }

    async fn audit_trail(&self, customer_id: Uuid) -> StoreResult<Vec<AuditEntry>> {
        let state = self.state.read().await;
        Ok(state.audit.get(&customer_id).cloned().unwrap_or_default())
    }

    async fn last_audit_link(&self, customer_id: Uuid) -> StoreResult<AuditChain> {
        Ok(self.state.read().await.tail(customer_id))
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let state = self.state.read().await;
        let mut stats = StoreStats {
            total_customers: state.customers.len() as u64,
            ..StoreStats::default()
        };
        for record in state.customers.values() {
            *stats
                .customers_by_status
                .entry(record.customer.status.to_string())
                .or_insert(0) += 1;
            *stats
                .customers_by_risk_level
                .entry(record.customer.risk_level.to_string())
                .or_insert(0) += 1;
        }
        for alert in state.alerts.values() {
            match alert.status {
                AlertStatus::Open => {
                    stats.open_alerts += 1;
                    if alert.severity == Severity::Critical {
                        stats.critical_open_alerts += 1;
                    }
                }
                AlertStatus::Investigating => stats.investigating_alerts += 1,
                _ => {}
            }
        }
        Ok(stats)
    }
}
