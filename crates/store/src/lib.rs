//! KycFlow Store - persistence for customer aggregates, alerts and audit trail
//!
//! All writes go through [`KycStore::commit`], which applies a [`ChangeSet`]
//! atomically:
//!
//! - the customer aggregate is written only if its `version` still matches the
//!   stored one (optimistic concurrency), and the stored version is bumped;
//! - alerts are upserted;
//! - audit entries are appended, and only if they extend the customer's hash
//!   chain. Audit rows are never updated or deleted.

pub mod error;
pub mod memory;
pub mod sqlite;

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kycflow_core::{
    calculate_entry_hash, AlertStatus, AlertType, AuditChain, AuditEntry, ComplianceAlert,
    CustomerRecord, CustomerStatus, CustomerType, RiskLevel, Severity,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Everything one operation writes, applied all-or-nothing
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub customer: Option<CustomerRecord>,
    pub alerts: Vec<ComplianceAlert>,
    pub audit: Vec<AuditEntry>,
}

impl ChangeSet {
    pub fn for_customer(record: CustomerRecord) -> Self {
        Self {
            customer: Some(record),
            ..Self::default()
        }
    }

    pub fn with_alerts(mut self, alerts: impl IntoIterator<Item = ComplianceAlert>) -> Self {
        self.alerts.extend(alerts);
        self
    }

    pub fn with_audit(mut self, entries: impl IntoIterator<Item = AuditEntry>) -> Self {
        self.audit.extend(entries);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer.is_none() && self.alerts.is_empty() && self.audit.is_empty()
    }
}

/// Customer query, all criteria optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerFilter {
    pub status: Option<CustomerStatus>,
    pub risk_level: Option<RiskLevel>,
    pub customer_type: Option<CustomerType>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl CustomerFilter {
    pub fn matches(&self, record: &CustomerRecord) -> bool {
        let c = &record.customer;
        self.status.map_or(true, |s| c.status == s)
            && self.risk_level.map_or(true, |r| c.risk_level == r)
            && self.customer_type.map_or(true, |t| c.customer_type == t)
            && self.created_from.map_or(true, |from| c.created_at >= from)
            && self.created_to.map_or(true, |to| c.created_at <= to)
    }
}

/// Alert query, all criteria optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertFilter {
    pub customer_id: Option<Uuid>,
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    pub severity: Option<Severity>,
    pub limit: Option<usize>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &ComplianceAlert) -> bool {
        self.customer_id.map_or(true, |id| alert.customer_id == id)
            && self.status.map_or(true, |s| alert.status == s)
            && self.alert_type.map_or(true, |t| alert.alert_type == t)
            && self.severity.map_or(true, |s| alert.severity == s)
    }
}

/// Aggregate counts for dashboards
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total_customers: u64,
    pub customers_by_status: BTreeMap<String, u64>,
    pub customers_by_risk_level: BTreeMap<String, u64>,
    pub open_alerts: u64,
    pub investigating_alerts: u64,
    pub critical_open_alerts: u64,
}

/// Persistence collaborator
#[async_trait]
pub trait KycStore: Send + Sync {
    /// Next value of the per-day reference counter, starting at 1
    async fn next_reference_sequence(&self, day: NaiveDate) -> StoreResult<u32>;

    async fn load_customer(&self, id: Uuid) -> StoreResult<CustomerRecord>;

    async fn load_alert(&self, id: Uuid) -> StoreResult<ComplianceAlert>;

    async fn alerts_for_customer(&self, customer_id: Uuid) -> StoreResult<Vec<ComplianceAlert>>;

    /// Apply a change set atomically; returns the new customer version, if any
    async fn commit(&self, changes: ChangeSet) -> StoreResult<Option<u64>>;

    async fn query_customers(&self, filter: &CustomerFilter) -> StoreResult<Vec<CustomerRecord>>;

    async fn query_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<ComplianceAlert>>;

    /// Approved customers with `next_review_date <= now`
    async fn customers_due_for_review(&self, now: DateTime<Utc>) -> StoreResult<Vec<Uuid>>;

    /// Customers with a verified document expiring in `(from, to]`
    async fn customers_with_expiring_documents(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Uuid>>;

    /// Full audit trail of a customer, ordered by sequence
    async fn audit_trail(&self, customer_id: Uuid) -> StoreResult<Vec<AuditEntry>>;

    /// Tail of the customer's audit chain (genesis if empty)
    async fn last_audit_link(&self, customer_id: Uuid) -> StoreResult<AuditChain>;

    async fn stats(&self) -> StoreResult<StoreStats>;
}

/// Check that `entries` extend the stored chains; `tail` yields each customer's current tail
pub(crate) fn check_audit_appends<F>(entries: &[AuditEntry], mut tail: F) -> StoreResult<()>
where
    F: FnMut(Uuid) -> StoreResult<AuditChain>,
{
    let mut chains: HashMap<Uuid, AuditChain> = HashMap::new();
    for entry in entries {
        let chain = match chains.entry(entry.customer_id) {
            Entry::Occupied(occupied) => occupied.into_mut(),
            Entry::Vacant(vacant) => vacant.insert(tail(entry.customer_id)?),
        };

        let reject = |reason: String| StoreError::AuditChain {
            customer_id: entry.customer_id,
            reason,
        };
        if !entry.is_sealed() {
            return Err(reject(format!("entry {} is not sealed", entry.id)));
        }
        if entry.sequence != chain.next_sequence {
            return Err(reject(format!(
                "expected sequence {}, got {}",
                chain.next_sequence, entry.sequence
            )));
        }
        if entry.prev_hash != chain.last_hash {
            return Err(reject(format!("entry {} does not link to the chain tail", entry.sequence)));
        }
        if calculate_entry_hash(entry) != entry.hash {
            return Err(reject(format!("entry {} has an invalid hash", entry.sequence)));
        }
        *chain = AuditChain::resume(entry.sequence, entry.hash.clone());
    }
    Ok(())
}

pub(crate) fn apply_limit<T>(mut items: Vec<T>, limit: Option<usize>) -> Vec<T> {
    if let Some(limit) = limit {
        items.truncate(limit);
    }
    items
}
