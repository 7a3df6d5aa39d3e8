//! SQLite store
//!
//! Aggregates, alerts and audit entries are stored as JSON payloads next to
//! the indexed columns used for filtering. The audit table is guarded by
//! triggers that abort any UPDATE or DELETE.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kycflow_core::{
    AlertStatus, AuditChain, AuditEntry, ComplianceAlert, CustomerRecord, CustomerStatus,
    Severity,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Transaction};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use crate::{
    apply_limit, check_audit_appends, AlertFilter, ChangeSet, CustomerFilter, KycStore,
    StoreError, StoreResult, StoreStats,
};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS customers (
    id TEXT PRIMARY KEY,
    customer_reference TEXT NOT NULL UNIQUE,
    customer_type TEXT NOT NULL,
    status TEXT NOT NULL,
    risk_level TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    next_review_ms INTEGER,
    version INTEGER NOT NULL,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_customers_status ON customers(status);
CREATE INDEX IF NOT EXISTS idx_customers_risk_level ON customers(risk_level);
CREATE INDEX IF NOT EXISTS idx_customers_next_review ON customers(next_review_ms);

CREATE TABLE IF NOT EXISTS document_expiry (
    document_id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL,
    expiry_date TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_document_expiry_date ON document_expiry(expiry_date);

CREATE TABLE IF NOT EXISTS alerts (
    id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL,
    alert_type TEXT NOT NULL,
    severity TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at_ms INTEGER NOT NULL,
    payload TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_customer ON alerts(customer_id);
CREATE INDEX IF NOT EXISTS idx_alerts_status ON alerts(status);

CREATE TABLE IF NOT EXISTS audit_trail (
    id TEXT PRIMARY KEY,
    customer_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    action TEXT NOT NULL,
    timestamp TEXT NOT NULL,
    prev_hash TEXT NOT NULL,
    hash TEXT NOT NULL,
    payload TEXT NOT NULL,
    UNIQUE (customer_id, sequence)
);
CREATE TRIGGER IF NOT EXISTS audit_trail_no_update
    BEFORE UPDATE ON audit_trail
    BEGIN SELECT RAISE(ABORT, 'audit trail is append-only'); END;
CREATE TRIGGER IF NOT EXISTS audit_trail_no_delete
    BEFORE DELETE ON audit_trail
    BEGIN SELECT RAISE(ABORT, 'audit trail is append-only'); END;

CREATE TABLE IF NOT EXISTS reference_counters (
    day TEXT PRIMARY KEY,
    value INTEGER NOT NULL
);
";

/// A [`KycStore`] backed by a single SQLite connection
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a database file
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        Self::with_connection(conn)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> StoreResult<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> StoreResult<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

fn parse_uuid(value: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| StoreError::Corrupt(format!("invalid id '{}': {}", value, e)))
}

fn tail_of(conn: &Connection, customer_id: Uuid) -> StoreResult<AuditChain> {
    let last = conn
        .query_row(
            "SELECT sequence, hash FROM audit_trail
             WHERE customer_id = ?1 ORDER BY sequence DESC LIMIT 1",
            params![customer_id.to_string()],
            |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()?;
    Ok(match last {
        Some((sequence, hash)) => AuditChain::resume(sequence as u64, hash),
        None => AuditChain::genesis(),
    })
}

fn write_customer(tx: &Transaction<'_>, record: &CustomerRecord) -> StoreResult<()> {
    let customer = &record.customer;
    let id = customer.id.to_string();
    tx.execute(
        "INSERT OR REPLACE INTO customers
         (id, customer_reference, customer_type, status, risk_level,
          created_at_ms, next_review_ms, version, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            id,
            customer.customer_reference,
            customer.customer_type.to_string(),
            customer.status.to_string(),
            customer.risk_level.to_string(),
            customer.created_at.timestamp_millis(),
            customer.next_review_date.map(|d| d.timestamp_millis()),
            record.version as i64,
            serde_json::to_string(record)?,
        ],
    )?;

    tx.execute("DELETE FROM document_expiry WHERE customer_id = ?1", params![id])?;
    for document in record.documents.iter().filter(|d| d.is_verified()) {
        if let Some(expiry) = document.expiry_date {
            tx.execute(
                "INSERT INTO document_expiry (document_id, customer_id, expiry_date)
                 VALUES (?1, ?2, ?3)",
                params![document.id.to_string(), id, expiry.to_string()],
            )?;
        }
    }
    Ok(())
}

fn write_alert(tx: &Transaction<'_>, alert: &ComplianceAlert) -> StoreResult<()> {
    tx.execute(
        "INSERT OR REPLACE INTO alerts
         (id, customer_id, alert_type, severity, status, created_at_ms, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            alert.id.to_string(),
            alert.customer_id.to_string(),
            alert.alert_type.to_string(),
            alert.severity.to_string(),
            alert.status.to_string(),
            alert.created_at.timestamp_millis(),
            serde_json::to_string(alert)?,
        ],
    )?;
    Ok(())
}

fn append_audit(tx: &Transaction<'_>, entry: &AuditEntry) -> StoreResult<()> {
    tx.execute(
        "INSERT INTO audit_trail
         (id, customer_id, sequence, action, timestamp, prev_hash, hash, payload)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            entry.id.to_string(),
            entry.customer_id.to_string(),
            entry.sequence as i64,
            entry.action.to_string(),
            entry.timestamp.to_rfc3339(),
            entry.prev_hash,
            entry.hash,
            serde_json::to_string(entry)?,
        ],
    )?;
    Ok(())
}

fn collect_payloads<T: serde::de::DeserializeOwned>(
    conn: &Connection,
    sql: &str,
    values: &[Value],
) -> StoreResult<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?;
    let mut items = Vec::new();
    for payload in rows {
        items.push(serde_json::from_str(&payload?)?);
    }
    Ok(items)
}

fn collect_ids(conn: &Connection, sql: &str, values: &[Value]) -> StoreResult<Vec<Uuid>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(values.iter()), |row| row.get::<_, String>(0))?;
    let mut ids = Vec::new();
    for id in rows {
        ids.push(parse_uuid(&id?)?);
    }
    Ok(ids)
}

#[async_trait]
impl KycStore for SqliteStore {
    async fn next_reference_sequence(&self, day: NaiveDate) -> StoreResult<u32> {
        let conn = self.conn.lock().await;
        let value: i64 = conn.query_row(
            "INSERT INTO reference_counters (day, value) VALUES (?1, 1)
             ON CONFLICT(day) DO UPDATE SET value = value + 1
             RETURNING value",
            params![day.to_string()],
            |row| row.get(0),
        )?;
        Ok(value as u32)
    }

    async fn load_customer(&self, id: Uuid) -> StoreResult<CustomerRecord> {
        let conn = self.conn.lock().await;
        let payload: String = conn
            .query_row(
                "SELECT payload FROM customers WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::CustomerNotFound(id),
                other => StoreError::Database(other),
            })?;
        Ok(serde_json::from_str(&payload)?)
    }

    async fn load_alert(&self, id: Uuid) -> StoreResult<ComplianceAlert> {
        let conn = self.conn.lock().await;
        let payload: String = conn
            .query_row(
                "SELECT payload FROM alerts WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::AlertNotFound(id),
                other => StoreError::Database(other),
            })?;
        Ok(serde_json::from_str(&payload)?)
    }

    async fn alerts_for_customer(&self, customer_id: Uuid) -> StoreResult<Vec<ComplianceAlert>> {
        let conn = self.conn.lock().await;
        collect_payloads(
            &conn,
            "SELECT payload FROM alerts WHERE customer_id = ?1 ORDER BY created_at_ms",
            &[Value::Text(customer_id.to_string())],
        )
    }

    async fn commit(&self, changes: ChangeSet) -> StoreResult<Option<u64>> {
        let mut conn = self.conn.lock().await;
        let tx = conn.transaction()?;

        let mut version = None;
        if let Some(mut record) = changes.customer {
            let stored: Option<i64> = tx
                .query_row(
                    "SELECT version FROM customers WHERE id = ?1",
                    params![record.id().to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            let stored = stored.map(|v| v as u64).unwrap_or(0);
            if stored != record.version {
                return Err(StoreError::Conflict {
                    customer_id: record.id(),
                    expected: record.version,
                    actual: stored,
                });
            }
            record.version += 1;
            write_customer(&tx, &record)?;
            version = Some(record.version);
        }

        for alert in &changes.alerts {
            write_alert(&tx, alert)?;
        }

        check_audit_appends(&changes.audit, |id| tail_of(&tx, id))?;
        for entry in &changes.audit {
            append_audit(&tx, entry)?;
        }

        tx.commit()?;
        debug!(
            alerts = changes.alerts.len(),
            audit_entries = changes.audit.len(),
            "Change set committed"
        );
        Ok(version)
    }

    async fn query_customers(&self, filter: &CustomerFilter) -> StoreResult<Vec<CustomerRecord>> {
        let mut sql = String::from("SELECT payload FROM customers WHERE 1 = 1");
        let mut values = Vec::new();
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(status.to_string()));
        }
        if let Some(level) = filter.risk_level {
            sql.push_str(" AND risk_level = ?");
            values.push(Value::Text(level.to_string()));
        }
        if let Some(customer_type) = filter.customer_type {
            sql.push_str(" AND customer_type = ?");
            values.push(Value::Text(customer_type.to_string()));
        }
        if let Some(from) = filter.created_from {
            sql.push_str(" AND created_at_ms >= ?");
            values.push(Value::Integer(from.timestamp_millis()));
        }
        if let Some(to) = filter.created_to {
            sql.push_str(" AND created_at_ms <= ?");
            values.push(Value::Integer(to.timestamp_millis()));
        }
        sql.push_str(" ORDER BY created_at_ms DESC");

        let conn = self.conn.lock().await;
        let records: Vec<CustomerRecord> = collect_payloads(&conn, &sql, &values)?;
        // Millisecond columns are coarser than the stored timestamps
        let records = records.into_iter().filter(|r| filter.matches(r)).collect();
        Ok(apply_limit(records, filter.limit))
    }

    async fn query_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<ComplianceAlert>> {
        let mut sql = String::from("SELECT payload FROM alerts WHERE 1 = 1");
        let mut values = Vec::new();
        if let Some(customer_id) = filter.customer_id {
            sql.push_str(" AND customer_id = ?");
            values.push(Value::Text(customer_id.to_string()));
        }
        if let Some(status) = filter.status {
            sql.push_str(" AND status = ?");
            values.push(Value::Text(status.to_string()));
        }
        if let Some(alert_type) = filter.alert_type {
            sql.push_str(" AND alert_type = ?");
            values.push(Value::Text(alert_type.to_string()));
        }
        if let Some(severity) = filter.severity {
            sql.push_str(" AND severity = ?");
            values.push(Value::Text(severity.to_string()));
        }
        sql.push_str(" ORDER BY created_at_ms DESC");
        if let Some(limit) = filter.limit {
            sql.push_str(" LIMIT ?");
            values.push(Value::Integer(limit as i64));
        }

        let conn = self.conn.lock().await;
        collect_payloads(&conn, &sql, &values)
    }

    async fn customers_due_for_review(&self, now: DateTime<Utc>) -> StoreResult<Vec<Uuid>> {
        let conn = self.conn.lock().await;
        collect_ids(
            &conn,
            "SELECT id FROM customers
             WHERE status = ?1 AND next_review_ms IS NOT NULL AND next_review_ms <= ?2",
            &[
                Value::Text(CustomerStatus::Approved.to_string()),
                Value::Integer(now.timestamp_millis()),
            ],
        )
    }

    async fn customers_with_expiring_documents(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> StoreResult<Vec<Uuid>> {
        let conn = self.conn.lock().await;
        collect_ids(
            &conn,
            "SELECT DISTINCT customer_id FROM document_expiry
             WHERE expiry_date > ?1 AND expiry_date <= ?2",
            &[Value::Text(from.to_string()), Value::Text(to.to_string())],
        )
    }

    async fn audit_trail(&self, customer_id: Uuid) -> StoreResult<Vec<AuditEntry>> {
        let conn = self.conn.lock().await;
        collect_payloads(
            &conn,
            "SELECT payload FROM audit_trail WHERE customer_id = ?1 ORDER BY sequence",
            &[Value::Text(customer_id.to_string())],
        )
    }

    async fn last_audit_link(&self, customer_id: Uuid) -> StoreResult<AuditChain> {
        let conn = self.conn.lock().await;
        tail_of(&conn, customer_id)
    }

    async fn stats(&self) -> StoreResult<StoreStats> {
        let conn = self.conn.lock().await;
        let mut stats = StoreStats::default();

        for (column, target) in [
            ("status", &mut stats.customers_by_status),
            ("risk_level", &mut stats.customers_by_risk_level),
        ] {
            let mut stmt = conn.prepare(&format!(
                "SELECT {column}, COUNT(*) FROM customers GROUP BY {column}"
            ))?;
            let rows = stmt.query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?;
            for row in rows {
                let (key, count) = row?;
                target.insert(key, count as u64);
            }
        }
        stats.total_customers = stats.customers_by_status.values().sum();

        let count = |sql: &str, values: &[Value]| -> StoreResult<u64> {
            let n: i64 = conn.query_row(sql, params_from_iter(values.iter()), |row| row.get(0))?;
            Ok(n as u64)
        };
        let open = Value::Text(AlertStatus::Open.to_string());
        stats.open_alerts = count(
            "SELECT COUNT(*) FROM alerts WHERE status = ?1",
            std::slice::from_ref(&open),
        )?;
        stats.investigating_alerts = count(
            "SELECT COUNT(*) FROM alerts WHERE status = ?1",
            &[Value::Text(AlertStatus::Investigating.to_string())],
        )?;
        stats.critical_open_alerts = count(
            "SELECT COUNT(*) FROM alerts WHERE status = ?1 AND severity = ?2",
            &[open, Value::Text(Severity::Critical.to_string())],
        )?;
        Ok(stats)
    }
}
