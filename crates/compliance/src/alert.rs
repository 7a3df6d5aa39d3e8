//! Alert engine
//!
//! Lifecycle:
//!
//! ```text
//! open ──assign──► investigating ──resolve──────────► resolved
//!   │                   │
//!   └───────────────────┴──mark_false_positive──► false_positive
//! ```
//!
//! Raising is deduplicated: while an alert of the same `(customer, type)` is
//! open or investigating, a new request is suppressed rather than rejected.

use chrono::{DateTime, Utc};
use kycflow_core::{
    Actor, AlertStatus, AlertType, AuditAction, AuditEntry, ComplianceAlert, Severity,
};
use serde_json::json;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{ComplianceError, ComplianceResult};

/// A request to raise an alert
#[derive(Debug, Clone, PartialEq)]
pub struct AlertRequest {
    pub customer_id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub triggered_by: String,
    pub evidence: serde_json::Value,
}

/// Result of [`AlertEngine::raise`]
#[derive(Debug, Clone, PartialEq)]
pub enum RaiseOutcome {
    /// A new alert plus its `alert_raise` audit entry
    Raised {
        alert: ComplianceAlert,
        audit: AuditEntry,
    },
    /// An active alert of the same type already exists
    Deduplicated(Uuid),
}

impl RaiseOutcome {
    pub fn is_raised(&self) -> bool {
        matches!(self, RaiseOutcome::Raised { .. })
    }

    /// Id of the new or the already active alert
    pub fn alert_id(&self) -> Uuid {
        match self {
            RaiseOutcome::Raised { alert, .. } => alert.id,
            RaiseOutcome::Deduplicated(id) => *id,
        }
    }
}

/// Stateless alert rules
#[derive(Debug, Clone, Copy, Default)]
pub struct AlertEngine;

impl AlertEngine {
    pub fn new() -> Self {
        Self
    }

    /// Raise an alert unless an equivalent one is still active
    ///
    /// `existing` must hold every alert of the request's customer.
    pub fn raise(
        &self,
        existing: &[ComplianceAlert],
        request: AlertRequest,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> RaiseOutcome {
        if let Some(active) = existing
            .iter()
            .find(|a| a.blocks(request.customer_id, request.alert_type))
        {
            debug!(
                customer_id = %request.customer_id,
                alert_type = %request.alert_type,
                existing = %active.id,
                "Alert deduplicated"
            );
            return RaiseOutcome::Deduplicated(active.id);
        }

        let alert = ComplianceAlert {
            id: Uuid::new_v4(),
            customer_id: request.customer_id,
            alert_type: request.alert_type,
            severity: request.severity,
            status: AlertStatus::Open,
            title: request.title,
            description: request.description,
            triggered_by: request.triggered_by,
            source_data: request.evidence,
            assigned_to: None,
            resolved_by: None,
            resolution_notes: String::new(),
            resolved_at: None,
            created_at: now,
            updated_at: now,
        };

        info!(
            customer_id = %alert.customer_id,
            alert_id = %alert.id,
            alert_type = %alert.alert_type,
            severity = %alert.severity,
            "Compliance alert raised"
        );

        let audit = AuditEntry::new(
            alert.customer_id,
            AuditAction::AlertRaise,
            format!("Alert raised: {} ({})", alert.title, alert.severity),
            actor,
            now,
        )
        .with_data(json!({
            "alert_id": alert.id,
            "alert_type": alert.alert_type,
            "severity": alert.severity,
            "triggered_by": alert.triggered_by,
        }));

        RaiseOutcome::Raised { alert, audit }
    }

    /// Hand an alert to an officer; moves it to `investigating`
    ///
    /// The officer's existence is checked by the caller.
    pub fn assign(
        &self,
        alert: &mut ComplianceAlert,
        officer: &str,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        ensure_active(alert)?;
        let previous = alert.status;
        alert.status = AlertStatus::Investigating;
        alert.assigned_to = Some(officer.to_string());
        alert.updated_at = now;

        Ok(update_entry(
            alert,
            previous,
            format!("Alert assigned to {}", officer),
            actor,
            now,
        ))
    }

    /// Close an alert as resolved
    pub fn resolve(
        &self,
        alert: &mut ComplianceAlert,
        resolver: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        self.close(alert, AlertStatus::Resolved, resolver, notes, now)
    }

    /// Close an alert as a false positive
    pub fn mark_false_positive(
        &self,
        alert: &mut ComplianceAlert,
        resolver: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        self.close(alert, AlertStatus::FalsePositive, resolver, notes, now)
    }

    /// Resolve every `open` alert in `alerts`; others are skipped
    pub fn bulk_resolve(
        &self,
        alerts: &mut [ComplianceAlert],
        resolver: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> Vec<AuditEntry> {
        alerts
            .iter_mut()
            .filter(|a| a.status == AlertStatus::Open)
            .filter_map(|a| self.resolve(a, resolver, notes, now).ok())
            .collect()
    }

    fn close(
        &self,
        alert: &mut ComplianceAlert,
        status: AlertStatus,
        resolver: &Actor,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ComplianceResult<AuditEntry> {
        ensure_active(alert)?;
        let previous = alert.status;
        alert.status = status;
        alert.resolved_by = Some(resolver.id.clone());
        alert.resolution_notes = notes.to_string();
        alert.resolved_at = Some(now);
        alert.updated_at = now;

        info!(alert_id = %alert.id, status = %status, "Compliance alert closed");

        Ok(update_entry(
            alert,
            previous,
            format!("Alert {}: {}", status, alert.title),
            resolver,
            now,
        ))
    }
}

fn ensure_active(alert: &ComplianceAlert) -> ComplianceResult<()> {
    if alert.status.is_terminal() {
        return Err(ComplianceError::AlertAlreadyResolved {
            id: alert.id,
            status: alert.status.to_string(),
        });
    }
    Ok(())
}

fn update_entry(
    alert: &ComplianceAlert,
    previous: AlertStatus,
    description: String,
    actor: &Actor,
    now: DateTime<Utc>,
) -> AuditEntry {
    AuditEntry::new(alert.customer_id, AuditAction::AlertUpdate, description, actor, now)
        .with_change("alert_status", previous, alert.status)
        .with_data(json!({
            "alert_id": alert.id,
            "alert_type": alert.alert_type,
            "assigned_to": alert.assigned_to,
            "resolution_notes": alert.resolution_notes,
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(customer_id: Uuid, alert_type: AlertType) -> AlertRequest {
        AlertRequest {
            customer_id,
            alert_type,
            severity: Severity::Medium,
            title: "Passport expiring".to_string(),
            description: "Passport expires in 12 days".to_string(),
            triggered_by: "document_expiry".to_string(),
            evidence: json!({ "days_left": 12 }),
        }
    }

    fn raised(outcome: RaiseOutcome) -> ComplianceAlert {
        match outcome {
            RaiseOutcome::Raised { alert, .. } => alert,
            RaiseOutcome::Deduplicated(id) => panic!("unexpectedly deduplicated against {}", id),
        }
    }

    fn actor() -> Actor {
        Actor::new("officer-1", "Officer One")
    }

    #[test]
    fn test_raise_creates_open_alert() {
        let engine = AlertEngine::new();
        let customer_id = Uuid::new_v4();
        match engine.raise(&[], request(customer_id, AlertType::DocumentExpiry), &actor(), Utc::now()) {
            RaiseOutcome::Raised { alert, audit } => {
                assert_eq!(alert.status, AlertStatus::Open);
                assert_eq!(alert.customer_id, customer_id);
                assert_eq!(audit.action, AuditAction::AlertRaise);
                assert_eq!(audit.additional_data["alert_id"], json!(alert.id));
            }
            other => panic!("expected raise, got {:?}", other),
        }
    }

    #[test]
    fn test_raise_deduplicates_active_alert() {
        let engine = AlertEngine::new();
        let customer_id = Uuid::new_v4();
        let first = raised(engine.raise(
            &[],
            request(customer_id, AlertType::DocumentExpiry),
            &actor(),
            Utc::now(),
        ));

        let existing = vec![first.clone()];
        let second = engine.raise(
            &existing,
            request(customer_id, AlertType::DocumentExpiry),
            &actor(),
            Utc::now(),
        );
        assert_eq!(second, RaiseOutcome::Deduplicated(first.id));

        // A different type for the same customer is not blocked
        assert!(engine
            .raise(&existing, request(customer_id, AlertType::ReviewDue), &actor(), Utc::now())
            .is_raised());
    }

    #[test]
    fn test_raise_after_resolution_succeeds() {
        let engine = AlertEngine::new();
        let customer_id = Uuid::new_v4();
        let mut first = raised(engine.raise(
            &[],
            request(customer_id, AlertType::PepMatch),
            &actor(),
            Utc::now(),
        ));
        engine.resolve(&mut first, &actor(), "cleared", Utc::now()).unwrap();

        let outcome = engine.raise(&[first], request(customer_id, AlertType::PepMatch), &actor(), Utc::now());
        assert!(outcome.is_raised());
    }

    #[test]
    fn test_assign_moves_to_investigating() {
        let engine = AlertEngine::new();
        let mut alert = raised(engine.raise(
            &[],
            request(Uuid::new_v4(), AlertType::SanctionsHit),
            &actor(),
            Utc::now(),
        ));

        let audit = engine.assign(&mut alert, "officer-2", &actor(), Utc::now()).unwrap();
        assert_eq!(alert.status, AlertStatus::Investigating);
        assert_eq!(alert.assigned_to.as_deref(), Some("officer-2"));
        assert_eq!(audit.old_value.as_deref(), Some("open"));
        assert_eq!(audit.new_value.as_deref(), Some("investigating"));
    }

    #[test]
    fn test_terminal_alert_rejects_transitions() {
        let engine = AlertEngine::new();
        let mut alert = raised(engine.raise(
            &[],
            request(Uuid::new_v4(), AlertType::AdverseMedia),
            &actor(),
            Utc::now(),
        ));
        engine
            .mark_false_positive(&mut alert, &actor(), "name collision", Utc::now())
            .unwrap();
        assert_eq!(alert.status, AlertStatus::FalsePositive);
        assert_eq!(alert.resolved_by.as_deref(), Some("officer-1"));

        assert!(matches!(
            engine.assign(&mut alert, "officer-2", &actor(), Utc::now()),
            Err(ComplianceError::AlertAlreadyResolved { .. })
        ));
        assert!(engine.resolve(&mut alert, &actor(), "again", Utc::now()).is_err());
    }

    #[test]
    fn test_bulk_resolve_skips_non_open() {
        let engine = AlertEngine::new();
        let customer_id = Uuid::new_v4();
        let mut alerts: Vec<ComplianceAlert> = [
            AlertType::DocumentExpiry,
            AlertType::ReviewDue,
            AlertType::UnusualActivity,
        ]
        .into_iter()
        .map(|t| raised(engine.raise(&[], request(customer_id, t), &actor(), Utc::now())))
        .collect();
        engine.assign(&mut alerts[1], "officer-2", &actor(), Utc::now()).unwrap();

        let entries = engine.bulk_resolve(&mut alerts, &actor(), "batch close", Utc::now());
        assert_eq!(entries.len(), 2);
        assert_eq!(alerts[0].status, AlertStatus::Resolved);
        assert_eq!(alerts[1].status, AlertStatus::Investigating);
        assert_eq!(alerts[2].status, AlertStatus::Resolved);
    }
}
