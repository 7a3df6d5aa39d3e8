//! Screening result handling
//!
//! A screening result may arrive from a polled provider call or from a
//! webhook push. Either way it is applied the same way: all three `_checked`
//! flags are set, the workflow's cleared flags are overwritten with the
//! negation of each hit, and every hit requests an alert.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use kycflow_core::{
    Actor, AlertType, AuditAction, AuditEntry, ComplianceAlert, CustomerRecord, CustomerStatus,
    Severity,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::alert::{AlertEngine, AlertRequest, RaiseOutcome};
use crate::error::{ComplianceError, ComplianceResult};

const REQUIRED_FIELDS: [&str; 3] = ["sanctions_hit", "pep_hit", "adverse_media_hit"];

/// One candidate match reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningMatch {
    pub list: String,
    pub matched_name: String,
    #[serde(default)]
    pub score: Option<Decimal>,
}

/// Outcome of a sanctions / PEP / adverse media check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreeningResult {
    pub sanctions_hit: bool,
    pub pep_hit: bool,
    pub adverse_media_hit: bool,
    #[serde(default)]
    pub confidence: Option<Decimal>,
    #[serde(default)]
    pub matches: Vec<ScreeningMatch>,
    #[serde(default)]
    pub provider: Option<String>,
    /// Raw provider payload, attached to any alert raised
    #[serde(default)]
    pub evidence: serde_json::Value,
}

impl ScreeningResult {
    pub fn clear() -> Self {
        Self {
            sanctions_hit: false,
            pep_hit: false,
            adverse_media_hit: false,
            confidence: None,
            matches: Vec::new(),
            provider: None,
            evidence: serde_json::Value::Null,
        }
    }

    /// Parse a pushed payload, requiring all three hit flags
    pub fn from_payload(payload: serde_json::Value) -> ComplianceResult<Self> {
        let object = payload.as_object().ok_or_else(|| {
            ComplianceError::Validation("screening result must be a JSON object".to_string())
        })?;
        for field in REQUIRED_FIELDS {
            match object.get(field) {
                Some(serde_json::Value::Bool(_)) => {}
                Some(_) => {
                    return Err(ComplianceError::Validation(format!(
                        "screening field '{}' must be a boolean",
                        field
                    )))
                }
                None => {
                    return Err(ComplianceError::Validation(format!(
                        "missing required screening field '{}'",
                        field
                    )))
                }
            }
        }
        if let Some(confidence) = object.get("confidence").filter(|v| !v.is_null()) {
            let in_range = parse_confidence(confidence)
                .map(|c| c >= Decimal::ZERO && c <= Decimal::ONE)
                .unwrap_or(false);
            if !in_range {
                return Err(ComplianceError::Validation(
                    "screening confidence must be a number within 0..=1".to_string(),
                ));
            }
        }

        let mut result: ScreeningResult = serde_json::from_value(payload.clone())
            .map_err(|e| ComplianceError::Validation(format!("malformed screening result: {}", e)))?;
        if result.evidence.is_null() {
            result.evidence = payload;
        }
        Ok(result)
    }

    pub fn any_hit(&self) -> bool {
        self.sanctions_hit || self.pep_hit || self.adverse_media_hit
    }

    fn hits(&self) -> Vec<(AlertType, Severity)> {
        let mut hits = Vec::new();
        if self.sanctions_hit {
            hits.push((AlertType::SanctionsHit, Severity::Critical));
        }
        if self.pep_hit {
            hits.push((AlertType::PepMatch, Severity::High));
        }
        if self.adverse_media_hit {
            hits.push((AlertType::AdverseMedia, Severity::High));
        }
        hits
    }
}

/// Confidence given as a JSON number or a decimal string
fn parse_confidence(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

/// What applying a screening result changed
#[derive(Debug, Clone, Default)]
pub struct ScreeningOutcome {
    /// Newly raised alerts
    pub alerts: Vec<ComplianceAlert>,
    /// Hits suppressed by an already active alert
    pub deduplicated: Vec<Uuid>,
    /// One `screening` entry followed by one `alert_raise` per new alert
    pub audit: Vec<AuditEntry>,
}

/// Applies screening results to a customer
#[derive(Debug, Clone, Copy, Default)]
pub struct ScreeningCoordinator {
    alerts: AlertEngine,
}

impl ScreeningCoordinator {
    pub fn new(alerts: AlertEngine) -> Self {
        Self { alerts }
    }

    /// Apply a result; safe to repeat, later results supersede earlier flags
    pub fn apply(
        &self,
        record: &mut CustomerRecord,
        existing_alerts: &[ComplianceAlert],
        result: &ScreeningResult,
        actor: &Actor,
        now: DateTime<Utc>,
    ) -> ScreeningOutcome {
        let customer_id = record.id();
        let previous_status = record.customer.status;

        record.customer.sanctions_checked = true;
        record.customer.pep_checked = true;
        record.customer.adverse_media_checked = true;
        record.workflow.sanctions_cleared = !result.sanctions_hit;
        record.workflow.pep_cleared = !result.pep_hit;
        record.workflow.adverse_media_cleared = !result.adverse_media_hit;

        if result.any_hit()
            && matches!(
                previous_status,
                CustomerStatus::Pending | CustomerStatus::RequiresAdditionalInfo
            )
        {
            record.customer.status = CustomerStatus::UnderReview;
        }
        record.touch(now);

        let mut screening_entry = AuditEntry::new(
            customer_id,
            AuditAction::Screening,
            format!(
                "Screening applied: sanctions={} pep={} adverse_media={}",
                hit_label(result.sanctions_hit),
                hit_label(result.pep_hit),
                hit_label(result.adverse_media_hit)
            ),
            actor,
            now,
        )
        .with_data(json!({
            "sanctions_hit": result.sanctions_hit,
            "pep_hit": result.pep_hit,
            "adverse_media_hit": result.adverse_media_hit,
            "confidence": result.confidence,
            "provider": result.provider,
            "matches": result.matches,
        }));
        if record.customer.status != previous_status {
            screening_entry =
                screening_entry.with_change("status", previous_status, record.customer.status);
        }

        let mut outcome = ScreeningOutcome {
            audit: vec![screening_entry],
            ..ScreeningOutcome::default()
        };

        for (alert_type, severity) in result.hits() {
            let request = AlertRequest {
                customer_id,
                alert_type,
                severity,
                title: format!("{} for {}", hit_title(alert_type), record.customer.name),
                description: match_description(result),
                triggered_by: result
                    .provider
                    .clone()
                    .unwrap_or_else(|| "screening".to_string()),
                evidence: result.evidence.clone(),
            };
            match self.alerts.raise(existing_alerts, request, actor, now) {
                RaiseOutcome::Raised { alert, audit } => {
                    warn!(
                        customer_id = %customer_id,
                        alert_type = %alert_type,
                        "Screening hit"
                    );
                    outcome.alerts.push(alert);
                    outcome.audit.push(audit);
                }
                RaiseOutcome::Deduplicated(id) => outcome.deduplicated.push(id),
            }
        }

        info!(
            customer_id = %customer_id,
            new_alerts = outcome.alerts.len(),
            deduplicated = outcome.deduplicated.len(),
            "Screening result applied"
        );
        outcome
    }
}

fn hit_label(hit: bool) -> &'static str {
    if hit {
        "hit"
    } else {
        "clear"
    }
}

fn hit_title(alert_type: AlertType) -> &'static str {
    match alert_type {
        AlertType::SanctionsHit => "Sanctions screening hit",
        AlertType::PepMatch => "PEP match",
        _ => "Adverse media match",
    }
}

fn match_description(result: &ScreeningResult) -> String {
    if result.matches.is_empty() {
        return "Potential match reported by screening provider".to_string();
    }
    let names: Vec<String> = result
        .matches
        .iter()
        .map(|m| format!("{} ({})", m.matched_name, m.list))
        .collect();
    format!("Potential match: {}", names.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kycflow_core::{CustomerIntake, CustomerType};

    fn record() -> CustomerRecord {
        CustomerRecord::new(
            CustomerIntake {
                customer_type: CustomerType::Individual,
                name: "Ivan Petrov".to_string(),
                email: "ivan@example.com".to_string(),
                phone_number: None,
                individual_details: None,
                corporate_details: None,
            },
            "CUST-20240101-0001".to_string(),
            Utc::now(),
        )
    }

    fn sanctions_hit() -> ScreeningResult {
        ScreeningResult {
            sanctions_hit: true,
            matches: vec![ScreeningMatch {
                list: "OFAC SDN".to_string(),
                matched_name: "Ivan Petrov".to_string(),
                score: None,
            }],
            ..ScreeningResult::clear()
        }
    }

    #[test]
    fn test_from_payload_requires_hit_flags() {
        let err = ScreeningResult::from_payload(json!({ "sanctions_hit": true, "pep_hit": false }))
            .unwrap_err();
        assert!(matches!(err, ComplianceError::Validation(_)));
        assert!(err.to_string().contains("adverse_media_hit"));

        assert!(ScreeningResult::from_payload(json!({
            "sanctions_hit": "yes", "pep_hit": false, "adverse_media_hit": false
        }))
        .is_err());
    }

    #[test]
    fn test_from_payload_keeps_raw_evidence() {
        let result = ScreeningResult::from_payload(json!({
            "sanctions_hit": false,
            "pep_hit": true,
            "adverse_media_hit": false,
            "confidence": 0.91,
            "reference": "scr-77"
        }))
        .unwrap();
        assert!(result.pep_hit);
        assert_eq!(result.evidence["reference"], "scr-77");
    }

    #[test]
    fn test_from_payload_confidence_range() {
        let payload = |confidence: serde_json::Value| {
            json!({
                "sanctions_hit": false,
                "pep_hit": false,
                "adverse_media_hit": false,
                "confidence": confidence
            })
        };

        let result = ScreeningResult::from_payload(payload(json!("0.5"))).unwrap();
        assert_eq!(result.confidence, Some(Decimal::new(5, 1)));
        let result = ScreeningResult::from_payload(payload(json!(1))).unwrap();
        assert_eq!(result.confidence, Some(Decimal::ONE));
        assert!(ScreeningResult::from_payload(payload(serde_json::Value::Null)).is_ok());

        for bad in [json!("5"), json!("-0.1"), json!(5.0), json!(-1), json!("high"), json!(true)] {
            let err = ScreeningResult::from_payload(payload(bad)).unwrap_err();
            assert!(matches!(err, ComplianceError::Validation(_)));
        }
    }

    #[test]
    fn test_clear_result_sets_flags() {
        let mut r = record();
        let outcome = ScreeningCoordinator::default().apply(
            &mut r,
            &[],
            &ScreeningResult::clear(),
            &Actor::system("screening"),
            Utc::now(),
        );

        assert!(r.customer.sanctions_checked && r.customer.pep_checked && r.customer.adverse_media_checked);
        assert!(r.workflow.sanctions_cleared && r.workflow.pep_cleared && r.workflow.adverse_media_cleared);
        assert!(outcome.alerts.is_empty());
        assert_eq!(outcome.audit.len(), 1);
        assert_eq!(r.customer.status, CustomerStatus::Pending);
    }

    #[test]
    fn test_sanctions_hit_raises_one_critical_alert() {
        let mut r = record();
        let coordinator = ScreeningCoordinator::default();
        let actor = Actor::system("screening");

        let first = coordinator.apply(&mut r, &[], &sanctions_hit(), &actor, Utc::now());
        assert_eq!(first.alerts.len(), 1);
        assert_eq!(first.alerts[0].severity, Severity::Critical);
        assert_eq!(first.alerts[0].alert_type, AlertType::SanctionsHit);
        assert!(!r.workflow.sanctions_cleared);
        assert!(r.workflow.pep_cleared);
        assert_eq!(r.customer.status, CustomerStatus::UnderReview);
        assert_eq!(first.audit.len(), 2);

        // Re-applying the same result is deduplicated
        let second = coordinator.apply(&mut r, &first.alerts, &sanctions_hit(), &actor, Utc::now());
        assert!(second.alerts.is_empty());
        assert_eq!(second.deduplicated, vec![first.alerts[0].id]);
    }

    #[test]
    fn test_later_result_supersedes_flags() {
        let mut r = record();
        let coordinator = ScreeningCoordinator::default();
        let actor = Actor::system("screening");

        coordinator.apply(&mut r, &[], &sanctions_hit(), &actor, Utc::now());
        assert!(!r.workflow.sanctions_cleared);

        coordinator.apply(&mut r, &[], &ScreeningResult::clear(), &actor, Utc::now());
        assert!(r.workflow.sanctions_cleared);
    }

    #[test]
    fn test_pep_and_media_severities() {
        let mut r = record();
        let result = ScreeningResult {
            pep_hit: true,
            adverse_media_hit: true,
            ..ScreeningResult::clear()
        };
        let outcome = ScreeningCoordinator::default().apply(
            &mut r,
            &[],
            &result,
            &Actor::system("screening"),
            Utc::now(),
        );
        assert_eq!(outcome.alerts.len(), 2);
        assert!(outcome.alerts.iter().all(|a| a.severity == Severity::High));
    }
}
