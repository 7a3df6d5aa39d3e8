//! Compliance alerts

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{AlertStatus, AlertType, Severity};

/// An alert raised against a customer
///
/// At most one alert per `(customer_id, alert_type)` may be active
/// (open or investigating) at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceAlert {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub status: AlertStatus,
    pub title: String,
    pub description: String,
    /// Component that raised the alert (e.g. `risk_scoring`, `screening`)
    pub triggered_by: String,
    /// Evidence payload
    pub source_data: serde_json::Value,
    pub assigned_to: Option<String>,
    pub resolved_by: Option<String>,
    pub resolution_notes: String,
    pub resolved_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ComplianceAlert {
    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }

    /// Does this alert block a new one of the same type for the same customer?
    pub fn blocks(&self, customer_id: Uuid, alert_type: AlertType) -> bool {
        self.customer_id == customer_id && self.alert_type == alert_type && self.is_active()
    }
}
