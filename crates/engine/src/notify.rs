//! Customer notifications
//!
//! Delivered fire-and-forget after the triggering change is committed; a
//! delivery failure is logged and never undoes the change.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use kycflow_core::Customer;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::info;
use uuid::Uuid;

use crate::error::KycResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NotificationKind {
    ApplicationReceived,
    AdditionalInfoRequired,
    ApplicationApproved,
    ApplicationRejected,
}

impl NotificationKind {
    pub fn subject(&self) -> &'static str {
        match self {
            NotificationKind::ApplicationReceived => "KYC Application Received",
            NotificationKind::AdditionalInfoRequired => {
                "Additional Information Required - KYC Application"
            }
            NotificationKind::ApplicationApproved => "KYC Application Approved",
            NotificationKind::ApplicationRejected => "KYC Application Status Update",
        }
    }

    fn message(&self) -> &'static str {
        match self {
            NotificationKind::ApplicationReceived => {
                "We have received your KYC application and it is currently being processed."
            }
            NotificationKind::AdditionalInfoRequired => {
                "We need additional information to complete your KYC application. \
                 Please log in to your account to provide the required information."
            }
            NotificationKind::ApplicationApproved => {
                "Your KYC application has been approved. You can now access all services."
            }
            NotificationKind::ApplicationRejected => {
                "We regret to inform you that your KYC application could not be approved \
                 at this time. For more information, please contact our support team."
            }
        }
    }

    /// Render the message for a customer
    pub fn render(&self, customer: &Customer, recipient: Option<&str>) -> Notification {
        let body = format!(
            "Dear {},\n\n{}\n\nReference: {}\n\nThank you.",
            customer.name,
            self.message(),
            customer.customer_reference
        );
        Notification {
            customer_id: customer.id,
            kind: *self,
            recipient: recipient.unwrap_or(&customer.email).to_string(),
            subject: self.subject().to_string(),
            body,
        }
    }
}

/// A rendered message ready for delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub customer_id: Uuid,
    pub kind: NotificationKind,
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Delivery channel (email gateway, message queue, ...)
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Channel name (for logging)
    fn name(&self) -> &str;

    async fn deliver(&self, notification: &Notification) -> KycResult<()>;
}

/// Logs notifications instead of sending them
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    fn name(&self) -> &str {
        "tracing"
    }

    async fn deliver(&self, notification: &Notification) -> KycResult<()> {
        info!(
            customer_id = %notification.customer_id,
            kind = %notification.kind,
            recipient = %notification.recipient,
            subject = %notification.subject,
            "Notification delivered"
        );
        Ok(())
    }
}

/// Keeps every delivered notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn kinds_for(&self, customer_id: Uuid) -> Vec<NotificationKind> {
        self.sent()
            .into_iter()
            .filter(|n| n.customer_id == customer_id)
            .map(|n| n.kind)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn deliver(&self, notification: &Notification) -> KycResult<()> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kycflow_core::{CustomerIntake, CustomerType};

    fn customer() -> Customer {
        Customer::from_intake(
            CustomerIntake {
                customer_type: CustomerType::Individual,
                name: "Jane Doe".to_string(),
                email: "Jane@Example.com".to_string(),
                phone_number: None,
                individual_details: None,
                corporate_details: None,
            },
            "CUST-20240301-0007".to_string(),
            Utc::now(),
        )
    }

    #[test]
    fn test_render_defaults_to_customer_email() {
        let n = NotificationKind::ApplicationApproved.render(&customer(), None);
        assert_eq!(n.recipient, "jane@example.com");
        assert_eq!(n.subject, "KYC Application Approved");
        assert!(n.body.starts_with("Dear Jane Doe,"));
        assert!(n.body.contains("Reference: CUST-20240301-0007"));
    }

    #[test]
    fn test_render_explicit_recipient() {
        let n = NotificationKind::ApplicationRejected.render(&customer(), Some("ops@bank.test"));
        assert_eq!(n.recipient, "ops@bank.test");
        assert_eq!(n.subject, "KYC Application Status Update");
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(
            NotificationKind::AdditionalInfoRequired.to_string(),
            "additional_info_required"
        );
        assert_eq!(
            "application_received".parse::<NotificationKind>().unwrap(),
            NotificationKind::ApplicationReceived
        );
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        let c = customer();
        notifier
            .deliver(&NotificationKind::ApplicationReceived.render(&c, None))
            .await
            .unwrap();
        assert_eq!(
            notifier.kinds_for(c.id),
            vec![NotificationKind::ApplicationReceived]
        );
    }
}
