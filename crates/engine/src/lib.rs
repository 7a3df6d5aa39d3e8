//! KycFlow Engine - onboarding and compliance service
//!
//! [`KycService`] wires the risk, compliance and store crates together and
//! exposes the operations an API layer calls:
//!
//! - intake and documents: `create_customer`, `upload_document`, `verify_document`
//! - risk: `run_risk_assessment`, `apply_external_assessment`
//! - screening: `screen_customer` (bounded provider call), `apply_screening_result`
//! - decisions: `approve`, `reject`, `request_additional_info`, `suspend`
//! - alerts: `raise_alert`, `assign_alert`, `resolve_alert`, `bulk_resolve_alerts`
//! - scheduled: `check_document_expiry`, `periodic_customer_review`
//!
//! Mutations of one customer are serialised by [`CustomerLocks`]; each one is
//! committed as a single atomic change set.

pub mod config;
pub mod error;
pub mod jobs;
pub mod locks;
pub mod notify;
pub mod officers;
pub mod screening;
pub mod service;

pub use config::KycConfig;
pub use error::{ErrorKind, KycError, KycResult};
pub use jobs::JobReport;
pub use locks::CustomerLocks;
pub use notify::{Notification, NotificationKind, Notifier, RecordingNotifier, TracingNotifier};
pub use officers::{Officer, OfficerDirectory, StaticOfficerDirectory};
pub use screening::{ScreeningProvider, ScreeningRequest, StaticScreeningProvider};
pub use service::KycService;
