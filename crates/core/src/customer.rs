//! Customer identity and intake

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;
use crate::types::{CustomerStatus, CustomerType, KycType, RiskLevel};

/// The principal performing a mutating call (recorded in the audit trail)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// An automated component acting on its own (scheduled jobs, scoring)
    pub fn system(component: &str) -> Self {
        Self {
            id: format!("system:{}", component),
            name: component.to_string(),
        }
    }

    pub fn is_system(&self) -> bool {
        self.id.starts_with("system:")
    }
}

/// Personal details of an individual customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndividualDetails {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: String,
    #[serde(default)]
    pub residential_country: String,
    #[serde(default)]
    pub occupation: String,
}

/// A natural person with significant ownership or control of a corporate customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeneficialOwner {
    pub first_name: String,
    pub last_name: String,
    pub nationality: String,
    pub ownership_percentage: Decimal,
    #[serde(default)]
    pub position: String,
    #[serde(default)]
    pub is_pep: bool,
    #[serde(default)]
    pub sanctions_hit: bool,
}

/// Company details of a corporate customer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorporateDetails {
    pub legal_name: String,
    pub registration_number: String,
    pub incorporation_date: Option<NaiveDate>,
    pub incorporation_country: String,
    pub business_type: String,
    #[serde(default)]
    pub industry_sector: String,
    #[serde(default)]
    pub beneficial_owners: Vec<BeneficialOwner>,
}

/// Intake payload for a new application
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerIntake {
    pub customer_type: CustomerType,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub individual_details: Option<IndividualDetails>,
    #[serde(default)]
    pub corporate_details: Option<CorporateDetails>,
}

impl CustomerIntake {
    /// Reject payloads that cannot describe a customer
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::validation("name", "must not be empty"));
        }
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(CoreError::validation("email", "must be a valid address"));
        }
        match self.customer_type {
            CustomerType::Individual if self.corporate_details.is_some() => Err(
                CoreError::validation("corporate_details", "not allowed for individual customers"),
            ),
            CustomerType::Corporate if self.individual_details.is_some() => Err(
                CoreError::validation("individual_details", "not allowed for corporate customers"),
            ),
            _ => Ok(()),
        }?;
        if let Some(details) = &self.corporate_details {
            if details.registration_number.trim().is_empty() {
                return Err(CoreError::validation(
                    "corporate_details.registration_number",
                    "must not be empty",
                ));
            }
            for owner in &details.beneficial_owners {
                if owner.ownership_percentage < Decimal::ZERO
                    || owner.ownership_percentage > Decimal::ONE_HUNDRED
                {
                    return Err(CoreError::validation(
                        "beneficial_owners.ownership_percentage",
                        "must be within 0..=100",
                    ));
                }
            }
        }
        Ok(())
    }
}

/// A KYC applicant
///
/// Never deleted: regulatory retention requires the full history to remain
/// queryable after rejection or suspension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub customer_reference: String,
    pub customer_type: CustomerType,
    pub name: String,
    pub email: String,
    pub phone_number: Option<String>,

    pub kyc_type: KycType,
    pub risk_level: RiskLevel,
    pub status: CustomerStatus,

    /// Mirror of the latest overall risk score (0-100, 2 dp)
    pub aml_risk_score: Decimal,
    pub sanctions_checked: bool,
    pub pep_checked: bool,
    pub adverse_media_checked: bool,

    pub individual_details: Option<IndividualDetails>,
    pub corporate_details: Option<CorporateDetails>,

    pub reviewed_by: Option<String>,
    pub review_notes: String,
    pub compliance_officer: Option<String>,
    pub next_review_date: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_at: Option<DateTime<Utc>>,
}

impl Customer {
    /// Build a fresh applicant from a validated intake
    pub fn from_intake(intake: CustomerIntake, reference: String, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_reference: reference,
            customer_type: intake.customer_type,
            name: intake.name.trim().to_string(),
            email: intake.email.trim().to_lowercase(),
            phone_number: intake.phone_number,
            kyc_type: KycType::default(),
            risk_level: RiskLevel::default(),
            status: CustomerStatus::Pending,
            aml_risk_score: Decimal::ZERO,
            sanctions_checked: false,
            pep_checked: false,
            adverse_media_checked: false,
            individual_details: intake.individual_details,
            corporate_details: intake.corporate_details,
            reviewed_by: None,
            review_notes: String::new(),
            compliance_officer: None,
            next_review_date: None,
            created_at: now,
            updated_at: now,
            approved_at: None,
            rejected_at: None,
        }
    }

    pub fn is_corporate(&self) -> bool {
        self.customer_type == CustomerType::Corporate
    }

    /// Nationality (individual) or incorporation country (corporate), if known
    pub fn jurisdiction(&self) -> Option<&str> {
        match self.customer_type {
            CustomerType::Individual => self
                .individual_details
                .as_ref()
                .map(|d| d.nationality.as_str()),
            CustomerType::Corporate => self
                .corporate_details
                .as_ref()
                .map(|d| d.incorporation_country.as_str()),
        }
    }

    /// Date of birth for individuals, used by the screening provider
    pub fn date_of_birth(&self) -> Option<NaiveDate> {
        self.individual_details.as_ref().and_then(|d| d.date_of_birth)
    }
}

/// Generate a human-readable reference: `CUST-YYYYMMDD-NNNN`
pub fn customer_reference(now: DateTime<Utc>, daily_sequence: u32) -> String {
    format!("CUST-{}-{:04}", now.format("%Y%m%d"), daily_sequence)
}
