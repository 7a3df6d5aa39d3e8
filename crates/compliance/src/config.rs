//! Compliance configuration
//!
//! Defaults follow common onboarding policy: screening calls are bounded,
//! documents are flagged a month before they expire, and review cadence
//! tightens as risk rises.

use std::time::Duration;

use kycflow_core::{CustomerType, DocumentType, RiskLevel};
use serde::{Deserialize, Serialize};

use crate::error::{ComplianceError, ComplianceResult};

/// Configuration for alerting, screening and workflow
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceConfig {
    // === External Services ===
    /// Upper bound for a screening provider call
    #[serde(default = "default_screening_timeout_ms")]
    pub screening_timeout_ms: u64,

    // === Jobs ===
    /// Verified documents expiring within this many days raise an alert
    #[serde(default = "default_document_expiry_window_days")]
    pub document_expiry_window_days: i64,

    #[serde(default)]
    pub review_frequency: ReviewFrequency,

    // === Workflow ===
    #[serde(default)]
    pub required_documents: RequiredDocuments,
}

/// Days between periodic reviews, per risk level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFrequency {
    #[serde(default = "default_review_low")]
    pub low: i64,
    #[serde(default = "default_review_medium")]
    pub medium: i64,
    #[serde(default = "default_review_high")]
    pub high: i64,
    #[serde(default = "default_review_critical")]
    pub critical: i64,
}

/// Document types that must be on file before `documents_complete` is set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredDocuments {
    #[serde(default = "default_individual_documents")]
    pub individual: Vec<DocumentType>,
    #[serde(default = "default_corporate_documents")]
    pub corporate: Vec<DocumentType>,
}

// Default value functions for serde
fn default_screening_timeout_ms() -> u64 {
    5_000
}

fn default_document_expiry_window_days() -> i64 {
    30
}

fn default_review_low() -> i64 {
    365
}

fn default_review_medium() -> i64 {
    180
}

fn default_review_high() -> i64 {
    90
}

fn default_review_critical() -> i64 {
    30
}

fn default_individual_documents() -> Vec<DocumentType> {
    vec![DocumentType::Passport, DocumentType::UtilityBill]
}

fn default_corporate_documents() -> Vec<DocumentType> {
    vec![
        DocumentType::IncorporationCertificate,
        DocumentType::MemorandumArticles,
        DocumentType::FinancialStatements,
    ]
}

impl Default for ReviewFrequency {
    fn default() -> Self {
        Self {
            low: default_review_low(),
            medium: default_review_medium(),
            high: default_review_high(),
            critical: default_review_critical(),
        }
    }
}

impl ReviewFrequency {
    pub fn days(&self, level: RiskLevel) -> i64 {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
            RiskLevel::Critical => self.critical,
        }
    }
}

impl Default for RequiredDocuments {
    fn default() -> Self {
        Self {
            individual: default_individual_documents(),
            corporate: default_corporate_documents(),
        }
    }
}

impl RequiredDocuments {
    pub fn for_type(&self, customer_type: CustomerType) -> &[DocumentType] {
        match customer_type {
            CustomerType::Individual => &self.individual,
            CustomerType::Corporate => &self.corporate,
        }
    }
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            screening_timeout_ms: default_screening_timeout_ms(),
            document_expiry_window_days: default_document_expiry_window_days(),
            review_frequency: ReviewFrequency::default(),
            required_documents: RequiredDocuments::default(),
        }
    }
}

impl ComplianceConfig {
    /// Load and validate configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> ComplianceResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ComplianceResult<()> {
        if self.screening_timeout_ms == 0 {
            return Err(ComplianceError::Configuration(
                "screening_timeout_ms must be positive".to_string(),
            ));
        }
        if self.document_expiry_window_days <= 0 {
            return Err(ComplianceError::Configuration(
                "document_expiry_window_days must be positive".to_string(),
            ));
        }
        for level in [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High, RiskLevel::Critical] {
            if self.review_frequency.days(level) <= 0 {
                return Err(ComplianceError::Configuration(format!(
                    "review_frequency.{} must be positive",
                    level
                )));
            }
        }
        if self.required_documents.individual.is_empty()
            || self.required_documents.corporate.is_empty()
        {
            return Err(ComplianceError::Configuration(
                "required_documents must list at least one document per customer type".to_string(),
            ));
        }
        Ok(())
    }

    /// Get screening timeout as Duration
    pub fn screening_timeout(&self) -> Duration {
        Duration::from_millis(self.screening_timeout_ms)
    }

    /// Interval until the next periodic review
    pub fn review_interval(&self, level: RiskLevel) -> chrono::Duration {
        chrono::Duration::days(self.review_frequency.days(level))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = ComplianceConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.screening_timeout(), Duration::from_secs(5));
        assert_eq!(config.review_interval(RiskLevel::Low), chrono::Duration::days(365));
        assert_eq!(config.review_interval(RiskLevel::Critical), chrono::Duration::days(30));
        assert_eq!(
            config.required_documents.for_type(CustomerType::Corporate).len(),
            3
        );
    }

    #[test]
    fn test_partial_json() {
        let config: ComplianceConfig = serde_json::from_str(
            r#"{ "review_frequency": { "high": 60 }, "required_documents": { "individual": ["national_id"] } }"#,
        )
        .unwrap();
        assert_eq!(config.review_frequency.high, 60);
        assert_eq!(config.review_frequency.low, 365);
        assert_eq!(config.required_documents.individual, vec![DocumentType::NationalId]);
        assert_eq!(config.required_documents.corporate.len(), 3);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "screening_timeout_ms": 0 }}"#).unwrap();
        assert!(matches!(
            ComplianceConfig::from_file(file.path()),
            Err(ComplianceError::Configuration(_))
        ));
    }
}
