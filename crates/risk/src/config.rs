//! Risk scoring configuration
//!
//! Weights, tier thresholds, high-risk lists and calculator scores are all
//! configuration. The engine receives a validated `RiskConfig` at construction
//! and never looks anything up at scoring time.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{RiskError, RiskResult};

/// Allowed drift of Σ weights from 1.0
const WEIGHT_SUM_TOLERANCE: Decimal = dec!(0.0001);

/// Configuration for the risk scoring engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskConfig {
    // === Combination ===
    #[serde(default)]
    pub weights: RiskWeights,

    #[serde(default)]
    pub thresholds: RiskThresholds,

    // === Lists (matched case-insensitively) ===
    #[serde(default = "default_high_risk_countries")]
    pub high_risk_countries: Vec<String>,

    #[serde(default = "default_high_risk_business_types")]
    pub high_risk_business_types: Vec<String>,

    #[serde(default = "default_high_risk_occupations")]
    pub high_risk_occupations: Vec<String>,

    // === Calculator scores ===
    #[serde(default)]
    pub country_scores: CountryScores,

    #[serde(default)]
    pub customer_scores: CustomerScores,

    /// Product risk until product-specific scoring exists
    #[serde(default = "default_product_risk")]
    pub product_risk_default: Decimal,

    /// Transaction risk until transaction monitoring feeds scoring
    #[serde(default = "default_transaction_risk")]
    pub transaction_risk_default: Decimal,
}

/// Weight of each component in the overall score; must sum to 1
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskWeights {
    #[serde(default = "default_country_weight")]
    pub country: Decimal,
    #[serde(default = "default_customer_weight")]
    pub customer: Decimal,
    #[serde(default = "default_product_weight")]
    pub product: Decimal,
    #[serde(default = "default_transaction_weight")]
    pub transaction: Decimal,
}

/// Lower bounds of each tier; a score equal to a bound belongs to the higher tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskThresholds {
    #[serde(default = "default_medium_threshold")]
    pub medium: Decimal,
    #[serde(default = "default_high_threshold")]
    pub high: Decimal,
    #[serde(default = "default_critical_threshold")]
    pub critical: Decimal,
}

/// Scores produced by the country calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountryScores {
    #[serde(default = "default_individual_high_risk")]
    pub individual_high_risk: Decimal,
    #[serde(default = "default_individual_standard")]
    pub individual_standard: Decimal,
    #[serde(default = "default_corporate_high_risk")]
    pub corporate_high_risk: Decimal,
    #[serde(default = "default_corporate_standard")]
    pub corporate_standard: Decimal,
    /// Customer details missing
    #[serde(default = "default_unknown_country")]
    pub unknown: Decimal,
}

/// Increments used by the customer calculator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerScores {
    #[serde(default = "default_corporate_base")]
    pub corporate_base: Decimal,
    #[serde(default = "default_high_risk_business")]
    pub high_risk_business: Decimal,
    #[serde(default = "default_no_beneficial_owners")]
    pub no_beneficial_owners: Decimal,
    #[serde(default = "default_high_risk_occupation")]
    pub high_risk_occupation: Decimal,
}

// Default value functions for serde
fn default_country_weight() -> Decimal {
    dec!(0.25)
}

fn default_customer_weight() -> Decimal {
    dec!(0.30)
}

fn default_product_weight() -> Decimal {
    dec!(0.20)
}

fn default_transaction_weight() -> Decimal {
    dec!(0.25)
}

fn default_medium_threshold() -> Decimal {
    dec!(25)
}

fn default_high_threshold() -> Decimal {
    dec!(50)
}

fn default_critical_threshold() -> Decimal {
    dec!(75)
}

fn default_individual_high_risk() -> Decimal {
    dec!(80)
}

fn default_individual_standard() -> Decimal {
    dec!(20)
}

fn default_corporate_high_risk() -> Decimal {
    dec!(85)
}

fn default_corporate_standard() -> Decimal {
    dec!(25)
}

fn default_unknown_country() -> Decimal {
    dec!(30)
}

fn default_corporate_base() -> Decimal {
    dec!(30)
}

fn default_high_risk_business() -> Decimal {
    dec!(40)
}

fn default_no_beneficial_owners() -> Decimal {
    dec!(20)
}

fn default_high_risk_occupation() -> Decimal {
    dec!(50)
}

fn default_product_risk() -> Decimal {
    dec!(20)
}

fn default_transaction_risk() -> Decimal {
    dec!(25)
}

fn default_high_risk_countries() -> Vec<String> {
    to_strings(&["Afghanistan", "Iran", "North Korea", "Syria", "Yemen"])
}

fn default_high_risk_business_types() -> Vec<String> {
    to_strings(&[
        "money_services",
        "cryptocurrency",
        "gaming",
        "precious_metals",
        "art_dealers",
        "cash_intensive",
        "shell_company",
    ])
}

fn default_high_risk_occupations() -> Vec<String> {
    to_strings(&[
        "politician",
        "government_official",
        "military_officer",
        "casino_owner",
        "arms_dealer",
        "precious_metals_dealer",
    ])
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for RiskWeights {
    fn default() -> Self {
        Self {
            country: default_country_weight(),
            customer: default_customer_weight(),
            product: default_product_weight(),
            transaction: default_transaction_weight(),
        }
    }
}

impl RiskWeights {
    pub fn sum(&self) -> Decimal {
        self.country + self.customer + self.product + self.transaction
    }

    pub fn validate(&self) -> RiskResult<()> {
        for (name, weight) in [
            ("country", self.country),
            ("customer", self.customer),
            ("product", self.product),
            ("transaction", self.transaction),
        ] {
            if weight < Decimal::ZERO || weight > Decimal::ONE {
                return Err(RiskError::Configuration(format!(
                    "weight '{}' must be within 0..=1, got {}",
                    name, weight
                )));
            }
        }

        let sum = self.sum();
        if (sum - Decimal::ONE).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(RiskError::Configuration(format!(
                "weights must sum to 1.0, got {}",
                sum
            )));
        }
        Ok(())
    }
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            medium: default_medium_threshold(),
            high: default_high_threshold(),
            critical: default_critical_threshold(),
        }
    }
}

impl RiskThresholds {
    pub fn validate(&self) -> RiskResult<()> {
        if self.medium <= Decimal::ZERO || self.critical > Decimal::ONE_HUNDRED {
            return Err(RiskError::Configuration(format!(
                "thresholds must lie within (0, 100], got {}/{}/{}",
                self.medium, self.high, self.critical
            )));
        }
        if !(self.medium < self.high && self.high < self.critical) {
            return Err(RiskError::Configuration(format!(
                "thresholds must be strictly ascending (medium < high < critical), got {}/{}/{}",
                self.medium, self.high, self.critical
            )));
        }
        Ok(())
    }
}

impl Default for CountryScores {
    fn default() -> Self {
        Self {
            individual_high_risk: default_individual_high_risk(),
            individual_standard: default_individual_standard(),
            corporate_high_risk: default_corporate_high_risk(),
            corporate_standard: default_corporate_standard(),
            unknown: default_unknown_country(),
        }
    }
}

impl Default for CustomerScores {
    fn default() -> Self {
        Self {
            corporate_base: default_corporate_base(),
            high_risk_business: default_high_risk_business(),
            no_beneficial_owners: default_no_beneficial_owners(),
            high_risk_occupation: default_high_risk_occupation(),
        }
    }
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            weights: RiskWeights::default(),
            thresholds: RiskThresholds::default(),
            high_risk_countries: default_high_risk_countries(),
            high_risk_business_types: default_high_risk_business_types(),
            high_risk_occupations: default_high_risk_occupations(),
            country_scores: CountryScores::default(),
            customer_scores: CustomerScores::default(),
            product_risk_default: default_product_risk(),
            transaction_risk_default: default_transaction_risk(),
        }
    }
}

impl RiskConfig {
    /// Load and validate configuration from a JSON file
    pub fn from_file(path: &std::path::Path) -> RiskResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RiskResult<()> {
        self.weights.validate()?;
        self.thresholds.validate()?;

        let CountryScores {
            individual_high_risk,
            individual_standard,
            corporate_high_risk,
            corporate_standard,
            unknown,
        } = self.country_scores;
        let CustomerScores {
            corporate_base,
            high_risk_business,
            no_beneficial_owners,
            high_risk_occupation,
        } = self.customer_scores;

        for (name, value) in [
            ("country_scores.individual_high_risk", individual_high_risk),
            ("country_scores.individual_standard", individual_standard),
            ("country_scores.corporate_high_risk", corporate_high_risk),
            ("country_scores.corporate_standard", corporate_standard),
            ("country_scores.unknown", unknown),
            ("customer_scores.corporate_base", corporate_base),
            ("customer_scores.high_risk_business", high_risk_business),
            ("customer_scores.no_beneficial_owners", no_beneficial_owners),
            ("customer_scores.high_risk_occupation", high_risk_occupation),
            ("product_risk_default", self.product_risk_default),
            ("transaction_risk_default", self.transaction_risk_default),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(RiskError::Configuration(format!(
                    "{} must be within 0..=100, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}
