//! Risk assessment snapshot
//!
//! `risk_factors` follows a versioned schema so report and audit consumers can
//! rely on its shape:
//!
//! ```json
//! {
//!   "schema_version": 1,
//!   "components": [
//!     { "factor": "country", "score": "80", "weight": "0.25",
//!       "weighted": "20.00", "reasons": ["nationality 'Afghanistan' is high-risk"] }
//!   ],
//!   "thresholds": { "medium": "25", "high": "50", "critical": "75" },
//!   "due_diligence": "CDD",
//!   "external": null
//! }
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AssessmentMethod, KycType, RiskFactor, RiskLevel};

/// Current `risk_factors` schema version
pub const RISK_FACTORS_SCHEMA_VERSION: u32 = 1;

/// One weighted component of the overall score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentScore {
    pub factor: RiskFactor,
    pub score: Decimal,
    pub weight: Decimal,
    /// `score * weight`, 2 dp
    pub weighted: Decimal,
    #[serde(default)]
    pub reasons: Vec<String>,
}

/// Tier thresholds in force when the assessment was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThresholdSnapshot {
    pub medium: Decimal,
    pub high: Decimal,
    pub critical: Decimal,
}

/// Structured breakdown behind an assessment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskFactors {
    pub schema_version: u32,
    #[serde(default)]
    pub components: Vec<ComponentScore>,
    #[serde(default)]
    pub thresholds: Option<ThresholdSnapshot>,
    #[serde(default)]
    pub due_diligence: Option<KycType>,
    /// Opaque payload supplied by an external assessor
    #[serde(default)]
    pub external: Option<serde_json::Value>,
}

impl Default for RiskFactors {
    fn default() -> Self {
        Self {
            schema_version: RISK_FACTORS_SCHEMA_VERSION,
            components: Vec::new(),
            thresholds: None,
            due_diligence: None,
            external: None,
        }
    }
}

impl RiskFactors {
    pub fn component(&self, factor: RiskFactor) -> Option<&ComponentScore> {
        self.components.iter().find(|c| c.factor == factor)
    }
}

/// Risk assessment for a customer, overwritten in place on every run
///
/// Carries no timestamp: identical inputs produce an identical value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub country_risk: Decimal,
    pub customer_risk: Decimal,
    pub product_risk: Decimal,
    pub transaction_risk: Decimal,
    pub overall_risk_score: Decimal,
    pub risk_level: RiskLevel,
    pub assessment_method: AssessmentMethod,
    pub risk_factors: RiskFactors,
}

impl RiskAssessment {
    /// Placeholder created at intake, before any scoring has run
    pub fn initial() -> Self {
        Self {
            country_risk: Decimal::ZERO,
            customer_risk: Decimal::ZERO,
            product_risk: Decimal::ZERO,
            transaction_risk: Decimal::ZERO,
            overall_risk_score: Decimal::ZERO,
            risk_level: RiskLevel::Medium,
            assessment_method: AssessmentMethod::Automated,
            risk_factors: RiskFactors::default(),
        }
    }

    pub fn score_for(&self, factor: RiskFactor) -> Decimal {
        match factor {
            RiskFactor::Country => self.country_risk,
            RiskFactor::Customer => self.customer_risk,
            RiskFactor::Product => self.product_risk,
            RiskFactor::Transaction => self.transaction_risk,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_initial_assessment() {
        let a = RiskAssessment::initial();
        assert_eq!(a.overall_risk_score, Decimal::ZERO);
        assert_eq!(a.risk_level, RiskLevel::Medium);
        assert_eq!(a.risk_factors.schema_version, RISK_FACTORS_SCHEMA_VERSION);
    }

    #[test]
    fn test_risk_factors_json_shape() {
        let factors = RiskFactors {
            components: vec![ComponentScore {
                factor: RiskFactor::Country,
                score: dec!(80),
                weight: dec!(0.25),
                weighted: dec!(20.00),
                reasons: vec!["high-risk".to_string()],
            }],
            due_diligence: Some(KycType::Cdd),
            ..RiskFactors::default()
        };

        let value = serde_json::to_value(&factors).unwrap();
        assert_eq!(value["schema_version"], 1);
        assert_eq!(value["components"][0]["factor"], "country");
        assert_eq!(value["due_diligence"], "CDD");

        let back: RiskFactors = serde_json::from_value(value).unwrap();
        assert_eq!(back.component(RiskFactor::Country).unwrap().score, dec!(80));
    }
}
