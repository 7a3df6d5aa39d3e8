//! Assessments supplied by an external risk system

use kycflow_core::{AssessmentMethod, RiskAssessment, RiskFactors, RiskLevel};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::engine::RiskScoringEngine;
use crate::error::{RiskError, RiskResult};

/// External risk payload
///
/// Missing component scores default to 0. When `risk_level` is absent it is
/// derived from `overall_risk` using the configured thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExternalAssessment {
    pub provider: String,
    #[serde(default)]
    pub country_risk: Decimal,
    #[serde(default)]
    pub customer_risk: Decimal,
    #[serde(default)]
    pub product_risk: Decimal,
    #[serde(default)]
    pub transaction_risk: Decimal,
    pub overall_risk: Decimal,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub risk_factors: Option<serde_json::Value>,
}

impl ExternalAssessment {
    pub fn validate(&self) -> RiskResult<()> {
        if self.provider.trim().is_empty() {
            return Err(RiskError::Validation(
                "external assessment provider must be named".to_string(),
            ));
        }
        for (field, value) in [
            ("country_risk", self.country_risk),
            ("customer_risk", self.customer_risk),
            ("product_risk", self.product_risk),
            ("transaction_risk", self.transaction_risk),
            ("overall_risk", self.overall_risk),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE_HUNDRED {
                return Err(RiskError::InvalidScore {
                    field: field.to_string(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Convert into a stored assessment (`assessment_method = external_api`)
    pub fn into_assessment(self, engine: &RiskScoringEngine) -> RiskResult<RiskAssessment> {
        self.validate()?;
        let overall = self.overall_risk.round_dp(2);
        let risk_level = self.risk_level.unwrap_or_else(|| engine.tier(overall));

        Ok(RiskAssessment {
            country_risk: self.country_risk,
            customer_risk: self.customer_risk,
            product_risk: self.product_risk,
            transaction_risk: self.transaction_risk,
            overall_risk_score: overall,
            risk_level,
            assessment_method: AssessmentMethod::ExternalApi,
            risk_factors: RiskFactors {
                thresholds: Some(engine.threshold_snapshot()),
                external: Some(serde_json::json!({
                    "provider": self.provider,
                    "payload": self.risk_factors.unwrap_or(serde_json::Value::Null),
                })),
                ..RiskFactors::default()
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RiskConfig;
    use rust_decimal_macros::dec;

    fn payload(overall: Decimal, level: Option<RiskLevel>) -> ExternalAssessment {
        ExternalAssessment {
            provider: "worldcheck".to_string(),
            country_risk: dec!(60),
            customer_risk: dec!(40),
            product_risk: Decimal::ZERO,
            transaction_risk: Decimal::ZERO,
            overall_risk: overall,
            risk_level: level,
            risk_factors: Some(serde_json::json!({ "source": "batch-17" })),
        }
    }

    #[test]
    fn test_external_assessment_derives_level() {
        let engine = RiskScoringEngine::new(RiskConfig::default()).unwrap();
        let a = payload(dec!(62.5), None).into_assessment(&engine).unwrap();
        assert_eq!(a.assessment_method, AssessmentMethod::ExternalApi);
        assert_eq!(a.risk_level, RiskLevel::High);
        assert_eq!(a.risk_factors.external.unwrap()["provider"], "worldcheck");
    }

    #[test]
    fn test_external_assessment_keeps_supplied_level() {
        let engine = RiskScoringEngine::new(RiskConfig::default()).unwrap();
        let a = payload(dec!(10), Some(RiskLevel::Critical))
            .into_assessment(&engine)
            .unwrap();
        assert_eq!(a.risk_level, RiskLevel::Critical);
    }

    #[test]
    fn test_external_assessment_rejects_out_of_range() {
        let engine = RiskScoringEngine::new(RiskConfig::default()).unwrap();
        let err = payload(dec!(140), None).into_assessment(&engine).unwrap_err();
        assert!(matches!(err, RiskError::InvalidScore { .. }));
    }
}
