//! Risk scoring engine

use chrono::{DateTime, Utc};
use kycflow_core::{
    Actor, AlertType, AssessmentMethod, AuditAction, AuditEntry, ComponentScore, Customer,
    CustomerRecord, KycType, RiskAssessment, RiskFactor, RiskFactors, RiskLevel, Severity,
    ThresholdSnapshot, RISK_FACTORS_SCHEMA_VERSION,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::json;
use tracing::debug;

use crate::calculators::CalculatorSet;
use crate::config::{RiskConfig, RiskThresholds};
use crate::error::RiskResult;

const FACTORS: [RiskFactor; 4] = [
    RiskFactor::Country,
    RiskFactor::Customer,
    RiskFactor::Product,
    RiskFactor::Transaction,
];

/// Country scores above this make an escalation a `high_risk_country` alert
const COUNTRY_ESCALATION_SCORE: Decimal = dec!(50);

/// Result of scoring one customer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssessmentOutcome {
    pub assessment: RiskAssessment,
    pub kyc_type: KycType,
}

/// Alert request produced by an elevated assessment
#[derive(Debug, Clone, PartialEq)]
pub struct Escalation {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub title: String,
    pub description: String,
    pub evidence: serde_json::Value,
}

impl AssessmentOutcome {
    pub fn risk_level(&self) -> RiskLevel {
        self.assessment.risk_level
    }

    /// Overwrite the record's assessment and mirror the result onto the customer
    ///
    /// Returns the `risk_assess` audit entry (unsealed).
    pub fn apply(&self, record: &mut CustomerRecord, actor: &Actor, now: DateTime<Utc>) -> AuditEntry {
        let previous_level = record.customer.risk_level;
        let previous_score = record.customer.aml_risk_score;

        record.risk_assessment = self.assessment.clone();
        record.risk_assessed_at = Some(now);
        record.customer.risk_level = self.assessment.risk_level;
        record.customer.aml_risk_score = self.assessment.overall_risk_score;
        record.customer.kyc_type = self.kyc_type;
        record.workflow.risk_assessed = true;
        record.touch(now);

        AuditEntry::new(
            record.id(),
            AuditAction::RiskAssess,
            format!(
                "Risk assessment ({}): score {} -> {}, level {}",
                self.assessment.assessment_method,
                previous_score,
                self.assessment.overall_risk_score,
                self.assessment.risk_level
            ),
            actor,
            now,
        )
        .with_change("risk_level", previous_level, self.assessment.risk_level)
        .with_data(json!({
            "overall_risk_score": self.assessment.overall_risk_score,
            "kyc_type": self.kyc_type,
            "risk_factors": self.assessment.risk_factors,
        }))
    }

    /// Alert to raise when the tier is high or critical
    pub fn escalation(&self, customer: &Customer) -> Option<Escalation> {
        let level = self.assessment.risk_level;
        let severity = match level {
            RiskLevel::Critical => Severity::Critical,
            RiskLevel::High => Severity::High,
            _ => return None,
        };

        let alert_type = if self.assessment.country_risk > COUNTRY_ESCALATION_SCORE {
            AlertType::HighRiskCountry
        } else {
            AlertType::UnusualActivity
        };

        Some(Escalation {
            alert_type,
            severity,
            title: format!("{} risk customer: {}", capitalize(&level.to_string()), customer.name),
            description: format!(
                "Customer {} assessed as {} risk with score {}",
                customer.customer_reference, level, self.assessment.overall_risk_score
            ),
            evidence: json!({
                "overall_risk_score": self.assessment.overall_risk_score,
                "risk_level": level,
                "breakdown": {
                    "country_risk": self.assessment.country_risk,
                    "customer_risk": self.assessment.customer_risk,
                    "product_risk": self.assessment.product_risk,
                    "transaction_risk": self.assessment.transaction_risk,
                },
                "risk_factors": self.assessment.risk_factors,
            }),
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Scores customers against a validated configuration
pub struct RiskScoringEngine {
    config: RiskConfig,
    calculators: CalculatorSet,
}

impl RiskScoringEngine {
    /// Engine with the standard calculators
    pub fn new(config: RiskConfig) -> RiskResult<Self> {
        let calculators = CalculatorSet::from_config(&config);
        Self::with_calculators(config, calculators)
    }

    pub fn with_calculators(config: RiskConfig, calculators: CalculatorSet) -> RiskResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            calculators,
        })
    }

    pub fn config(&self) -> &RiskConfig {
        &self.config
    }

    /// Score a customer
    ///
    /// Deterministic: identical customer data and configuration produce an
    /// identical outcome.
    pub fn assess(&self, customer: &Customer) -> RiskResult<AssessmentOutcome> {
        let weights = &self.config.weights;
        let mut components = Vec::with_capacity(FACTORS.len());
        let mut overall = Decimal::ZERO;

        for factor in FACTORS {
            let result = self.calculators.get(factor).calculate(customer);
            let weight = match factor {
                RiskFactor::Country => weights.country,
                RiskFactor::Customer => weights.customer,
                RiskFactor::Product => weights.product,
                RiskFactor::Transaction => weights.transaction,
            };
            let weighted = result.score * weight;
            overall += weighted;
            components.push(ComponentScore {
                factor,
                score: result.score,
                weight,
                weighted: weighted.round_dp(2),
                reasons: result.reasons,
            });
        }

        let overall = overall
            .clamp(Decimal::ZERO, Decimal::ONE_HUNDRED)
            .round_dp(2);
        let risk_level = self.tier(overall);
        let kyc_type = Self::due_diligence(risk_level, customer);

        let score_of = |factor: RiskFactor| {
            components
                .iter()
                .find(|c| c.factor == factor)
                .map(|c| c.score)
                .unwrap_or(Decimal::ZERO)
        };
        let assessment = RiskAssessment {
            country_risk: score_of(RiskFactor::Country),
            customer_risk: score_of(RiskFactor::Customer),
            product_risk: score_of(RiskFactor::Product),
            transaction_risk: score_of(RiskFactor::Transaction),
            overall_risk_score: overall,
            risk_level,
            assessment_method: AssessmentMethod::Automated,
            risk_factors: RiskFactors {
                schema_version: RISK_FACTORS_SCHEMA_VERSION,
                components,
                thresholds: Some(self.threshold_snapshot()),
                due_diligence: Some(kyc_type),
                external: None,
            },
        };

        debug!(
            customer_id = %customer.id,
            overall = %overall,
            risk_level = %risk_level,
            kyc_type = %kyc_type,
            "Risk assessment computed"
        );

        Ok(AssessmentOutcome {
            assessment,
            kyc_type,
        })
    }

    /// Map an overall score to its tier; bounds belong to the higher tier
    pub fn tier(&self, score: Decimal) -> RiskLevel {
        tier_for(&self.config.thresholds, score)
    }

    /// ECDD for elevated tiers and for every corporate customer
    pub fn due_diligence(level: RiskLevel, customer: &Customer) -> KycType {
        if level.is_elevated() || customer.is_corporate() {
            KycType::Ecdd
        } else {
            KycType::Cdd
        }
    }

    pub fn threshold_snapshot(&self) -> ThresholdSnapshot {
        let t = &self.config.thresholds;
        ThresholdSnapshot {
            medium: t.medium,
            high: t.high,
            critical: t.critical,
        }
    }
}

pub(crate) fn tier_for(thresholds: &RiskThresholds, score: Decimal) -> RiskLevel {
    if score >= thresholds.critical {
        RiskLevel::Critical
    } else if score >= thresholds.high {
        RiskLevel::High
    } else if score >= thresholds.medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}
