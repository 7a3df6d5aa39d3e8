//! KycFlow Risk - customer risk scoring
//!
//! ```text
//! Customer ──► CalculatorSet ──► [country, customer, product, transaction] scores
//!                                        │
//!                                        ▼  Σ score × weight (RiskWeights)
//!                                  overall score ──► tier (RiskThresholds)
//!                                        │
//!                                        ▼
//!                              AssessmentOutcome { assessment, kyc_type }
//! ```
//!
//! Scoring is pure: no storage, no clock. Applying an outcome to a
//! [`kycflow_core::CustomerRecord`] is a separate step that yields the audit entry.

pub mod calculators;
pub mod config;
pub mod engine;
pub mod error;
pub mod external;

pub use calculators::{
    CalculatorSet, CountryRiskCalculator, CustomerRiskCalculator, FactorScore,
    FixedScoreCalculator, HighRiskList, RiskFactorCalculator,
};
pub use config::{CountryScores, CustomerScores, RiskConfig, RiskThresholds, RiskWeights};
pub use engine::{AssessmentOutcome, Escalation, RiskScoringEngine};
pub use error::{RiskError, RiskResult};
pub use external::ExternalAssessment;
