//! Combined engine configuration
//!
//! ```json
//! {
//!   "risk": { "weights": { "country": "0.25", ... }, "high_risk_countries": [...] },
//!   "compliance": { "screening_timeout_ms": 5000, "review_frequency": { ... } }
//! }
//! ```
//!
//! Every field is optional; omitted sections fall back to their defaults.

use std::path::Path;

use kycflow_compliance::ComplianceConfig;
use kycflow_risk::RiskConfig;
use serde::{Deserialize, Serialize};

use crate::error::{KycError, KycResult};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KycConfig {
    #[serde(default)]
    pub risk: RiskConfig,

    #[serde(default)]
    pub compliance: ComplianceConfig,
}

impl KycConfig {
    /// Load and validate a JSON config file
    pub fn from_file(path: &Path) -> KycResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            KycError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            KycError::Configuration(format!("invalid config {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> KycResult<()> {
        self.risk.validate()?;
        self.compliance.validate()?;
        Ok(())
    }
}
