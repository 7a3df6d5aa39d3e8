//! Sanctions / PEP screening provider interface
//!
//! The provider call is the only slow external dependency of the engine. The
//! service invokes it without holding the customer lock and bounds it with
//! the configured timeout.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use kycflow_compliance::ScreeningResult;
use kycflow_core::{Customer, CustomerType};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::KycResult;

/// What the provider is asked to screen
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScreeningRequest {
    pub customer_id: Uuid,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub nationality: Option<String>,
    pub customer_type: CustomerType,
}

impl ScreeningRequest {
    pub fn for_customer(customer: &Customer) -> Self {
        Self {
            customer_id: customer.id,
            name: customer.name.clone(),
            date_of_birth: customer.date_of_birth(),
            nationality: customer.jurisdiction().map(str::to_string),
            customer_type: customer.customer_type,
        }
    }
}

/// External screening service
#[async_trait]
pub trait ScreeningProvider: Send + Sync {
    /// Provider name, recorded on results that do not carry one
    fn name(&self) -> &str;

    async fn screen(&self, request: &ScreeningRequest) -> KycResult<ScreeningResult>;
}

/// Provider with fixed answers keyed by customer name
///
/// Names without an entry screen clear. An optional latency makes it usable
/// for timeout tests.
pub struct StaticScreeningProvider {
    results: RwLock<HashMap<String, ScreeningResult>>,
    latency: Duration,
}

impl StaticScreeningProvider {
    pub fn new() -> Self {
        Self {
            results: RwLock::new(HashMap::new()),
            latency: Duration::ZERO,
        }
    }

    /// Delay every answer by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Fix the answer for a name (case-insensitive)
    pub fn set_result(&self, name: &str, result: ScreeningResult) {
        let mut results = self.results.write().unwrap_or_else(PoisonError::into_inner);
        results.insert(name.trim().to_lowercase(), result);
    }
}

impl Default for StaticScreeningProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ScreeningProvider for StaticScreeningProvider {
    fn name(&self) -> &str {
        "static"
    }

    async fn screen(&self, request: &ScreeningRequest) -> KycResult<ScreeningResult> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        let results = self.results.read().unwrap_or_else(PoisonError::into_inner);
        let mut result = results
            .get(&request.name.trim().to_lowercase())
            .cloned()
            .unwrap_or_else(ScreeningResult::clear);
        if result.provider.is_none() {
            result.provider = Some(self.name().to_string());
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(name: &str) -> ScreeningRequest {
        ScreeningRequest {
            customer_id: Uuid::new_v4(),
            name: name.to_string(),
            date_of_birth: None,
            nationality: Some("Germany".to_string()),
            customer_type: CustomerType::Individual,
        }
    }

    #[tokio::test]
    async fn test_static_provider_defaults_to_clear() {
        let provider = StaticScreeningProvider::new();
        let result = provider.screen(&request("Jane Doe")).await.unwrap();
        assert!(!result.any_hit());
        assert_eq!(result.provider.as_deref(), Some("static"));
    }

    #[tokio::test]
    async fn test_static_provider_fixed_hit() {
        let provider = StaticScreeningProvider::new();
        let mut hit = ScreeningResult::clear();
        hit.sanctions_hit = true;
        provider.set_result("Ivan Sanctioned", hit);

        let result = provider.screen(&request("  ivan sanctioned ")).await.unwrap();
        assert!(result.sanctions_hit);
        assert!(!result.pep_hit);
    }
}
