//! Risk factor calculators
//!
//! Each calculator is a pure `(customer) -> score` function behind the
//! [`RiskFactorCalculator`] trait, so any one of them can be replaced in a
//! [`CalculatorSet`] without touching the others.

use std::collections::HashSet;

use kycflow_core::{Customer, CustomerType, RiskFactor};
use rust_decimal::Decimal;

use crate::config::{CountryScores, CustomerScores, RiskConfig};

/// Score in `[0, 100]` plus the reasons behind it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactorScore {
    pub score: Decimal,
    pub reasons: Vec<String>,
}

impl FactorScore {
    /// Clamps into `[0, 100]`
    pub fn new(score: Decimal, reasons: Vec<String>) -> Self {
        Self {
            score: score.clamp(Decimal::ZERO, Decimal::ONE_HUNDRED),
            reasons,
        }
    }
}

/// A single risk component
pub trait RiskFactorCalculator: Send + Sync {
    /// Which component this calculator produces
    fn factor(&self) -> RiskFactor;

    /// Score the customer
    fn calculate(&self, customer: &Customer) -> FactorScore;
}

/// Case-insensitive membership list
#[derive(Debug, Clone, Default)]
pub struct HighRiskList {
    entries: HashSet<String>,
}

impl HighRiskList {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            entries: entries.into_iter().map(|s| normalize(s.as_ref())).collect(),
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.entries.contains(&normalize(value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Nationality / incorporation country risk
pub struct CountryRiskCalculator {
    countries: HighRiskList,
    scores: CountryScores,
}

impl CountryRiskCalculator {
    pub fn new(countries: HighRiskList, scores: CountryScores) -> Self {
        Self { countries, scores }
    }
}

impl RiskFactorCalculator for CountryRiskCalculator {
    fn factor(&self) -> RiskFactor {
        RiskFactor::Country
    }

    fn calculate(&self, customer: &Customer) -> FactorScore {
        let (country, high, standard, label) = match customer.customer_type {
            CustomerType::Individual => match &customer.individual_details {
                Some(d) => (
                    d.nationality.as_str(),
                    self.scores.individual_high_risk,
                    self.scores.individual_standard,
                    "nationality",
                ),
                None => return unknown_details(self.scores.unknown),
            },
            CustomerType::Corporate => match &customer.corporate_details {
                Some(d) => (
                    d.incorporation_country.as_str(),
                    self.scores.corporate_high_risk,
                    self.scores.corporate_standard,
                    "incorporation country",
                ),
                None => return unknown_details(self.scores.unknown),
            },
        };

        if self.countries.contains(country) {
            FactorScore::new(high, vec![format!("{} '{}' is high-risk", label, country)])
        } else {
            FactorScore::new(standard, vec![format!("{} '{}' is standard-risk", label, country)])
        }
    }
}

fn unknown_details(score: Decimal) -> FactorScore {
    FactorScore::new(score, vec!["customer details not on file".to_string()])
}

/// Business type / ownership / occupation risk
pub struct CustomerRiskCalculator {
    business_types: HighRiskList,
    occupations: HighRiskList,
    scores: CustomerScores,
}

impl CustomerRiskCalculator {
    pub fn new(business_types: HighRiskList, occupations: HighRiskList, scores: CustomerScores) -> Self {
        Self {
            business_types,
            occupations,
            scores,
        }
    }
}

impl RiskFactorCalculator for CustomerRiskCalculator {
    fn factor(&self) -> RiskFactor {
        RiskFactor::Customer
    }

    fn calculate(&self, customer: &Customer) -> FactorScore {
        let mut score = Decimal::ZERO;
        let mut reasons = Vec::new();

        match customer.customer_type {
            CustomerType::Corporate => {
                score += self.scores.corporate_base;
                reasons.push("corporate customer".to_string());

                if let Some(details) = &customer.corporate_details {
                    if self.business_types.contains(&details.business_type) {
                        score += self.scores.high_risk_business;
                        reasons.push(format!(
                            "business type '{}' is high-risk",
                            details.business_type
                        ));
                    }
                    if details.beneficial_owners.is_empty() {
                        score += self.scores.no_beneficial_owners;
                        reasons.push("no registered beneficial owners".to_string());
                    }
                }
            }
            CustomerType::Individual => {
                if let Some(details) = &customer.individual_details {
                    if self.occupations.contains(&details.occupation) {
                        score += self.scores.high_risk_occupation;
                        reasons.push(format!("occupation '{}' is high-risk", details.occupation));
                    }
                }
            }
        }

        FactorScore::new(score, reasons)
    }
}

/// Constant score, used for product and transaction risk
pub struct FixedScoreCalculator {
    factor: RiskFactor,
    score: Decimal,
}

impl FixedScoreCalculator {
    pub fn new(factor: RiskFactor, score: Decimal) -> Self {
        Self { factor, score }
    }
}

impl RiskFactorCalculator for FixedScoreCalculator {
    fn factor(&self) -> RiskFactor {
        self.factor
    }

    fn calculate(&self, _customer: &Customer) -> FactorScore {
        FactorScore::new(self.score, vec![format!("configured default {} risk", self.factor)])
    }
}

/// The four calculators used by the engine
pub struct CalculatorSet {
    country: Box<dyn RiskFactorCalculator>,
    customer: Box<dyn RiskFactorCalculator>,
    product: Box<dyn RiskFactorCalculator>,
    transaction: Box<dyn RiskFactorCalculator>,
}

impl CalculatorSet {
    /// Standard calculators built from configuration
    pub fn from_config(config: &RiskConfig) -> Self {
        Self {
            country: Box::new(CountryRiskCalculator::new(
                HighRiskList::new(&config.high_risk_countries),
                config.country_scores,
            )),
            customer: Box::new(CustomerRiskCalculator::new(
                HighRiskList::new(&config.high_risk_business_types),
                HighRiskList::new(&config.high_risk_occupations),
                config.customer_scores,
            )),
            product: Box::new(FixedScoreCalculator::new(
                RiskFactor::Product,
                config.product_risk_default,
            )),
            transaction: Box::new(FixedScoreCalculator::new(
                RiskFactor::Transaction,
                config.transaction_risk_default,
            )),
        }
    }

    /// Replace the calculator for `calculator.factor()`
    pub fn with(mut self, calculator: Box<dyn RiskFactorCalculator>) -> Self {
        match calculator.factor() {
            RiskFactor::Country => self.country = calculator,
            RiskFactor::Customer => self.customer = calculator,
            RiskFactor::Product => self.product = calculator,
            RiskFactor::Transaction => self.transaction = calculator,
        }
        self
    }

    pub fn get(&self, factor: RiskFactor) -> &dyn RiskFactorCalculator {
        match factor {
            RiskFactor::Country => self.country.as_ref(),
            RiskFactor::Customer => self.customer.as_ref(),
            RiskFactor::Product => self.product.as_ref(),
            RiskFactor::Transaction => self.transaction.as_ref(),
        }
    }
}
