use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::LoanCategory;

/// annual rate per loan category, with a default for unlisted categories
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    rates: BTreeMap<String, Rate>,
    default_rate: Rate,
}

/// result of looking up a category rate
#[derive(Debug, Clone, PartialEq)]
pub enum RateLookup {
    /// category has its own rate
    Listed(Rate),
    /// category not in the table, default rate applied
    Fallback { category: String, rate: Rate },
}

impl RateLookup {
    pub fn rate(&self) -> Rate {
        match self {
            RateLookup::Listed(rate) => *rate,
            RateLookup::Fallback { rate, .. } => *rate,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, RateLookup::Fallback { .. })
    }

    /// the fallback as a reportable error, `None` for listed categories
    pub fn fallback_error(&self) -> Option<LoanError> {
        match self {
            RateLookup::Listed(_) => None,
            RateLookup::Fallback { category, rate } => Some(LoanError::UnknownRateCategory {
                category: category.clone(),
                fallback: *rate,
            }),
        }
    }
}

impl RateTable {
    pub fn new(default_rate: Rate) -> Self {
        Self {
            rates: BTreeMap::new(),
            default_rate,
        }
    }

    /// instant 18%, salary 15%, consumer 16%, business 20%, default 18%
    pub fn standard() -> Self {
        Self::new(Rate::from_percentage(18))
            .with_rate(LoanCategory::Instant.code(), Rate::from_percentage(18))
            .with_rate(LoanCategory::Salary.code(), Rate::from_percentage(15))
            .with_rate(LoanCategory::Consumer.code(), Rate::from_percentage(16))
            .with_rate(LoanCategory::Business.code(), Rate::from_percentage(20))
    }

    pub fn with_rate(mut self, category: &str, rate: Rate) -> Self {
        self.rates.insert(normalize_code(category), rate);
        self
    }

    pub fn default_rate(&self) -> Rate {
        self.default_rate
    }

    pub fn categories(&self) -> impl Iterator<Item = (&str, Rate)> {
        self.rates.iter().map(|(code, rate)| (code.as_str(), *rate))
    }

    /// look up the annual rate for a category code
    pub fn lookup(&self, category: &str) -> RateLookup {
        match self.rates.get(&normalize_code(category)) {
            Some(rate) => RateLookup::Listed(*rate),
            None => {
                log::warn!(
                    "no rate configured for category {:?}, applying default {}",
                    category,
                    self.default_rate
                );
                RateLookup::Fallback {
                    category: category.to_string(),
                    rate: self.default_rate,
                }
            }
        }
    }

    fn lookup_listed(&self, category: &str) -> Option<Rate> {
        self.rates.get(&normalize_code(category)).copied()
    }

    pub fn rate_for(&self, category: LoanCategory) -> Rate {
        self.lookup(category.code()).rate()
    }

    /// rekey by normalized category code, rejecting codes that collide
    fn normalized(self) -> Result<Self> {
        Ok(Self {
            rates: normalize_keys(self.rates, "rate")?,
            default_rate: self.default_rate,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(code) = self.rates.keys().find(|code| **code != normalize_code(code)) {
            return Err(LoanError::InvalidConfiguration {
                message: format!("rate category {code:?} must be trimmed lowercase"),
            });
        }
        if self.rates.is_empty() {
            return Err(LoanError::InvalidConfiguration {
                message: "rate table has no categories".to_string(),
            });
        }
        let non_positive = self
            .rates
            .iter()
            .find(|(_, rate)| rate.as_decimal() <= Decimal::ZERO);
        if let Some((code, rate)) = non_positive {
            return Err(LoanError::InvalidConfiguration {
                message: format!("rate for {code} must be positive, got {rate}"),
            });
        }
        if self.default_rate.as_decimal() <= Decimal::ZERO {
            return Err(LoanError::InvalidConfiguration {
                message: format!("default rate must be positive, got {}", self.default_rate),
            });
        }
        Ok(())
    }
}

fn normalize_code(category: &str) -> String {
    category.trim().to_ascii_lowercase()
}

fn normalize_keys<T>(map: BTreeMap<String, T>, what: &str) -> Result<BTreeMap<String, T>> {
    let mut normalized = BTreeMap::new();
    for (code, value) in map {
        let key = normalize_code(&code);
        if normalized.insert(key.clone(), value).is_some() {
            return Err(LoanError::InvalidConfiguration {
                message: format!("{what} category {code:?} duplicates {key:?}"),
            });
        }
    }
    Ok(normalized)
}

/// amount and tenure bounds for a loan product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductConfig {
    pub min_amount: Money,
    pub max_amount: Money,
    pub min_tenure: u32,
    pub max_tenure: u32,
}

impl ProductConfig {
    pub fn new(min_amount: i64, max_amount: i64, min_tenure: u32, max_tenure: u32) -> Self {
        Self {
            min_amount: Money::from_major(min_amount),
            max_amount: Money::from_major(max_amount),
            min_tenure,
            max_tenure,
        }
    }

    pub fn amount_in_range(&self, amount: Money) -> bool {
        amount >= self.min_amount && amount <= self.max_amount
    }

    pub fn tenure_in_range(&self, months: u32) -> bool {
        months >= self.min_tenure && months <= self.max_tenure
    }
}

/// affordability and applicant rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AffordabilityPolicy {
    pub min_age: u32,
    pub max_age: u32,
    /// EMI may not exceed this share of monthly income at application
    pub max_emi_to_income: Rate,
    /// reviewers see ratios above this as high risk
    pub review_risk_threshold: Rate,
}

impl Default for AffordabilityPolicy {
    fn default() -> Self {
        Self {
            min_age: 21,
            max_age: 60,
            max_emi_to_income: Rate::from_percentage(50),
            review_risk_threshold: Rate::from_percentage(40),
        }
    }
}

/// late fee charged on overdue installments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LateFeePolicy {
    /// fraction of the installment per day late
    pub daily_rate: Rate,
    /// maximum fee as a fraction of the installment
    pub cap_rate: Rate,
}

impl Default for LateFeePolicy {
    fn default() -> Self {
        Self {
            daily_rate: Rate::from_decimal(dec!(0.02)),
            cap_rate: Rate::from_decimal(dec!(0.10)),
        }
    }
}

/// full engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub rates: RateTable,
    pub products: BTreeMap<String, ProductConfig>,
    /// tenures offered by the application wizard
    pub tenure_options: Vec<u32>,
    #[serde(default)]
    pub affordability: AffordabilityPolicy,
    #[serde(default)]
    pub late_fees: LateFeePolicy,
}

impl EngineConfig {
    /// the standard four-product configuration
    pub fn standard() -> Self {
        let mut products = BTreeMap::new();
        products.insert(
            LoanCategory::Instant.code().to_string(),
            ProductConfig::new(5_000, 50_000, 1, 12),
        );
        products.insert(
            LoanCategory::Salary.code().to_string(),
            ProductConfig::new(50_000, 1_000_000, 12, 60),
        );
        products.insert(
            LoanCategory::Consumer.code().to_string(),
            ProductConfig::new(100_000, 2_000_000, 24, 84),
        );
        products.insert(
            LoanCategory::Business.code().to_string(),
            ProductConfig::new(25_000, 500_000, 6, 36),
        );

        Self {
            rates: RateTable::standard(),
            products,
            tenure_options: vec![6, 12, 18, 24, 36, 48, 60],
            affordability: AffordabilityPolicy::default(),
            late_fees: LateFeePolicy::default(),
        }
    }

    /// parse and validate a JSON configuration; category codes are
    /// matched case-insensitively, as lookups are
    pub fn from_json(json: &str) -> Result<Self> {
        let config: EngineConfig = serde_json::from_str(json)?;
        let config = Self {
            rates: config.rates.normalized()?,
            products: normalize_keys(config.products, "product")?,
            ..config
        };
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn product(&self, category: &str) -> Result<&ProductConfig> {
        self.products
            .get(&normalize_code(category))
            .ok_or_else(|| LoanError::UnknownProduct {
                category: category.to_string(),
            })
    }

    /// wizard tenures that fall within a product's bounds
    pub fn tenure_choices(&self, category: &str) -> Result<Vec<u32>> {
        let product = self.product(category)?;
        Ok(self
            .tenure_options
            .iter()
            .copied()
            .filter(|&months| product.tenure_in_range(months))
            .collect())
    }

    pub fn validate(&self) -> Result<()> {
        self.rates.validate()?;

        for (code, product) in &self.products {
            if *code != normalize_code(code) {
                return Err(LoanError::InvalidConfiguration {
                    message: format!("product category {code:?} must be trimmed lowercase"),
                });
            }
            if !product.min_amount.is_positive() || product.min_amount > product.max_amount {
                return Err(LoanError::InvalidConfiguration {
                    message: format!(
                        "product {code}: amount range {}..{} is invalid",
                        product.min_amount, product.max_amount
                    ),
                });
            }
            if product.min_tenure == 0 || product.min_tenure > product.max_tenure {
                return Err(LoanError::InvalidConfiguration {
                    message: format!(
                        "product {code}: tenure range {}..{} is invalid",
                        product.min_tenure, product.max_tenure
                    ),
                });
            }
            if self.rates.lookup_listed(code).is_none() {
                return Err(LoanError::InvalidConfiguration {
                    message: format!("product {code} has no rate"),
                });
            }
        }

        if self.tenure_options.iter().any(|&m| m == 0) {
            return Err(LoanError::InvalidConfiguration {
                message: "tenure options must be at least one month".to_string(),
            });
        }

        let policy = &self.affordability;
        if policy.min_age > policy.max_age {
            return Err(LoanError::InvalidConfiguration {
                message: format!("age range {}..{} is invalid", policy.min_age, policy.max_age),
            });
        }

        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_rates() {
        let table = RateTable::standard();
        assert_eq!(table.rate_for(LoanCategory::Instant), Rate::from_percentage(18));
        assert_eq!(table.rate_for(LoanCategory::Salary), Rate::from_percentage(15));
        assert_eq!(table.rate_for(LoanCategory::Consumer), Rate::from_percentage(16));
        assert_eq!(table.rate_for(LoanCategory::Business), Rate::from_percentage(20));
        assert_eq!(table.categories().count(), 4);
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let table = RateTable::standard();
        assert_eq!(table.lookup(" Business "), RateLookup::Listed(Rate::from_percentage(20)));
    }

    #[test]
    fn test_unknown_category_falls_back_observably() {
        let table = RateTable::standard();
        let lookup = table.lookup("agriculture");

        assert!(lookup.is_fallback());
        assert_eq!(lookup.rate(), Rate::from_percentage(18));
        assert_eq!(
            lookup.fallback_error(),
            Some(LoanError::UnknownRateCategory {
                category: "agriculture".to_string(),
                fallback: Rate::from_percentage(18),
            })
        );
        assert_eq!(table.lookup("salary").fallback_error(), None);
    }

    #[test]
    fn test_standard_config_is_valid() {
        let config = EngineConfig::standard();
        assert!(config.validate().is_ok());

        let instant = config.product("instant").unwrap();
        assert!(instant.amount_in_range(Money::from_major(5_000)));
        assert!(instant.amount_in_range(Money::from_major(50_000)));
        assert!(!instant.amount_in_range(Money::from_major(50_001)));
        assert!(instant.tenure_in_range(12));
        assert!(!instant.tenure_in_range(13));

        assert!(matches!(
            config.product("mortgage"),
            Err(LoanError::UnknownProduct { .. })
        ));
    }

    #[test]
    fn test_json_config_round_trip() {
        let config = EngineConfig::standard();
        let json = config.to_json().unwrap();
        let parsed = EngineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_json_config_defaults_policies() {
        let json = r#"{
            "rates": { "rates": { "microenterprise": "0.22" }, "default_rate": "0.18" },
            "products": {
                "microenterprise": {
                    "min_amount": "10000", "max_amount": "200000",
                    "min_tenure": 3, "max_tenure": 24
                }
            },
            "tenure_options": [3, 6, 12, 24]
        }"#;
        let config = EngineConfig::from_json(json).unwrap();

        assert_eq!(config.affordability, AffordabilityPolicy::default());
        assert_eq!(config.late_fees, LateFeePolicy::default());
        assert_eq!(
            config.rates.lookup("microenterprise").rate(),
            Rate::from_percentage(22)
        );
    }

    #[test]
    fn test_json_category_codes_are_normalized() {
        let json = r#"{
            "rates": { "rates": { " Micro ": "0.22" }, "default_rate": "0.18" },
            "products": {
                "MICRO": {
                    "min_amount": "10000", "max_amount": "200000",
                    "min_tenure": 3, "max_tenure": 24
                }
            },
            "tenure_options": [3, 6, 12, 24, 36]
        }"#;
        let config = EngineConfig::from_json(json).unwrap();

        assert!(config.product("Micro").is_ok());
        assert!(config.product("micro").is_ok());
        assert_eq!(config.rates.lookup("MICRO"), RateLookup::Listed(Rate::from_percentage(22)));
        assert_eq!(config.rates.categories().next(), Some(("micro", Rate::from_percentage(22))));
        assert_eq!(config.tenure_choices("Micro").unwrap(), vec![3, 6, 12, 24]);
    }

    #[test]
    fn test_json_duplicate_codes_after_normalizing_are_rejected() {
        let json = r#"{
            "rates": { "rates": { "micro": "0.22", "Micro": "0.24" }, "default_rate": "0.18" },
            "products": {},
            "tenure_options": [12]
        }"#;
        assert!(matches!(
            EngineConfig::from_json(json),
            Err(LoanError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_hand_built_config_rejects_unnormalized_codes() {
        let mut config = EngineConfig::standard();
        let salary = config.products.remove("salary").unwrap();
        config.products.insert("Salary".to_string(), salary);
        assert!(matches!(
            config.validate(),
            Err(LoanError::InvalidConfiguration { .. })
        ));
    }

    #[test]
    fn test_tenure_choices_follow_product_bounds() {
        let config = EngineConfig::standard();
        assert_eq!(config.tenure_choices("instant").unwrap(), vec![6, 12]);
        assert_eq!(config.tenure_choices("business").unwrap(), vec![6, 12, 18, 24, 36]);
        assert_eq!(config.tenure_choices("consumer").unwrap(), vec![24, 36, 48, 60]);
        assert!(matches!(
            config.tenure_choices("gold"),
            Err(LoanError::UnknownProduct { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_bad_products() {
        let mut config = EngineConfig::standard();
        config
            .products
            .insert("seasonal".to_string(), ProductConfig::new(10_000, 20_000, 1, 6));
        assert!(matches!(
            config.validate(),
            Err(LoanError::InvalidConfiguration { .. })
        ));

        let mut config = EngineConfig::standard();
        config
            .products
            .insert("instant".to_string(), ProductConfig::new(50_000, 5_000, 1, 12));
        assert!(config.validate().is_err());

        let config = EngineConfig {
            rates: RateTable::new(Rate::from_percentage(18)),
            ..EngineConfig::standard()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_positive_rates() {
        let config = EngineConfig {
            rates: RateTable::standard().with_rate("instant", Rate::ZERO),
            ..EngineConfig::standard()
        };
        assert!(config.validate().is_err());
    }
}
