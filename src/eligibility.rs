use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::quote::compute_amortization;
use crate::types::{InputField, RiskBand};

/// what eligibility is judged on
#[derive(Debug, Clone, PartialEq)]
pub struct EligibilityRequest<'a> {
    pub category: &'a str,
    pub amount: Money,
    pub tenure_months: u32,
    pub monthly_income: Money,
    pub date_of_birth: NaiveDate,
}

/// single failed rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum IneligibilityReason {
    UnknownProduct { category: String },
    AgeOutOfRange { age: u32, min: u32, max: u32 },
    AmountOutOfRange { amount: Money, min: Money, max: Money },
    TenureOutOfRange { months: u32, min: u32, max: u32 },
    EmiExceedsIncomeShare { emi: Money, limit: Money },
}

impl std::fmt::Display for IneligibilityReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IneligibilityReason::UnknownProduct { category } => {
                write!(f, "no loan product named {category}")
            }
            IneligibilityReason::AgeOutOfRange { age, min, max } => {
                write!(f, "age {age} outside {min}-{max} years")
            }
            IneligibilityReason::AmountOutOfRange { amount, min, max } => {
                write!(f, "amount {amount} outside {min}-{max}")
            }
            IneligibilityReason::TenureOutOfRange { months, min, max } => {
                write!(f, "tenure {months} months outside {min}-{max}")
            }
            IneligibilityReason::EmiExceedsIncomeShare { emi, limit } => {
                write!(f, "monthly EMI {emi} exceeds {limit} allowed by income")
            }
        }
    }
}

/// outcome of the eligibility rules; empty reasons means eligible
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EligibilityDecision {
    pub reasons: Vec<IneligibilityReason>,
}

impl EligibilityDecision {
    pub fn is_eligible(&self) -> bool {
        self.reasons.is_empty()
    }

    /// convert to an error when any rule failed
    pub fn into_result(self) -> Result<()> {
        if self.is_eligible() {
            Ok(())
        } else {
            Err(LoanError::Ineligible {
                reasons: self.reasons.iter().map(ToString::to_string).collect(),
            })
        }
    }
}

/// completed years between birth and `today`
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> Result<u32> {
    if date_of_birth > today {
        return Err(LoanError::invalid(
            InputField::DateOfBirth,
            format!("{date_of_birth} is in the future"),
        ));
    }
    let mut years = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        years -= 1;
    }
    Ok(years as u32)
}

/// run every eligibility rule and collect the failures
pub fn check_eligibility(
    config: &EngineConfig,
    request: &EligibilityRequest<'_>,
    today: NaiveDate,
) -> Result<EligibilityDecision> {
    if !request.monthly_income.is_positive() {
        return Err(LoanError::invalid(
            InputField::MonthlyIncome,
            format!("must be positive, got {}", request.monthly_income),
        ));
    }

    let mut decision = EligibilityDecision::default();
    let policy = &config.affordability;

    let age = age_on(request.date_of_birth, today)?;
    if age < policy.min_age || age > policy.max_age {
        decision.reasons.push(IneligibilityReason::AgeOutOfRange {
            age,
            min: policy.min_age,
            max: policy.max_age,
        });
    }

    let product = match config.product(request.category) {
        Ok(product) => product,
        Err(_) => {
            decision.reasons.push(IneligibilityReason::UnknownProduct {
                category: request.category.to_string(),
            });
            return Ok(decision);
        }
    };

    if !product.amount_in_range(request.amount) {
        decision.reasons.push(IneligibilityReason::AmountOutOfRange {
            amount: request.amount,
            min: product.min_amount,
            max: product.max_amount,
        });
    }
    if !product.tenure_in_range(request.tenure_months) {
        decision.reasons.push(IneligibilityReason::TenureOutOfRange {
            months: request.tenure_months,
            min: product.min_tenure,
            max: product.max_tenure,
        });
    }

    let rate = config.rates.lookup(request.category).rate();
    let emi = compute_amortization(request.amount, rate, request.tenure_months)?
        .summary()
        .emi;
    let limit = request.monthly_income.apply_rate(policy.max_emi_to_income);
    if emi > limit {
        decision.reasons.push(IneligibilityReason::EmiExceedsIncomeShare { emi, limit });
    }

    Ok(decision)
}

/// EMI as a percentage of monthly income
pub fn emi_to_income_ratio(emi: Money, monthly_income: Money) -> Result<Decimal> {
    if !monthly_income.is_positive() {
        return Err(LoanError::invalid(
            InputField::MonthlyIncome,
            format!("must be positive, got {}", monthly_income),
        ));
    }
    emi.as_decimal()
        .checked_div(monthly_income.as_decimal())
        .and_then(|share| share.checked_mul(Decimal::ONE_HUNDRED))
        .map(|percent| percent.round_dp(1))
        .ok_or_else(|| LoanError::CalculationError {
            message: format!("emi {emi} against income {monthly_income} overflows"),
        })
}

/// band a ratio (in percent) against the review threshold
pub fn risk_band(ratio_percent: Decimal, threshold: Rate) -> RiskBand {
    if ratio_percent <= threshold.as_percentage() {
        RiskBand::Acceptable
    } else {
        RiskBand::High
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn request(category: &str, amount: i64, months: u32, income: i64) -> EligibilityRequest<'_> {
        EligibilityRequest {
            category,
            amount: Money::from_major(amount),
            tenure_months: months,
            monthly_income: Money::from_major(income),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 3, 15).unwrap(),
        }
    }

    #[test]
    fn test_eligible_salary_applicant() {
        let config = EngineConfig::standard();
        let decision = check_eligibility(&config, &request("salary", 150_000, 24, 40_000), today()).unwrap();
        assert!(decision.is_eligible());
        assert!(decision.into_result().is_ok());
    }

    #[test]
    fn test_every_failed_rule_is_reported() {
        let config = EngineConfig::standard();
        let mut req = request("instant", 60_000, 18, 7_000);
        req.date_of_birth = NaiveDate::from_ymd_opt(2006, 1, 1).unwrap();

        let decision = check_eligibility(&config, &req, today()).unwrap();
        assert_eq!(decision.reasons.len(), 4);
        assert!(matches!(decision.reasons[0], IneligibilityReason::AgeOutOfRange { age: 18, .. }));
        assert!(matches!(decision.reasons[1], IneligibilityReason::AmountOutOfRange { .. }));
        assert!(matches!(decision.reasons[2], IneligibilityReason::TenureOutOfRange { months: 18, .. }));
        assert!(matches!(decision.reasons[3], IneligibilityReason::EmiExceedsIncomeShare { .. }));

        match decision.into_result() {
            Err(LoanError::Ineligible { reasons }) => assert_eq!(reasons.len(), 4),
            other => panic!("expected ineligible, got {other:?}"),
        }
    }

    #[test]
    fn test_income_share_limit() {
        let config = EngineConfig::standard();
        // emi 4584 against a 50% limit
        let ok = check_eligibility(&config, &request("instant", 50_000, 12, 9_168), today()).unwrap();
        assert!(ok.is_eligible());

        let tight = check_eligibility(&config, &request("instant", 50_000, 12, 9_000), today()).unwrap();
        assert_eq!(
            tight.reasons,
            vec![IneligibilityReason::EmiExceedsIncomeShare {
                emi: Money::from_major(4_584),
                limit: Money::from_major(4_500),
            }]
        );
    }

    #[test]
    fn test_unknown_product() {
        let config = EngineConfig::standard();
        let decision = check_eligibility(&config, &request("gold", 50_000, 12, 90_000), today()).unwrap();
        assert_eq!(
            decision.reasons,
            vec![IneligibilityReason::UnknownProduct { category: "gold".to_string() }]
        );
    }

    #[test]
    fn test_non_positive_income_is_invalid() {
        let config = EngineConfig::standard();
        assert!(matches!(
            check_eligibility(&config, &request("salary", 150_000, 24, 0), today()),
            Err(LoanError::InvalidInput { field: InputField::MonthlyIncome, .. })
        ));
    }

    #[test]
    fn test_age_boundaries() {
        let today = today();
        assert_eq!(age_on(NaiveDate::from_ymd_opt(2003, 6, 1).unwrap(), today).unwrap(), 21);
        assert_eq!(age_on(NaiveDate::from_ymd_opt(2003, 6, 2).unwrap(), today).unwrap(), 20);
        assert_eq!(age_on(NaiveDate::from_ymd_opt(1963, 6, 1).unwrap(), today).unwrap(), 61);
        assert!(age_on(NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(), today).is_err());
    }

    #[test]
    fn test_ratio_and_band() {
        let ratio = emi_to_income_ratio(Money::from_major(7_273), Money::from_major(25_000)).unwrap();
        assert_eq!(ratio, dec!(29.1));
        assert_eq!(risk_band(ratio, Rate::from_percentage(40)), RiskBand::Acceptable);

        let ratio = emi_to_income_ratio(Money::from_major(4_584), Money::from_major(10_000)).unwrap();
        assert_eq!(ratio, dec!(45.8));
        assert_eq!(risk_band(ratio, Rate::from_percentage(40)), RiskBand::High);

        assert_eq!(risk_band(dec!(40), Rate::from_percentage(40)), RiskBand::Acceptable);
        assert!(emi_to_income_ratio(Money::ONE, Money::ZERO).is_err());

        let huge = Money::from_str_exact("70000000000000000000000000000").unwrap();
        assert!(matches!(
            emi_to_income_ratio(huge, Money::ONE),
            Err(LoanError::CalculationError { .. })
        ));
    }
}
