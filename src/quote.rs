use std::str::FromStr;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{RateLookup, RateTable};
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::InputField;

/// validated inputs to the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteInput {
    pub principal: Money,
    pub annual_rate: Rate,
    pub months: u32,
}

impl QuoteInput {
    pub fn new(principal: Money, annual_rate: Rate, months: u32) -> Result<Self> {
        if !principal.is_positive() {
            return Err(LoanError::invalid(
                InputField::Principal,
                format!("must be positive, got {principal}"),
            ));
        }
        if annual_rate.as_decimal() <= Decimal::ZERO {
            return Err(LoanError::invalid(
                InputField::AnnualRate,
                format!("must be positive, got {annual_rate}"),
            ));
        }
        if months == 0 {
            return Err(LoanError::invalid(InputField::Tenure, "must be at least one month"));
        }
        Ok(Self {
            principal,
            annual_rate,
            months,
        })
    }

    /// accept raw floats from a form or script binding
    pub fn from_f64(principal: f64, annual_rate_percent: f64, tenure_months: f64) -> Result<Self> {
        let principal = Money::from_f64(principal).ok_or_else(|| {
            LoanError::invalid(InputField::Principal, format!("must be finite, got {principal}"))
        })?;

        let rate = if annual_rate_percent.is_finite() {
            Decimal::from_f64(annual_rate_percent)
        } else {
            None
        };
        let annual_rate = rate.map(Rate::from_percent).ok_or_else(|| {
            LoanError::invalid(
                InputField::AnnualRate,
                format!("must be finite, got {annual_rate_percent}"),
            )
        })?;

        if !tenure_months.is_finite() || tenure_months.fract() != 0.0 {
            return Err(LoanError::invalid(
                InputField::Tenure,
                format!("must be a whole number of months, got {tenure_months}"),
            ));
        }
        if tenure_months < 1.0 || tenure_months > f64::from(u32::MAX) {
            return Err(LoanError::invalid(
                InputField::Tenure,
                format!("must be at least one month, got {tenure_months}"),
            ));
        }

        Self::new(principal, annual_rate, tenure_months as u32)
    }

    /// accept form text: amount, annual rate in percent, tenure in months
    pub fn parse(principal: &str, annual_rate_percent: &str, tenure_months: &str) -> Result<Self> {
        let principal = Money::from_str_exact(principal).map_err(|e| {
            LoanError::invalid(InputField::Principal, format!("{principal:?} is not a number: {e}"))
        })?;
        let rate = Decimal::from_str(annual_rate_percent.trim()).map_err(|e| {
            LoanError::invalid(
                InputField::AnnualRate,
                format!("{annual_rate_percent:?} is not a number: {e}"),
            )
        })?;
        let months = tenure_months.trim().parse::<u32>().map_err(|_| {
            LoanError::invalid(
                InputField::Tenure,
                format!("{tenure_months:?} is not a whole number of months"),
            )
        })?;

        Self::new(principal, Rate::from_percent(rate), months)
    }

    pub fn quote(&self) -> Result<LoanQuote> {
        compute_amortization(self.principal, self.annual_rate, self.months)
    }
}

/// fixed-installment quote; derived figures are never set independently
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanQuote {
    principal: Money,
    annual_rate: Rate,
    months: u32,
    monthly_rate: Rate,
    emi: Money,
    total_payable: Money,
    total_interest: Money,
}

impl LoanQuote {
    pub fn principal(&self) -> Money {
        self.principal
    }

    pub fn annual_rate(&self) -> Rate {
        self.annual_rate
    }

    pub fn months(&self) -> u32 {
        self.months
    }

    pub fn monthly_rate(&self) -> Rate {
        self.monthly_rate
    }

    pub fn emi(&self) -> Money {
        self.emi
    }

    pub fn total_payable(&self) -> Money {
        self.total_payable
    }

    pub fn total_interest(&self) -> Money {
        self.total_interest
    }

    /// whole-unit figures for display and storage
    pub fn summary(&self) -> QuoteSummary {
        let principal = self.principal.round_to_unit();
        let total_payable = self.total_payable.round_to_unit();
        QuoteSummary {
            principal,
            interest_rate: self.annual_rate.as_percentage(),
            months: self.months,
            emi: self.emi.round_to_unit(),
            total_payable,
            total_interest: (total_payable - principal).max(Money::ZERO),
        }
    }
}

/// rounded quote as shown in the wizard and stored with an application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSummary {
    pub principal: Money,
    /// annual rate in percent
    pub interest_rate: Decimal,
    pub months: u32,
    pub emi: Money,
    pub total_payable: Money,
    pub total_interest: Money,
}

/// compute the level monthly installment and totals for a loan
pub fn compute_amortization(principal: Money, annual_rate: Rate, months: u32) -> Result<LoanQuote> {
    let input = QuoteInput::new(principal, annual_rate, months)?;

    let monthly_rate = input.annual_rate.monthly_rate();
    let emi = level_installment(input.principal, monthly_rate, input.months)?;
    let total_payable = emi
        .as_decimal()
        .checked_mul(Decimal::from(input.months))
        .map(Money::from_decimal)
        .ok_or_else(|| overflow(input.months))?;
    let total_interest = total_payable
        .as_decimal()
        .checked_sub(input.principal.as_decimal())
        .map(Money::from_decimal)
        .ok_or_else(|| overflow(input.months))?;

    log::debug!(
        "quote: principal {} at {} over {} months -> emi {}",
        input.principal,
        input.annual_rate,
        input.months,
        emi
    );

    Ok(LoanQuote {
        principal: input.principal,
        annual_rate: input.annual_rate,
        months: input.months,
        monthly_rate,
        emi,
        total_payable,
        total_interest,
    })
}

/// installment that retires `principal` in `months` equal payments;
/// a zero monthly rate gives exactly `principal / months`
pub fn level_installment(principal: Money, monthly_rate: Rate, months: u32) -> Result<Money> {
    if months == 0 {
        return Err(LoanError::invalid(InputField::Tenure, "must be at least one month"));
    }
    let n = Decimal::from(months);
    let r = monthly_rate.as_decimal();

    if r.is_zero() {
        return Ok(principal / n);
    }

    // EMI = P * r * (1 + r)^n / ((1 + r)^n - 1)
    let compound = checked_powu(Decimal::ONE + r, months).ok_or_else(|| overflow(months))?;
    let denominator = compound - Decimal::ONE;
    if denominator.is_zero() {
        // rate below decimal resolution
        return Ok(principal / n);
    }

    principal
        .as_decimal()
        .checked_mul(r)
        .and_then(|x| x.checked_mul(compound))
        .and_then(|x| x.checked_div(denominator))
        .map(Money::from_decimal)
        .ok_or_else(|| overflow(months))
}

fn overflow(months: u32) -> LoanError {
    LoanError::CalculationError {
        message: format!("repayment figures overflow decimal range over {months} months"),
    }
}

/// exponentiation by squaring, `None` on overflow
fn checked_powu(base: Decimal, exp: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut base = base;
    let mut exp = exp;
    while exp > 0 {
        if exp & 1 == 1 {
            result = result.checked_mul(base)?;
        }
        exp >>= 1;
        if exp > 0 {
            base = base.checked_mul(base)?;
        }
    }
    Some(result)
}

/// quote together with the rate lookup that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryQuote {
    pub category: String,
    pub lookup: RateLookup,
    pub quote: LoanQuote,
}

/// quote a loan at the rate configured for a product category
pub fn quote_for_category(
    rates: &RateTable,
    category: &str,
    principal: Money,
    months: u32,
) -> Result<CategoryQuote> {
    let lookup = rates.lookup(category);
    let quote = compute_amortization(principal, lookup.rate(), months)?;
    Ok(CategoryQuote {
        category: category.to_string(),
        lookup,
        quote,
    })
}
