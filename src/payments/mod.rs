pub mod amortization;
pub mod late_fee;
pub mod repayment;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::types::{InputField, PaymentMethod};

pub use amortization::{AmortizationSchedule, ScheduledPayment};
pub use late_fee::{days_late, late_fee};
pub use repayment::{AmountDue, InstallmentLine, Repayment, RepaymentLedger};

/// repayment request as entered by a collector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentRequest {
    pub amount: Money,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub reference: Option<String>,
}

impl RepaymentRequest {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(LoanError::invalid(
                InputField::PaymentAmount,
                format!("must be positive, got {}", self.amount),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repayment_request_validation() {
        let mut request = RepaymentRequest {
            amount: Money::from_major(7_273),
            method: PaymentMethod::Nagad,
            payment_date: NaiveDate::from_ymd_opt(2024, 2, 3).unwrap(),
            reference: None,
        };
        assert!(request.validate().is_ok());

        request.amount = Money::ZERO;
        assert!(request.validate().is_err());

        request.amount = Money::from_major(-5);
        assert!(matches!(
            request.validate(),
            Err(LoanError::InvalidInput { field: InputField::PaymentAmount, .. })
        ));
    }
}
