use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::quote::LoanQuote;

/// scheduled payment in amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledPayment {
    pub payment_number: u32,
    pub due_date: NaiveDate,
    pub beginning_balance: Money,
    pub payment_amount: Money,
    pub principal_portion: Money,
    pub interest_portion: Money,
    pub ending_balance: Money,
    pub cumulative_interest: Money,
    pub cumulative_principal: Money,
}

/// amortization schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmortizationSchedule {
    pub principal: Money,
    pub interest_rate: Rate,
    pub term_months: u32,
    pub start_date: NaiveDate,
    pub payments: Vec<ScheduledPayment>,
    pub total_interest: Money,
    pub total_payment: Money,
}

impl AmortizationSchedule {
    /// generate the equal-installment schedule for a quote; installment k
    /// falls due k calendar months after `start_date`
    pub fn generate(quote: &LoanQuote, start_date: NaiveDate) -> Result<Self> {
        let monthly_rate = quote.monthly_rate();
        let emi = quote.emi();
        let term = quote.months();

        let mut payments = Vec::with_capacity(term as usize);
        let mut balance = quote.principal();
        let mut cumulative_interest = Money::ZERO;
        let mut cumulative_principal = Money::ZERO;

        for i in 1..=term {
            let interest_portion = balance.apply_rate(monthly_rate);

            // last payment retires whatever rounding left behind
            let (principal_portion, payment_amount) = if i == term {
                (balance, balance + interest_portion)
            } else {
                let principal_portion = (emi - interest_portion).min(balance);
                (principal_portion, principal_portion + interest_portion)
            };

            cumulative_interest += interest_portion;
            cumulative_principal += principal_portion;
            let ending_balance = balance - principal_portion;

            payments.push(ScheduledPayment {
                payment_number: i,
                due_date: add_months(start_date, i)?,
                beginning_balance: balance,
                payment_amount,
                principal_portion,
                interest_portion,
                ending_balance,
                cumulative_interest,
                cumulative_principal,
            });

            balance = ending_balance;
        }

        let total_interest = payments.iter().map(|p| p.interest_portion).sum();
        let total_payment = payments.iter().map(|p| p.payment_amount).sum();

        Ok(Self {
            principal: quote.principal(),
            interest_rate: quote.annual_rate(),
            term_months: term,
            start_date,
            payments,
            total_interest,
            total_payment,
        })
    }

    /// get payment for specific period (1-based)
    pub fn get_payment(&self, payment_number: u32) -> Option<&ScheduledPayment> {
        payment_number
            .checked_sub(1)
            .and_then(|idx| self.payments.get(idx as usize))
    }

    /// remaining balance after payment; the full principal before the first
    pub fn balance_after_payment(&self, payment_number: u32) -> Money {
        self.get_payment(payment_number)
            .map(|p| p.ending_balance)
            .unwrap_or(self.principal)
    }

    /// installments falling due on or before `date`
    pub fn due_by(&self, date: NaiveDate) -> impl Iterator<Item = &ScheduledPayment> {
        self.payments.iter().filter(move |p| p.due_date <= date)
    }
}

/// add calendar months, clamping to the last day of shorter months
pub fn add_months(date: NaiveDate, months: u32) -> Result<NaiveDate> {
    date.checked_add_months(Months::new(months))
        .ok_or_else(|| LoanError::CalculationError {
            message: format!("{date} plus {months} months is out of range"),
        })
}
