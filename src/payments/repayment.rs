use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::LateFeePolicy;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::payments::amortization::add_months;
use crate::payments::late_fee::{days_late, late_fee};
use crate::payments::RepaymentRequest;
use crate::types::{InstallmentStatus, PaymentMethod};

/// a recorded installment payment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repayment {
    pub installment_number: u32,
    pub amount_paid: Money,
    pub late_fee: Money,
    pub method: PaymentMethod,
    pub payment_date: NaiveDate,
    pub due_date: NaiveDate,
    pub reference: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

/// what the next installment costs on a given payment date
#[derive(Debug, Clone, PartialEq)]
pub struct AmountDue {
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub days_late: i64,
    pub installment: Money,
    pub late_fee: Money,
}

impl AmountDue {
    pub fn total(&self) -> Money {
        self.installment + self.late_fee
    }
}

/// one installment of a loan and how it stands on a given day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstallmentLine {
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub installment: Money,
    pub status: InstallmentStatus,
    pub repayment: Option<Repayment>,
}

/// installment payments against a disbursed loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentLedger {
    pub installment: Money,
    pub tenure_months: u32,
    pub disbursed_on: NaiveDate,
    pub repayments: Vec<Repayment>,
}

impl RepaymentLedger {
    pub fn new(installment: Money, tenure_months: u32, disbursed_on: NaiveDate) -> Self {
        Self {
            installment,
            tenure_months,
            disbursed_on,
            repayments: Vec::new(),
        }
    }

    pub fn installments_paid(&self) -> u32 {
        self.repayments.len() as u32
    }

    /// next unpaid installment, `None` once the loan is repaid
    pub fn next_installment(&self) -> Option<u32> {
        let next = self.installments_paid() + 1;
        (next <= self.tenure_months).then_some(next)
    }

    pub fn is_complete(&self) -> bool {
        self.next_installment().is_none()
    }

    /// installment k falls due k months after disbursement
    pub fn due_date(&self, installment_number: u32) -> Result<NaiveDate> {
        add_months(self.disbursed_on, installment_number)
    }

    pub fn amount_due(&self, payment_date: NaiveDate, policy: &LateFeePolicy) -> Result<AmountDue> {
        let installment_number = self.next_installment().ok_or(LoanError::AllInstallmentsPaid {
            tenure: self.tenure_months,
        })?;
        let due_date = self.due_date(installment_number)?;
        let days_late = days_late(due_date, payment_date);

        Ok(AmountDue {
            installment_number,
            due_date,
            days_late,
            installment: self.installment,
            late_fee: late_fee(policy, self.installment, days_late),
        })
    }

    /// record the next installment; the amount must cover installment plus late fee
    pub fn record(
        &mut self,
        request: RepaymentRequest,
        policy: &LateFeePolicy,
        recorded_at: DateTime<Utc>,
    ) -> Result<Repayment> {
        request.validate()?;
        let due = self.amount_due(request.payment_date, policy)?;

        if request.amount < due.total() {
            return Err(LoanError::InsufficientPayment {
                due: due.total(),
                installment: due.installment,
                late_fee: due.late_fee,
                provided: request.amount,
            });
        }

        let repayment = Repayment {
            installment_number: due.installment_number,
            amount_paid: request.amount,
            late_fee: due.late_fee,
            method: request.method,
            payment_date: request.payment_date,
            due_date: due.due_date,
            reference: request.reference,
            recorded_at,
        };
        self.repayments.push(repayment.clone());
        Ok(repayment)
    }

    pub fn remaining_installments(&self) -> u32 {
        self.tenure_months.saturating_sub(self.installments_paid())
    }

    /// every installment with its state on `as_of`
    pub fn installment_lines(&self, as_of: NaiveDate) -> Result<Vec<InstallmentLine>> {
        (1..=self.tenure_months)
            .map(|installment_number| {
                let due_date = self.due_date(installment_number)?;
                let repayment = self
                    .repayments
                    .iter()
                    .find(|r| r.installment_number == installment_number)
                    .cloned();
                let status = match &repayment {
                    Some(_) => InstallmentStatus::Paid,
                    None if due_date < as_of => InstallmentStatus::Overdue,
                    None => InstallmentStatus::Pending,
                };
                Ok(InstallmentLine {
                    installment_number,
                    due_date,
                    installment: self.installment,
                    status,
                    repayment,
                })
            })
            .collect()
    }

    /// amount due on `as_of` when the next installment is already past due
    pub fn overdue_amount(&self, as_of: NaiveDate, policy: &LateFeePolicy) -> Result<Option<AmountDue>> {
        let Some(next) = self.next_installment() else {
            return Ok(None);
        };
        if self.due_date(next)? >= as_of {
            return Ok(None);
        }
        self.amount_due(as_of, policy).map(Some)
    }

    pub fn total_paid(&self) -> Money {
        self.repayments.iter().map(|r| r.amount_paid).sum()
    }

    pub fn total_late_fees(&self) -> Money {
        self.repayments.iter().map(|r| r.late_fee).sum()
    }

    /// installments whose due date has passed before `as_of` without payment
    pub fn overdue_installments(&self, as_of: NaiveDate) -> Result<u32> {
        let mut due: u32 = 0;
        for k in 1..=self.tenure_months {
            if self.due_date(k)? >= as_of {
                break;
            }
            due += 1;
        }
        Ok(due.saturating_sub(self.installments_paid()))
    }
}
