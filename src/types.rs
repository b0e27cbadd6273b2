use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// unique identifier for a loan application
pub type ApplicationId = Uuid;

/// standard loan product categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoanCategory {
    /// small short-term loans
    Instant,
    /// salaried borrowers
    Salary,
    /// large consumer purchases
    Consumer,
    /// small business working capital
    Business,
}

impl LoanCategory {
    pub const ALL: [LoanCategory; 4] = [
        LoanCategory::Instant,
        LoanCategory::Salary,
        LoanCategory::Consumer,
        LoanCategory::Business,
    ];

    /// code used in rate tables and stored records
    pub fn code(&self) -> &'static str {
        match self {
            LoanCategory::Instant => "instant",
            LoanCategory::Salary => "salary",
            LoanCategory::Consumer => "consumer",
            LoanCategory::Business => "business",
        }
    }
}

impl fmt::Display for LoanCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for LoanCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_lowercase();
        LoanCategory::ALL
            .into_iter()
            .find(|c| c.code() == code)
            .ok_or_else(|| format!("unknown loan category: {s}"))
    }
}

/// application status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    /// submitted, awaiting review
    Pending,
    /// approved by a reviewer, not yet disbursed
    Approved,
    /// declined by a reviewer
    Rejected,
    /// funds released, repayments running
    Disbursed,
    /// every installment paid
    Completed,
}

impl fmt::Display for ApplicationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ApplicationStatus::Pending => "pending",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Disbursed => "disbursed",
            ApplicationStatus::Completed => "completed",
        };
        f.write_str(s)
    }
}

/// outcome of the manual KYC review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KycStatus {
    #[default]
    Pending,
    Verified,
    Rejected,
}

/// state of a single installment on a given day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallmentStatus {
    Paid,
    /// due date passed without payment
    Overdue,
    Pending,
}

/// repayment channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentMethod {
    #[serde(rename = "bKash")]
    BKash,
    Nagad,
    Rocket,
    Bank,
    Card,
    Cash,
}

/// EMI-to-income risk band shown to reviewers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBand {
    /// installment within the comfortable share of income
    Acceptable,
    /// installment above the comfortable share of income
    High,
}

/// user-supplied field that failed validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InputField {
    Principal,
    AnnualRate,
    Tenure,
    MonthlyIncome,
    PaymentAmount,
    DateOfBirth,
    RejectionReason,
}

impl fmt::Display for InputField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InputField::Principal => "principal",
            InputField::AnnualRate => "annual rate",
            InputField::Tenure => "tenure",
            InputField::MonthlyIncome => "monthly income",
            InputField::PaymentAmount => "payment amount",
            InputField::DateOfBirth => "date of birth",
            InputField::RejectionReason => "rejection reason",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_codes_round_trip_through_from_str() {
        for category in LoanCategory::ALL {
            assert_eq!(category.code().parse::<LoanCategory>().unwrap(), category);
        }
        assert_eq!(" Salary ".parse::<LoanCategory>().unwrap(), LoanCategory::Salary);
        assert!("mortgage".parse::<LoanCategory>().is_err());
    }

    #[test]
    fn test_payment_method_wire_names() {
        let json = serde_json::to_string(&PaymentMethod::BKash).unwrap();
        assert_eq!(json, "\"bKash\"");
        let status = serde_json::to_string(&ApplicationStatus::Disbursed).unwrap();
        assert_eq!(status, "\"disbursed\"");
    }
}
