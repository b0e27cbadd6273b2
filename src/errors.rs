use thiserror::Error;

use crate::decimal::{Money, Rate};
use crate::types::{ApplicationId, ApplicationStatus, InputField};
use crate::verification::VerificationError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoanError {
    #[error("invalid input: {field} {reason}")]
    InvalidInput {
        field: InputField,
        reason: String,
    },

    #[error("unknown rate category: {category}, default rate {fallback} applied")]
    UnknownRateCategory {
        category: String,
        fallback: Rate,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration {
        message: String,
    },

    #[error("unknown loan product: {category}")]
    UnknownProduct {
        category: String,
    },

    #[error("applicant not eligible: {}", reasons.join("; "))]
    Ineligible {
        reasons: Vec<String>,
    },

    #[error("application not found: {id}")]
    ApplicationNotFound {
        id: ApplicationId,
    },

    #[error("invalid state: current {current}, expected {expected}")]
    InvalidState {
        current: ApplicationStatus,
        expected: ApplicationStatus,
    },

    #[error("kyc already verified for application {id}")]
    KycAlreadyVerified {
        id: ApplicationId,
    },

    #[error("all {tenure} installments already paid")]
    AllInstallmentsPaid {
        tenure: u32,
    },

    #[error("insufficient payment: due {due} (installment {installment}, late fee {late_fee}), provided {provided}")]
    InsufficientPayment {
        due: Money,
        installment: Money,
        late_fee: Money,
        provided: Money,
    },

    #[error("nid verification failed: {0}")]
    Verification(#[from] VerificationError),

    #[error("storage error: {message}")]
    Storage {
        message: String,
    },

    #[error("serialization error: {message}")]
    Serialization {
        message: String,
    },
}

impl LoanError {
    /// shorthand for input validation failures
    pub fn invalid(field: InputField, reason: impl Into<String>) -> Self {
        LoanError::InvalidInput {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for LoanError {
    fn from(err: serde_json::Error) -> Self {
        LoanError::Serialization {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
