use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// data captured from an NID card or typed by the applicant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NidInput {
    pub nid_number: String,
    pub name: String,
    pub date_of_birth: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerificationOutcome {
    Verified { nid_number: String, name: String },
    Rejected { reason: String },
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        matches!(self, VerificationOutcome::Verified { .. })
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VerificationError {
    #[error("malformed nid {nid:?}: {message}")]
    MalformedNid { nid: String, message: String },

    #[error("verification service unavailable: {message}")]
    Unavailable { message: String },
}

/// anything that can vouch for an NID
pub trait VerificationService {
    fn verify(&self, input: &NidInput) -> Result<VerificationOutcome, VerificationError>;
}

/// format check for Bangladesh NIDs: 10, 13 or 17 digits, where the
/// 17-digit form starts with the holder's birth year
#[derive(Debug, Clone, Copy, Default)]
pub struct NidVerifier;

impl NidVerifier {
    pub const VALID_LENGTHS: [usize; 3] = [10, 13, 17];

    pub fn new() -> Self {
        Self
    }
}

impl VerificationService for NidVerifier {
    fn verify(&self, input: &NidInput) -> Result<VerificationOutcome, VerificationError> {
        let nid = input.nid_number.trim();

        if nid.is_empty() || !nid.bytes().all(|b| b.is_ascii_digit()) {
            return Err(VerificationError::MalformedNid {
                nid: nid.to_string(),
                message: "must contain only digits".to_string(),
            });
        }
        if !Self::VALID_LENGTHS.contains(&nid.len()) {
            return Err(VerificationError::MalformedNid {
                nid: nid.to_string(),
                message: format!("length {} is not one of 10, 13 or 17", nid.len()),
            });
        }
        if input.name.trim().is_empty() {
            return Ok(VerificationOutcome::Rejected {
                reason: "holder name missing".to_string(),
            });
        }

        if let (17, Some(dob)) = (nid.len(), input.date_of_birth) {
            let encoded_year = &nid[..4];
            if encoded_year != dob.year().to_string() {
                return Ok(VerificationOutcome::Rejected {
                    reason: format!(
                        "nid birth year {encoded_year} does not match date of birth {dob}"
                    ),
                });
            }
        }

        log::debug!("nid {} passed format checks", nid);
        Ok(VerificationOutcome::Verified {
            nid_number: nid.to_string(),
            name: input.name.trim().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(nid: &str) -> NidInput {
        NidInput {
            nid_number: nid.to_string(),
            name: "Rahim Uddin".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1990, 3, 15),
        }
    }

    #[test]
    fn test_accepts_each_valid_length() {
        let verifier = NidVerifier::new();
        for nid in ["1234567890", "1234567890123", "19901234567890123"] {
            let outcome = verifier.verify(&input(nid)).unwrap();
            assert!(outcome.is_verified(), "{nid} should verify");
        }
    }

    #[test]
    fn test_rejects_malformed_numbers() {
        let verifier = NidVerifier::new();
        for nid in ["", "   ", "12345", "12345678901", "12345abcde", "1234-567890"] {
            assert!(
                matches!(verifier.verify(&input(nid)), Err(VerificationError::MalformedNid { .. })),
                "{nid:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_birth_year_mismatch_is_rejected() {
        let verifier = NidVerifier::new();
        let outcome = verifier.verify(&input("19851234567890123")).unwrap();
        assert!(matches!(outcome, VerificationOutcome::Rejected { .. }));

        let mut no_dob = input("19851234567890123");
        no_dob.date_of_birth = None;
        assert!(verifier.verify(&no_dob).unwrap().is_verified());
    }

    #[test]
    fn test_missing_name_is_rejected() {
        let verifier = NidVerifier::new();
        let mut nameless = input("1234567890123");
        nameless.name = "  ".to_string();
        assert_eq!(
            verifier.verify(&nameless).unwrap(),
            VerificationOutcome::Rejected { reason: "holder name missing".to_string() }
        );
    }

    #[test]
    fn test_verification_is_deterministic() {
        let verifier = NidVerifier::new();
        let a = verifier.verify(&input(" 1234567890123 ")).unwrap();
        let b = verifier.verify(&input("1234567890123")).unwrap();
        assert_eq!(a, b);
    }
}
