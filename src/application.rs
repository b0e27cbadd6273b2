use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::{EngineConfig, RateLookup};
use crate::decimal::{Money, Rate};
use crate::eligibility::{check_eligibility, emi_to_income_ratio, risk_band, EligibilityRequest};
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::payments::{
    AmortizationSchedule, InstallmentLine, Repayment, RepaymentLedger, RepaymentRequest,
};
use crate::quote::{compute_amortization, quote_for_category, QuoteSummary};
use crate::types::{ApplicationId, ApplicationStatus, InputField, KycStatus, RiskBand};
use crate::verification::{NidInput, VerificationOutcome, VerificationService};

/// applicant details captured by the wizard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Applicant {
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub date_of_birth: NaiveDate,
    pub nid_number: String,
    pub address: String,
    pub employment_type: String,
    pub employer: Option<String>,
    pub monthly_income: Money,
    pub existing_loans: Option<String>,
}

/// a completed wizard submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationForm {
    pub category: String,
    pub amount: Money,
    pub tenure_months: u32,
    pub purpose: String,
    pub applicant: Applicant,
}

/// manual KYC review of the applicant's documents
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct KycReview {
    pub status: KycStatus,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub rejection_reason: Option<String>,
}

/// stored loan application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanApplication {
    pub id: ApplicationId,
    pub category: String,
    pub amount: Money,
    pub tenure_months: u32,
    pub purpose: String,
    pub applicant: Applicant,
    pub nid_verified: bool,
    #[serde(default)]
    pub kyc: KycReview,
    /// quote as computed at submission
    pub calculation: QuoteSummary,
    pub status: ApplicationStatus,
    pub submitted_at: DateTime<Utc>,
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub disbursed_at: Option<DateTime<Utc>>,
    pub ledger: Option<RepaymentLedger>,
}

impl LoanApplication {
    fn expect_status(&self, expected: ApplicationStatus) -> Result<()> {
        if self.status != expected {
            return Err(LoanError::InvalidState {
                current: self.status,
                expected,
            });
        }
        Ok(())
    }

    fn ledger(&self) -> Result<&RepaymentLedger> {
        match &self.ledger {
            Some(ledger) => Ok(ledger),
            None if self.status == ApplicationStatus::Disbursed => Err(missing_ledger(self.id)),
            None => Err(LoanError::InvalidState {
                current: self.status,
                expected: ApplicationStatus::Disbursed,
            }),
        }
    }
}

fn missing_ledger(id: ApplicationId) -> LoanError {
    LoanError::InvalidConfiguration {
        message: format!("disbursed application {id} has no repayment ledger"),
    }
}

/// storage for applications
pub trait ApplicationRepository {
    /// insert or replace by id
    fn save(&mut self, application: LoanApplication) -> Result<()>;

    /// every application in submission order
    fn list(&self) -> Result<Vec<LoanApplication>>;

    fn find_by_id(&self, id: ApplicationId) -> Result<Option<LoanApplication>>;
}

/// in-process repository with a JSON snapshot format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryApplicationRepository {
    records: Vec<LoanApplication>,
}

impl InMemoryApplicationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.records)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let records: Vec<LoanApplication> = serde_json::from_str(json)?;
        Ok(Self { records })
    }
}

impl ApplicationRepository for InMemoryApplicationRepository {
    fn save(&mut self, application: LoanApplication) -> Result<()> {
        match self.records.iter_mut().find(|r| r.id == application.id) {
            Some(existing) => *existing = application,
            None => self.records.push(application),
        }
        Ok(())
    }

    fn list(&self) -> Result<Vec<LoanApplication>> {
        Ok(self.records.clone())
    }

    fn find_by_id(&self, id: ApplicationId) -> Result<Option<LoanApplication>> {
        Ok(self.records.iter().find(|r| r.id == id).cloned())
    }
}

/// live wizard preview
#[derive(Debug, Clone, PartialEq)]
pub struct Preview {
    pub summary: QuoteSummary,
    pub lookup: RateLookup,
}

/// figures shown on the admin review screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewSummary {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
    pub category: String,
    pub calculation: QuoteSummary,
    pub monthly_income: Money,
    /// EMI as a percentage of monthly income
    pub emi_to_income: Decimal,
    pub risk_band: RiskBand,
    pub nid_verified: bool,
    pub kyc_status: KycStatus,
}

/// a disbursed loan whose next installment is past due
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueLoan {
    pub application_id: ApplicationId,
    pub applicant_name: String,
    pub phone: String,
    pub category: String,
    pub installment_number: u32,
    pub due_date: NaiveDate,
    pub days_overdue: i64,
    pub installment: Money,
    pub late_fee: Money,
    pub total_due: Money,
    /// every installment past due, not only the next one
    pub overdue_installments: u32,
}

/// collections view across the portfolio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverdueReport {
    /// most overdue first
    pub loans: Vec<OverdueLoan>,
    pub total_due: Money,
}

/// installment-by-installment view of one loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepaymentStatus {
    pub id: ApplicationId,
    pub status: ApplicationStatus,
    pub installments: Vec<InstallmentLine>,
    pub total_paid: Money,
    pub total_late_fees: Money,
    pub remaining_installments: u32,
    pub overdue_installments: u32,
}

/// origination, review and repayment workflow over injected storage and verification
pub struct LoanDesk<R: ApplicationRepository, V: VerificationService> {
    config: EngineConfig,
    repository: R,
    verifier: V,
    events: EventStore,
}

impl<R: ApplicationRepository, V: VerificationService> LoanDesk<R, V> {
    pub fn new(config: EngineConfig, repository: R, verifier: V) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            repository,
            verifier,
            events: EventStore::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// quote shown while the applicant edits amount, tenure or product
    pub fn preview(&self, category: &str, amount: Money, tenure_months: u32) -> Result<Preview> {
        let quoted = quote_for_category(&self.config.rates, category, amount, tenure_months)?;
        Ok(Preview {
            summary: quoted.quote.summary(),
            lookup: quoted.lookup,
        })
    }

    /// tenures the wizard offers for a product
    pub fn tenure_choices(&self, category: &str) -> Result<Vec<u32>> {
        self.config.tenure_choices(category)
    }

    /// validate, verify and store a new application as pending
    pub fn submit(
        &mut self,
        form: ApplicationForm,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        let now = time_provider.now();
        let quoted = quote_for_category(
            &self.config.rates,
            &form.category,
            form.amount,
            form.tenure_months,
        )?;

        check_eligibility(
            &self.config,
            &EligibilityRequest {
                category: &form.category,
                amount: form.amount,
                tenure_months: form.tenure_months,
                monthly_income: form.applicant.monthly_income,
                date_of_birth: form.applicant.date_of_birth,
            },
            now.date_naive(),
        )?
        .into_result()?;

        let outcome = self.verifier.verify(&NidInput {
            nid_number: form.applicant.nid_number.clone(),
            name: form.applicant.name.clone(),
            date_of_birth: Some(form.applicant.date_of_birth),
        })?;
        let nid_number = match outcome {
            VerificationOutcome::Verified { nid_number, .. } => nid_number,
            VerificationOutcome::Rejected { reason } => {
                return Err(LoanError::Ineligible {
                    reasons: vec![format!("nid rejected: {reason}")],
                });
            }
        };

        let application = LoanApplication {
            id: Uuid::new_v4(),
            category: form.category,
            amount: form.amount,
            tenure_months: form.tenure_months,
            purpose: form.purpose,
            applicant: form.applicant,
            nid_verified: true,
            kyc: KycReview::default(),
            calculation: quoted.quote.summary(),
            status: ApplicationStatus::Pending,
            submitted_at: now,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            disbursed_at: None,
            ledger: None,
        };
        let events = vec![
            Event::NidVerified {
                application_id: application.id,
                nid_number,
                timestamp: now,
            },
            Event::ApplicationSubmitted {
                application_id: application.id,
                category: application.category.clone(),
                amount: application.amount,
                tenure_months: application.tenure_months,
                emi: application.calculation.emi,
                timestamp: now,
            },
        ];
        let application = self.commit(application, events)?;

        log::info!(
            "application {} submitted: {} {} over {} months, emi {}",
            application.id,
            application.category,
            application.amount,
            application.tenure_months,
            application.calculation.emi
        );
        Ok(application)
    }

    pub fn approve(
        &mut self,
        id: ApplicationId,
        reviewer: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        let now = time_provider.now();
        let mut application = self.load(id)?;
        application.expect_status(ApplicationStatus::Pending)?;

        application.reviewed_by = Some(reviewer.to_string());
        application.reviewed_at = Some(now);
        let status_changed = change_status(&mut application, ApplicationStatus::Approved, now);
        let approved = Event::ApplicationApproved {
            application_id: id,
            reviewer: reviewer.to_string(),
            timestamp: now,
        };
        self.commit(application, vec![status_changed, approved])
    }

    pub fn reject(
        &mut self,
        id: ApplicationId,
        reviewer: &str,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        let now = time_provider.now();
        let mut application = self.load(id)?;
        application.expect_status(ApplicationStatus::Pending)?;

        application.reviewed_by = Some(reviewer.to_string());
        application.reviewed_at = Some(now);
        application.rejection_reason = Some(reason.to_string());
        let status_changed = change_status(&mut application, ApplicationStatus::Rejected, now);
        let rejected = Event::ApplicationRejected {
            application_id: id,
            reviewer: reviewer.to_string(),
            reason: reason.to_string(),
            timestamp: now,
        };
        self.commit(application, vec![status_changed, rejected])
    }

    /// mark the applicant's documents as checked; a verified review is final
    pub fn verify_kyc(
        &mut self,
        id: ApplicationId,
        reviewer: &str,
        notes: Option<&str>,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        let now = time_provider.now();
        let mut application = self.load(id)?;
        if application.kyc.status == KycStatus::Verified {
            return Err(LoanError::KycAlreadyVerified { id });
        }

        application.kyc = KycReview {
            status: KycStatus::Verified,
            reviewed_by: Some(reviewer.to_string()),
            reviewed_at: Some(now),
            notes: notes.map(str::to_string),
            rejection_reason: None,
        };
        let verified = Event::KycVerified {
            application_id: id,
            reviewer: reviewer.to_string(),
            timestamp: now,
        };
        let application = self.commit(application, vec![verified])?;

        log::info!("application {}: kyc verified by {}", id, reviewer);
        Ok(application)
    }

    pub fn reject_kyc(
        &mut self,
        id: ApplicationId,
        reviewer: &str,
        reason: &str,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(LoanError::invalid(InputField::RejectionReason, "is required"));
        }
        let now = time_provider.now();
        let mut application = self.load(id)?;

        application.kyc = KycReview {
            status: KycStatus::Rejected,
            reviewed_by: Some(reviewer.to_string()),
            reviewed_at: Some(now),
            notes: None,
            rejection_reason: Some(reason.to_string()),
        };
        let rejected = Event::KycRejected {
            application_id: id,
            reviewer: reviewer.to_string(),
            reason: reason.to_string(),
            timestamp: now,
        };
        let application = self.commit(application, vec![rejected])?;

        log::info!("application {}: kyc rejected by {}: {}", id, reviewer, reason);
        Ok(application)
    }

    /// release funds and open the repayment ledger
    pub fn disburse(
        &mut self,
        id: ApplicationId,
        time_provider: &SafeTimeProvider,
    ) -> Result<LoanApplication> {
        let now = time_provider.now();
        let mut application = self.load(id)?;
        application.expect_status(ApplicationStatus::Approved)?;

        let ledger = RepaymentLedger::new(
            application.calculation.emi,
            application.tenure_months,
            now.date_naive(),
        );
        let first_due_date = ledger.due_date(1)?;

        application.disbursed_at = Some(now);
        application.ledger = Some(ledger);
        let status_changed = change_status(&mut application, ApplicationStatus::Disbursed, now);
        let disbursed = Event::LoanDisbursed {
            application_id: id,
            amount: application.amount,
            first_due_date,
            timestamp: now,
        };
        self.commit(application, vec![status_changed, disbursed])
    }

    /// record the next installment on a disbursed loan
    pub fn record_repayment(
        &mut self,
        id: ApplicationId,
        request: RepaymentRequest,
        time_provider: &SafeTimeProvider,
    ) -> Result<Repayment> {
        let now = time_provider.now();
        let mut application = self.load(id)?;
        application.expect_status(ApplicationStatus::Disbursed)?;

        let ledger = application.ledger.as_mut().ok_or_else(|| missing_ledger(id))?;
        let repayment = ledger.record(request, &self.config.late_fees, now)?;
        let completed = ledger.is_complete();
        let total_paid = ledger.total_paid();

        let mut events = vec![Event::RepaymentRecorded {
            application_id: id,
            installment_number: repayment.installment_number,
            amount: repayment.amount_paid,
            late_fee: repayment.late_fee,
            timestamp: now,
        }];
        if completed {
            events.push(change_status(&mut application, ApplicationStatus::Completed, now));
            events.push(Event::LoanCompleted {
                application_id: id,
                total_paid,
                timestamp: now,
            });
        }
        self.commit(application, events)?;

        log::info!(
            "application {}: installment {} paid {} (late fee {})",
            id,
            repayment.installment_number,
            repayment.amount_paid,
            repayment.late_fee
        );
        Ok(repayment)
    }

    /// installment schedule of a disbursed or completed loan with payment state on `as_of`
    pub fn repayment_status(&self, id: ApplicationId, as_of: NaiveDate) -> Result<RepaymentStatus> {
        let application = self.load(id)?;
        let ledger = application.ledger()?;

        Ok(RepaymentStatus {
            id,
            status: application.status,
            installments: ledger.installment_lines(as_of)?,
            total_paid: ledger.total_paid(),
            total_late_fees: ledger.total_late_fees(),
            remaining_installments: ledger.remaining_installments(),
            overdue_installments: ledger.overdue_installments(as_of)?,
        })
    }

    /// disbursed loans whose next installment fell due before `as_of`
    pub fn overdue(&self, as_of: NaiveDate) -> Result<OverdueReport> {
        let mut loans = Vec::new();
        for application in self.list_by_status(ApplicationStatus::Disbursed)? {
            let ledger = application.ledger()?;
            let Some(due) = ledger.overdue_amount(as_of, &self.config.late_fees)? else {
                continue;
            };
            loans.push(OverdueLoan {
                application_id: application.id,
                applicant_name: application.applicant.name.clone(),
                phone: application.applicant.phone.clone(),
                category: application.category.clone(),
                installment_number: due.installment_number,
                due_date: due.due_date,
                days_overdue: due.days_late,
                installment: due.installment,
                late_fee: due.late_fee,
                total_due: due.total(),
                overdue_installments: ledger.overdue_installments(as_of)?,
            });
        }

        loans.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
        let total_due = loans.iter().map(|loan| loan.total_due).sum();
        Ok(OverdueReport { loans, total_due })
    }

    /// risk figures for the admin review screen
    pub fn review(&self, id: ApplicationId) -> Result<ReviewSummary> {
        let application = self.load(id)?;
        let monthly_income = application.applicant.monthly_income;
        let emi_to_income = emi_to_income_ratio(application.calculation.emi, monthly_income)?;

        Ok(ReviewSummary {
            id,
            status: application.status,
            category: application.category,
            risk_band: risk_band(emi_to_income, self.config.affordability.review_risk_threshold),
            calculation: application.calculation,
            monthly_income,
            emi_to_income,
            nid_verified: application.nid_verified,
            kyc_status: application.kyc.status,
        })
    }

    /// installment schedule from the stored quote, dated from disbursement
    /// or, before that, from submission
    pub fn schedule(&self, id: ApplicationId) -> Result<AmortizationSchedule> {
        let application = self.load(id)?;
        let quote = compute_amortization(
            application.amount,
            Rate::from_percent(application.calculation.interest_rate),
            application.tenure_months,
        )?;
        let start = application
            .disbursed_at
            .unwrap_or(application.submitted_at)
            .date_naive();
        AmortizationSchedule::generate(&quote, start)
    }

    pub fn list_by_status(&self, status: ApplicationStatus) -> Result<Vec<LoanApplication>> {
        Ok(self
            .repository
            .list()?
            .into_iter()
            .filter(|a| a.status == status)
            .collect())
    }

    fn load(&self, id: ApplicationId) -> Result<LoanApplication> {
        self.repository
            .find_by_id(id)?
            .ok_or(LoanError::ApplicationNotFound { id })
    }

    /// persist the application, then publish what happened to it
    fn commit(&mut self, application: LoanApplication, events: Vec<Event>) -> Result<LoanApplication> {
        self.repository.save(application.clone())?;
        for event in events {
            if let Event::StatusChanged {
                application_id,
                old_status,
                new_status,
                ..
            } = &event
            {
                log::info!("application {}: {} -> {}", application_id, old_status, new_status);
            }
            self.events.emit(event);
        }
        Ok(application)
    }
}

/// move to `new_status`, returning the event to publish once saved
fn change_status(
    application: &mut LoanApplication,
    new_status: ApplicationStatus,
    now: DateTime<Utc>,
) -> Event {
    let old_status = application.status;
    application.status = new_status;
    Event::StatusChanged {
        application_id: application.id,
        old_status,
        new_status,
        timestamp: now,
    }
}
