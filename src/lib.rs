pub mod application;
pub mod config;
pub mod decimal;
pub mod eligibility;
pub mod errors;
pub mod events;
pub mod payments;
pub mod quote;
pub mod types;
pub mod verification;

// re-export key types
pub use application::{
    Applicant, ApplicationForm, ApplicationRepository, InMemoryApplicationRepository, KycReview,
    LoanApplication, LoanDesk, OverdueLoan, OverdueReport, Preview, RepaymentStatus,
    ReviewSummary,
};
pub use config::{
    AffordabilityPolicy, EngineConfig, LateFeePolicy, ProductConfig, RateLookup, RateTable,
};
pub use decimal::{Money, Rate};
pub use eligibility::{
    check_eligibility, emi_to_income_ratio, risk_band, EligibilityDecision, EligibilityRequest,
    IneligibilityReason,
};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use payments::{
    AmortizationSchedule, AmountDue, InstallmentLine, Repayment, RepaymentLedger,
    RepaymentRequest, ScheduledPayment,
};
pub use quote::{
    compute_amortization, level_installment, quote_for_category, CategoryQuote, LoanQuote,
    QuoteInput, QuoteSummary,
};
pub use types::{
    ApplicationId, ApplicationStatus, InputField, InstallmentStatus, KycStatus, LoanCategory,
    PaymentMethod, RiskBand,
};
pub use verification::{
    NidInput, NidVerifier, VerificationError, VerificationOutcome, VerificationService,
};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
