/// application review - submit, approve, disburse and collect with controlled time
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use microloan_engine::{
    Applicant, ApplicationForm, EngineConfig, InMemoryApplicationRepository, LoanDesk, Money,
    NidVerifier, PaymentMethod, RepaymentRequest, SafeTimeProvider, TimeSource,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let time = SafeTimeProvider::new(TimeSource::Test(
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    ));
    let controller = time.test_control().unwrap();

    let mut desk = LoanDesk::new(
        EngineConfig::standard(),
        InMemoryApplicationRepository::new(),
        NidVerifier::new(),
    )?;

    let preview = desk.preview("salary", Money::from_major(150_000), 24)?;
    println!("preview: emi {} at {}%", preview.summary.emi, preview.summary.interest_rate);

    let application = desk.submit(
        ApplicationForm {
            category: "salary".to_string(),
            amount: Money::from_major(150_000),
            tenure_months: 24,
            purpose: "Home renovation".to_string(),
            applicant: Applicant {
                name: "Nusrat Jahan".to_string(),
                phone: "01812345678".to_string(),
                email: Some("nusrat@example.com".to_string()),
                date_of_birth: NaiveDate::from_ymd_opt(1992, 4, 12).unwrap(),
                nid_number: "19921234567890123".to_string(),
                address: "Agrabad, Chattogram".to_string(),
                employment_type: "salaried".to_string(),
                employer: Some("Port Logistics".to_string()),
                monthly_income: Money::from_major(30_000),
                existing_loans: None,
            },
        },
        &time,
    )?;
    println!("submitted {} ({})", application.id, application.status);

    let review = desk.review(application.id)?;
    println!(
        "review: emi {} / income {} = {}% ({:?})",
        review.calculation.emi, review.monthly_income, review.emi_to_income, review.risk_band
    );

    controller.advance(Duration::days(1));
    desk.verify_kyc(application.id, "admin", Some("NID photo matches"), &time)?;
    desk.approve(application.id, "admin", &time)?;
    let disbursed = desk.disburse(application.id, &time)?;

    // pay the first installment three days late
    let ledger = disbursed.ledger.as_ref().unwrap();
    let paid_on = ledger.due_date(1)? + Duration::days(3);
    let amount_due = ledger.amount_due(paid_on, &desk.config().late_fees)?;
    println!("installment 1 due with late fee: {}", amount_due.total());

    let repayment = desk.record_repayment(
        application.id,
        RepaymentRequest {
            amount: amount_due.total(),
            method: PaymentMethod::BKash,
            payment_date: paid_on,
            reference: Some("TXN123456789".to_string()),
        },
        &time,
    )?;
    println!(
        "recorded installment {} with late fee {}",
        repayment.installment_number, repayment.late_fee
    );

    let as_of = ledger.due_date(3)? + Duration::days(5);
    let status = desk.repayment_status(application.id, as_of)?;
    for line in &status.installments[..4] {
        println!("  #{} due {} {:?}", line.installment_number, line.due_date, line.status);
    }

    for loan in desk.overdue(as_of)?.loans {
        println!(
            "overdue: {} installment {} is {} days late, {} due",
            loan.applicant_name, loan.installment_number, loan.days_overdue, loan.total_due
        );
    }

    println!("\n{}", desk.repository().to_json()?);
    Ok(())
}
