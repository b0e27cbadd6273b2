/// quick quote - EMI preview for each standard product
use microloan_engine::{compute_amortization, LoanCategory, Money, QuoteInput, RateTable};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let rates = RateTable::standard();
    let amount = Money::from_major(150_000);

    println!("=== quotes for {} over 24 months ===\n", amount);
    for category in LoanCategory::ALL {
        let rate = rates.rate_for(category);
        let summary = compute_amortization(amount, rate, 24)?.summary();
        println!(
            "{:<9} {:>5}  emi {:>7}  total {:>8}  interest {:>7}",
            category.code(),
            rate.to_string(),
            summary.emi,
            summary.total_payable,
            summary.total_interest
        );
    }

    // unknown categories fall back to the default rate, visibly
    let lookup = rates.lookup("festival");
    if let Some(err) = lookup.fallback_error() {
        println!("\nnote: {err}");
    }

    // raw form text is validated before quoting
    match QuoteInput::parse("50000", "18", "0") {
        Ok(input) => println!("{:?}", input.quote()?.summary()),
        Err(err) => println!("rejected form input: {err}"),
    }

    Ok(())
}
