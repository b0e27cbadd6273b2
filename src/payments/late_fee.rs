use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::config::LateFeePolicy;
use crate::decimal::Money;

/// calendar days between due date and payment date, negative when early
pub fn days_late(due_date: NaiveDate, payment_date: NaiveDate) -> i64 {
    (payment_date - due_date).num_days()
}

/// late fee on an installment: daily rate per day late, capped
pub fn late_fee(policy: &LateFeePolicy, installment: Money, days_late: i64) -> Money {
    if days_late <= 0 {
        return Money::ZERO;
    }
    let daily = installment.apply_rate(policy.daily_rate);
    let accrued = daily * Decimal::from(days_late);
    let cap = installment.apply_rate(policy.cap_rate);
    accrued.min(cap)
}
