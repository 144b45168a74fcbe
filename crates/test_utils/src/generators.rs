//! Property-Based Test Generators
//!
//! Proptest strategies that only produce values the domain accepts.

use chrono::{Duration, NaiveDate};
use proptest::prelude::*;
use rust_decimal::Decimal;

use core_kernel::{DateRange, LeaveDays};
use domain_leave::{Balances, LeaveCategory};

/// Dates between 2000-01-01 and roughly 2049
pub fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..18_000).prop_map(|offset| {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default() + Duration::days(offset)
    })
}

/// Inclusive ranges of one to `max_days` days
pub fn date_range_strategy(max_days: i64) -> impl Strategy<Value = DateRange> {
    (date_strategy(), 0..max_days.max(1)).prop_map(|(start, extra)| DateRange {
        start,
        end: start + Duration::days(extra),
    })
}

pub fn category_strategy() -> impl Strategy<Value = LeaveCategory> {
    proptest::sample::select(LeaveCategory::ALL.to_vec())
}

/// Categories that reduce the balances once approved
pub fn consuming_category_strategy() -> impl Strategy<Value = LeaveCategory> {
    category_strategy().prop_filter("consumes balance", |c| c.consumes_balance())
}

/// Non-negative quarter-day multiples up to 50 days
pub fn quarter_days_strategy() -> impl Strategy<Value = LeaveDays> {
    (0i64..=200).prop_map(|quarters| LeaveDays::new(Decimal::new(quarters * 25, 2)))
}

/// Positive quarter-day multiples up to 10 days
pub fn consumption_strategy() -> impl Strategy<Value = LeaveDays> {
    (1i64..=40).prop_map(|quarters| LeaveDays::new(Decimal::new(quarters * 25, 2)))
}

/// Balance pairs with a non-negative supplemental and a possibly negative
/// entitled balance
pub fn balances_strategy() -> impl Strategy<Value = Balances> {
    (quarter_days_strategy(), -40i64..=30).prop_map(|(supplemental, entitled)| {
        Balances::new(supplemental, LeaveDays::whole(entitled))
    })
}
