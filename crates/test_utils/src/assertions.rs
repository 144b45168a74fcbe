//! Custom Test Assertions
//!
//! Assertion helpers for leave quantities and balances with messages that
//! show both sides in days.

use core_kernel::LeaveDays;
use domain_leave::{Balances, ErrorKind, LeaveError};
use rust_decimal::Decimal;

/// Asserts that a balance pair equals `(supplemental, entitled)`
pub fn assert_balances(actual: &Balances, supplemental: Decimal, entitled: Decimal) {
    assert_eq!(
        (actual.supplemental.value(), actual.entitled.value()),
        (supplemental, entitled),
        "Balances mismatch: actual supplemental={} entitled={}, expected supplemental={} entitled={}",
        actual.supplemental,
        actual.entitled,
        supplemental,
        entitled
    );
}

/// Asserts the invariants every stored balance pair must hold
pub fn assert_balances_within_floor(actual: &Balances, floor: LeaveDays) {
    assert!(
        !actual.supplemental.is_negative(),
        "Supplemental balance went negative: {}",
        actual.supplemental
    );
    assert!(
        actual.entitled >= floor,
        "Entitled balance {} is below the floor {}",
        actual.entitled,
        floor
    );
}

/// Asserts that a leave quantity equals `expected` days
pub fn assert_days(actual: LeaveDays, expected: Decimal) {
    assert_eq!(
        actual.value(),
        expected,
        "Expected {} days, got {}",
        expected,
        actual
    );
}

/// Asserts the kind of a leave error
pub fn assert_kind(error: &LeaveError, kind: ErrorKind) {
    assert_eq!(error.kind(), kind, "Unexpected error kind for {:?}", error);
}

/// Asserts that a result is Ok and returns the value
#[macro_export]
macro_rules! assert_ok {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("Expected Ok, got Err: {:?}", e),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => panic!("{}: {:?}", $msg, e),
        }
    };
}

/// Asserts that a result is Err and returns the error
#[macro_export]
macro_rules! assert_err {
    ($result:expr) => {
        match $result {
            Ok(value) => panic!("Expected Err, got Ok: {:?}", value),
            Err(e) => e,
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(value) => panic!("{}: got Ok({:?})", $msg, value),
            Err(e) => e,
        }
    };
}

/// Asserts that an error matches a specific variant
#[macro_export]
macro_rules! assert_err_variant {
    ($result:expr, $pattern:pat) => {
        match $result {
            Ok(value) => panic!("Expected Err matching {}, got Ok({:?})", stringify!($pattern), value),
            Err(ref e) => {
                assert!(
                    matches!(e, $pattern),
                    "Error {:?} does not match pattern {}",
                    e,
                    stringify!($pattern)
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_assert_balances_passes() {
        let balances = Balances::new(LeaveDays::new(dec!(0.5)), LeaveDays::whole(-2));
        assert_balances(&balances, dec!(0.5), dec!(-2));
        assert_balances_within_floor(&balances, LeaveDays::whole(-999));
    }

    #[test]
    #[should_panic(expected = "below the floor")]
    fn test_floor_assertion_fails() {
        let balances = Balances::new(LeaveDays::ZERO, LeaveDays::whole(-5));
        assert_balances_within_floor(&balances, LeaveDays::whole(-3));
    }

    #[test]
    fn test_assert_ok_macro() {
        let result: Result<i32, &str> = Ok(42);
        assert_eq!(assert_ok!(result), 42);
    }

    #[test]
    fn test_assert_err_macro() {
        let result: Result<i32, &str> = Err("error");
        assert_eq!(assert_err!(result), "error");
    }

    #[test]
    fn test_assert_kind() {
        assert_kind(&LeaveError::validation("bad"), ErrorKind::Validation);
    }
}
