//! Leave-day quantities with precise decimal arithmetic
//!
//! Leave is consumed in quarter-day steps (and 0.75 for Saturday leave), so
//! balances are held as `rust_decimal` values instead of floats. Repeatedly
//! applying and reversing a deduction must land on exactly the starting
//! balance.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use thiserror::Error;

/// Scale used for stored leave-day values
pub const LEAVE_DAYS_SCALE: u32 = 4;

/// Largest magnitude accepted from callers, well inside NUMERIC(12,4)
pub const MAX_LEAVE_DAYS: Decimal = dec!(1000000);

/// Errors that can occur when building leave-day values
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DaysError {
    #[error("Invalid leave-day amount: {0}")]
    InvalidAmount(String),

    #[error("Leave-day amount must be positive, got {0}")]
    NotPositive(String),

    #[error("Leave-day amount {0} is out of range")]
    OutOfRange(String),
}

/// A signed number of leave days
///
/// Negative values represent debt on the entitled balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaveDays(Decimal);

impl LeaveDays {
    pub const ZERO: LeaveDays = LeaveDays(Decimal::ZERO);

    /// Creates a value, normalised to the storage scale
    pub fn new(value: Decimal) -> Self {
        Self(value.round_dp(LEAVE_DAYS_SCALE))
    }

    /// Whole days
    pub fn whole(days: i64) -> Self {
        Self(Decimal::from(days))
    }

    /// Creates a value that must be strictly positive (grants, consumption)
    pub fn positive(value: Decimal) -> Result<Self, DaysError> {
        if value <= Decimal::ZERO {
            return Err(DaysError::NotPositive(value.to_string()));
        }
        Self::bounded(value)
    }

    /// Creates a value whose magnitude is at most [`MAX_LEAVE_DAYS`]
    pub fn bounded(value: Decimal) -> Result<Self, DaysError> {
        if value.abs() > MAX_LEAVE_DAYS {
            return Err(DaysError::OutOfRange(value.to_string()));
        }
        Ok(Self::new(value))
    }

    /// Returns the underlying decimal
    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(&self) -> bool {
        self.0 < Decimal::ZERO
    }
}

impl Default for LeaveDays {
    fn default() -> Self {
        Self::ZERO
    }
}

impl fmt::Display for LeaveDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.normalize())
    }
}

impl FromStr for LeaveDays {
    type Err = DaysError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = Decimal::from_str(s.trim()).map_err(|_| DaysError::InvalidAmount(s.to_string()))?;
        Self::bounded(value)
    }
}

impl From<Decimal> for LeaveDays {
    fn from(value: Decimal) -> Self {
        Self::new(value)
    }
}

impl From<u32> for LeaveDays {
    fn from(days: u32) -> Self {
        Self(Decimal::from(days))
    }
}

impl Add for LeaveDays {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self::new(self.0.saturating_add(other.0))
    }
}

impl AddAssign for LeaveDays {
    fn add_assign(&mut self, other: Self) {
        *self = *self + other;
    }
}

impl Sub for LeaveDays {
    type Output = Self;

    fn sub(self, other: Self) -> Self {
        Self::new(self.0.saturating_sub(other.0))
    }
}

impl SubAssign for LeaveDays {
    fn sub_assign(&mut self, other: Self) {
        *self = *self - other;
    }
}

impl Neg for LeaveDays {
    type Output = Self;

    fn neg(self) -> Self {
        Self(-self.0)
    }
}

impl Sum for LeaveDays {
    fn sum<I: Iterator<Item = LeaveDays>>(iter: I) -> Self {
        iter.fold(LeaveDays::ZERO, |acc, d| acc + d)
    }
}

/// Common fractions used by the consumption weight table
pub mod fractions {
    use super::*;

    pub fn full() -> LeaveDays {
        LeaveDays(dec!(1.0))
    }

    pub fn three_quarters() -> LeaveDays {
        LeaveDays(dec!(0.75))
    }

    pub fn half() -> LeaveDays {
        LeaveDays(dec!(0.5))
    }

    pub fn quarter() -> LeaveDays {
        LeaveDays(dec!(0.25))
    }
}
