//! Dual-balance leave ledger
//!
//! Consumption draws on the supplemental balance first and then on the
//! entitled balance. The entitled balance may go into debt, but never below
//! the configured floor. Every application returns the exact [`Deduction`]
//! taken so that cancelling an approved event restores the balances to the
//! cent.

use serde::{Deserialize, Serialize};

use core_kernel::LeaveDays;
use crate::category::LeaveCategory;
use crate::employee::Balances;

/// Default floor for entitled-balance debt
pub const DEFAULT_DEBT_FLOOR: i64 = -999;

/// What a single consumption took from each balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Deduction {
    pub from_supplemental: LeaveDays,
    pub from_entitled: LeaveDays,
}

impl Deduction {
    pub fn total(&self) -> LeaveDays {
        self.from_supplemental + self.from_entitled
    }

    pub fn is_empty(&self) -> bool {
        self.from_supplemental.is_zero() && self.from_entitled.is_zero()
    }
}

/// Balance arithmetic for consumption, reversal and grants
#[derive(Debug, Clone, Copy)]
pub struct LeaveLedger {
    debt_floor: LeaveDays,
}

impl Default for LeaveLedger {
    fn default() -> Self {
        Self::new(LeaveDays::whole(DEFAULT_DEBT_FLOOR))
    }
}

impl LeaveLedger {
    pub fn new(debt_floor: LeaveDays) -> Self {
        Self { debt_floor }
    }

    pub fn debt_floor(&self) -> LeaveDays {
        self.debt_floor
    }

    /// Days an approved event of `category` consumes
    ///
    /// The weight is charged once per event whatever its date range.
    pub fn consumption_for(&self, category: LeaveCategory) -> LeaveDays {
        category.consumption_weight()
    }

    /// Deducts `days`, supplemental first, and returns what was taken
    pub fn apply_consumption(&self, balances: &mut Balances, days: LeaveDays) -> Deduction {
        if !days.is_positive() {
            return Deduction::default();
        }

        if balances.supplemental >= days {
            balances.supplemental -= days;
            return Deduction {
                from_supplemental: days,
                from_entitled: LeaveDays::ZERO,
            };
        }

        let from_supplemental = balances.supplemental.max(LeaveDays::ZERO);
        let remainder = days - from_supplemental;
        balances.supplemental -= from_supplemental;

        // A balance already below the floor is left where it is
        let floor = self.debt_floor.min(balances.entitled);
        let new_entitled = (balances.entitled - remainder).max(floor);
        let from_entitled = balances.entitled - new_entitled;
        balances.entitled = new_entitled;

        Deduction {
            from_supplemental,
            from_entitled,
        }
    }

    /// Restores exactly what `deduction` took
    pub fn reverse_consumption(&self, balances: &mut Balances, deduction: &Deduction) {
        balances.supplemental += deduction.from_supplemental;
        balances.entitled += deduction.from_entitled;
    }

    /// Credits the supplemental balance
    pub fn credit_supplemental(&self, balances: &mut Balances, days: LeaveDays) {
        balances.supplemental += days;
    }

    /// Remaining balances derived from lifetime totals
    ///
    /// Usage is charged against lifetime grants first; whatever grants do
    /// not cover comes out of the accrued entitlement.
    pub fn derive_balances(
        &self,
        accrued: LeaveDays,
        lifetime_grants: LeaveDays,
        used: LeaveDays,
    ) -> Balances {
        if used <= lifetime_grants {
            Balances::new(lifetime_grants - used, accrued)
        } else {
            let entitled = (accrued - (used - lifetime_grants)).max(self.debt_floor);
            Balances::new(LeaveDays::ZERO, entitled)
        }
    }
}
