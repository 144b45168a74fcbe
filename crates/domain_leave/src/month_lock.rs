//! Monthly schedule confirmation
//!
//! Each (department, month) is either unlocked or locked. A department
//! admin confirms (locks) a month inside a short window around month end;
//! only a superadmin can unlock it again. While locked, no event touching
//! that department-month may change except by a superadmin.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{DateRange, EmployeeId, YearMonth};
use crate::actor::Actor;
use crate::error::{AuthorizationFailure, LeaveError};

/// Identifies one department's schedule for one month
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MonthKey {
    pub department: String,
    pub month: YearMonth,
}

impl MonthKey {
    pub fn new(department: impl Into<String>, month: YearMonth) -> Self {
        Self {
            department: department.into(),
            month,
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.department, self.month)
    }
}

/// Persisted lock state for a key; at most one record per key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthLockRecord {
    pub key: MonthKey,
    pub locked: bool,
    pub locked_at: Option<DateTime<Utc>>,
    pub locked_by: Option<EmployeeId>,
}

impl MonthLockRecord {
    pub fn unlocked(key: MonthKey) -> Self {
        Self {
            key,
            locked: false,
            locked_at: None,
            locked_by: None,
        }
    }
}

/// Days of the month between which a month may be confirmed
///
/// Opens on `opens_on_day` of the target month (or its last day, when the
/// month is shorter) and closes on `closes_on_day` of the next month,
/// both inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationWindow {
    pub opens_on_day: u32,
    pub closes_on_day: u32,
}

impl Default for ConfirmationWindow {
    fn default() -> Self {
        Self {
            opens_on_day: 29,
            closes_on_day: 4,
        }
    }
}

impl ConfirmationWindow {
    pub fn bounds(&self, month: YearMonth) -> DateRange {
        DateRange {
            start: month.clamped_day(self.opens_on_day),
            end: month.next().clamped_day(self.closes_on_day),
        }
    }

    pub fn is_open(&self, month: YearMonth, today: NaiveDate) -> bool {
        self.bounds(month).contains(today)
    }
}

/// Current lock state of a department-month, as shown to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthLockStatus {
    pub key: MonthKey,
    pub locked: bool,
    pub locked_by: Option<EmployeeId>,
    pub locked_at: Option<DateTime<Utc>>,
    /// Window open and not yet locked
    pub can_confirm: bool,
}

/// Lock transition rules
#[derive(Debug, Clone)]
pub struct MonthLock {
    window: ConfirmationWindow,
    management_department: String,
}

impl MonthLock {
    pub fn new(window: ConfirmationWindow, management_department: impl Into<String>) -> Self {
        Self {
            window,
            management_department: management_department.into(),
        }
    }

    pub fn window(&self) -> &ConfirmationWindow {
        &self.window
    }

    /// Unlocked → Locked
    ///
    /// Checks, in order: role, window, signature, current state.
    pub fn confirm(
        &self,
        current: Option<&MonthLockRecord>,
        key: &MonthKey,
        actor: &Actor,
        has_signature: bool,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<MonthLockRecord, LeaveError> {
        if !(actor.administers(&key.department) || actor.department == self.management_department) {
            return Err(AuthorizationFailure::RoleRequired {
                action: "confirming a month",
                required: "the department's admin or the management office",
            }
            .into());
        }

        if !self.window.is_open(key.month, today) {
            let bounds = self.window.bounds(key.month);
            return Err(LeaveError::ConfirmationWindowClosed {
                month: key.month,
                opens: bounds.start,
                closes: bounds.end,
            });
        }

        if !has_signature {
            return Err(AuthorizationFailure::SignatureMissing.into());
        }

        if current.is_some_and(|r| r.locked) {
            return Err(LeaveError::AlreadyConfirmed {
                department: key.department.clone(),
                month: key.month,
            });
        }

        Ok(MonthLockRecord {
            key: key.clone(),
            locked: true,
            locked_at: Some(now),
            locked_by: Some(actor.employee_id),
        })
    }

    /// Locked → Unlocked
    ///
    /// Returns `None` when the month is not locked; there is nothing to write.
    pub fn unlock(
        &self,
        current: Option<&MonthLockRecord>,
        key: &MonthKey,
        actor: &Actor,
    ) -> Result<Option<MonthLockRecord>, LeaveError> {
        if !actor.is_superadmin() {
            return Err(AuthorizationFailure::RoleRequired {
                action: "unlocking a month",
                required: "superadmin",
            }
            .into());
        }
        match current {
            Some(record) if record.locked => Ok(Some(MonthLockRecord::unlocked(key.clone()))),
            _ => Ok(None),
        }
    }

    /// Rejects mutation of a locked department-month by anyone but a superadmin
    pub fn gate(&self, actor: &Actor, record: Option<&MonthLockRecord>) -> Result<(), LeaveError> {
        match record {
            Some(r) if r.locked && !actor.is_superadmin() => Err(AuthorizationFailure::MonthLocked {
                department: r.key.department.clone(),
                month: r.key.month,
            }
            .into()),
            _ => Ok(()),
        }
    }

    pub fn status(&self, key: MonthKey, record: Option<&MonthLockRecord>, today: NaiveDate) -> MonthLockStatus {
        let locked = record.is_some_and(|r| r.locked);
        MonthLockStatus {
            can_confirm: !locked && self.window.is_open(key.month, today),
            locked,
            locked_by: record.and_then(|r| r.locked_by),
            locked_at: record.and_then(|r| r.locked_at),
            key,
        }
    }
}
