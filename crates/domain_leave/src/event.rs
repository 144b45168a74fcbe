//! Leave event aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use core_kernel::{DateRange, EmployeeId, LeaveDays, LeaveEventId, YearMonth};
use crate::category::{CategoryPayload, LeaveCategory};
use crate::employee::Employee;
use crate::ledger::Deduction;

/// Who an event belongs to
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventOwner {
    ById {
        employee_id: EmployeeId,
    },
    /// Rows recorded before events referenced employees by id
    ByName {
        name: String,
        department: String,
    },
}

impl EventOwner {
    pub fn by_id(employee_id: EmployeeId) -> Self {
        EventOwner::ById { employee_id }
    }

    pub fn employee_id(&self) -> Option<EmployeeId> {
        match self {
            EventOwner::ById { employee_id } => Some(*employee_id),
            EventOwner::ByName { .. } => None,
        }
    }

    /// True when this owner denotes `employee`, either by id or by the
    /// legacy (name, department) pair
    pub fn refers_to(&self, employee: &Employee) -> bool {
        match self {
            EventOwner::ById { employee_id } => *employee_id == employee.id,
            EventOwner::ByName { name, department } => {
                *name == employee.name && *department == employee.department
            }
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, EventOwner::ByName { .. })
    }
}

/// Approval state of a stored event
///
/// Cancellation deletes the event, so it has no stored state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Pending,
    Approved,
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalState::Pending => f.write_str("pending"),
            ApprovalState::Approved => f.write_str("approved"),
        }
    }
}

/// A leave, roster, flex or note entry on the calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaveEvent {
    pub id: LeaveEventId,
    pub owner: EventOwner,
    /// Owner's display name when the event was recorded
    pub owner_name: String,
    pub submitted_by: EmployeeId,
    /// Owner's department when the event was recorded
    pub department: String,
    pub category: LeaveCategory,
    pub range: DateRange,
    pub approved: bool,
    pub payload: CategoryPayload,
    /// What approval took from the balances, if anything
    pub applied: Option<Deduction>,
    pub created_at: DateTime<Utc>,
}

impl LeaveEvent {
    /// Builds a new event for `owner`
    pub fn new(
        owner: &Employee,
        submitted_by: EmployeeId,
        category: LeaveCategory,
        range: DateRange,
        payload: CategoryPayload,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: LeaveEventId::new_v7(),
            owner: EventOwner::by_id(owner.id),
            owner_name: owner.name.clone(),
            submitted_by,
            department: owner.department.clone(),
            category,
            range,
            approved: false,
            payload,
            applied: None,
            created_at,
        }
    }

    pub fn state(&self) -> ApprovalState {
        if self.approved {
            ApprovalState::Approved
        } else {
            ApprovalState::Pending
        }
    }

    /// Calendar months the event touches
    pub fn months(&self) -> Vec<YearMonth> {
        self.range.months()
    }

    /// Days this event consumes once approved: its category weight, once
    pub fn nominal_consumption(&self) -> LeaveDays {
        self.category.consumption_weight()
    }

    /// Days actually charged against balances
    pub fn charged(&self) -> LeaveDays {
        self.applied.map(|d| d.total()).unwrap_or(LeaveDays::ZERO)
    }

    /// Days this event counts as used: what was charged, or the nominal
    /// consumption for approved rows recorded without a deduction
    pub fn consumed(&self) -> LeaveDays {
        match (self.approved, self.applied) {
            (false, _) => LeaveDays::ZERO,
            (true, Some(deduction)) => deduction.total(),
            (true, None) => self.nominal_consumption(),
        }
    }

    pub fn is_owned_by(&self, employee: &Employee) -> bool {
        self.owner.refers_to(employee)
    }

    /// Owned by, or submitted by, the given employee id
    pub fn involves(&self, employee_id: EmployeeId) -> bool {
        self.submitted_by == employee_id || self.owner.employee_id() == Some(employee_id)
    }
}
