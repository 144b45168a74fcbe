//! Read models: balance summaries and calendar visibility

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{EmployeeId, LeaveDays, YearMonth};
use crate::actor::Actor;
use crate::category::LeaveCategory;
use crate::employee::{Balances, Employee};
use crate::event::LeaveEvent;

/// An employee's leave position as of a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    pub employee_id: EmployeeId,
    pub name: String,
    pub department: String,
    pub as_of: NaiveDate,
    /// Entitlement accrued from the hire date
    pub accrued: LeaveDays,
    pub pre_system_usage: LeaveDays,
    /// Consumption of approved events
    pub approved_usage: LeaveDays,
    pub lifetime_grants: LeaveDays,
    /// Remaining balances derived from the totals above
    pub remaining: Balances,
    /// Balances as cached on the employee record
    pub cached: Balances,
}

impl BalanceSummary {
    pub fn total_used(&self) -> LeaveDays {
        self.pre_system_usage + self.approved_usage
    }

    pub fn total_remaining(&self) -> LeaveDays {
        self.remaining.total()
    }

    pub fn cache_matches(&self) -> bool {
        self.remaining == self.cached
    }
}

/// Parameters of a calendar view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarQuery {
    /// Department to show; only honoured for superadmins
    pub department: Option<String>,
    pub month: YearMonth,
    /// Only events the actor owns or submitted
    #[serde(default)]
    pub mine_only: bool,
}

/// Whether `actor` may see `event` on a calendar
///
/// Flex adjustments are private to admins and their owner. Pending
/// requests are shown to admins, the submitter and the owner.
pub fn is_visible_to(actor: &Actor, event: &LeaveEvent) -> bool {
    if actor.is_admin() {
        return true;
    }
    if event.category == LeaveCategory::FlexibleShift {
        return event.owner.employee_id() == Some(actor.employee_id);
    }
    event.approved || event.involves(actor.employee_id)
}

/// Whether `event` belongs on the actor's "mine only" view
pub fn is_mine(actor: &Actor, event: &LeaveEvent, me: Option<&Employee>) -> bool {
    match event.category {
        LeaveCategory::RosterAssignment => me.map_or(
            event.owner.employee_id() == Some(actor.employee_id),
            |e| event.is_owned_by(e),
        ),
        _ => event.involves(actor.employee_id) || me.is_some_and(|e| event.is_owned_by(e)),
    }
}
