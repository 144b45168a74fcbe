//! Approval workflow for leave events
//!
//! ```text
//! Pending ──approve──▶ Approved
//!    │                    │
//!    └──reject/cancel──▶ (deleted) ◀──cancel──┘
//! ```
//!
//! Who may drive each transition depends on the actor's role and on the
//! department of the event.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::actor::Actor;
use crate::category::LeaveCategory;
use crate::employee::Employee;
use crate::error::{AuthorizationFailure, LeaveError};
use crate::event::{ApprovalState, LeaveEvent};

/// A transition requested on an existing event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowAction {
    Approve,
    Reject,
    Cancel,
}

impl WorkflowAction {
    /// Whether the action is defined from `state`
    pub fn permitted_from(&self, state: ApprovalState) -> bool {
        matches!(
            (self, state),
            (WorkflowAction::Approve, ApprovalState::Pending)
                | (WorkflowAction::Reject, ApprovalState::Pending)
                | (WorkflowAction::Cancel, _)
        )
    }

    fn target(&self) -> &'static str {
        match self {
            WorkflowAction::Approve => "approved",
            WorkflowAction::Reject | WorkflowAction::Cancel => "cancelled",
        }
    }
}

impl fmt::Display for WorkflowAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowAction::Approve => f.write_str("approve"),
            WorkflowAction::Reject => f.write_str("reject"),
            WorkflowAction::Cancel => f.write_str("cancel"),
        }
    }
}

/// Role and department rules for event transitions
#[derive(Debug, Clone, Copy)]
pub struct ApprovalWorkflow {
    exempt_category: LeaveCategory,
}

impl Default for ApprovalWorkflow {
    fn default() -> Self {
        Self::new(LeaveCategory::FlexibleShift)
    }
}

impl ApprovalWorkflow {
    pub fn new(exempt_category: LeaveCategory) -> Self {
        Self { exempt_category }
    }

    fn check_exemption(&self, actor: &Actor, category: LeaveCategory) -> Result<(), LeaveError> {
        if actor.is_superadmin() && category == self.exempt_category {
            return Err(AuthorizationFailure::ExemptCategory { category }.into());
        }
        Ok(())
    }

    fn department_failure(actor: &Actor, department: &str, action: &'static str) -> LeaveError {
        if actor.is_admin() {
            AuthorizationFailure::DepartmentMismatch {
                actor_department: actor.department.clone(),
                department: department.to_string(),
            }
            .into()
        } else {
            AuthorizationFailure::RoleRequired {
                action,
                required: "the department's admin",
            }
            .into()
        }
    }

    /// Whether a new event starts out approved
    pub fn starts_approved(&self, actor: &Actor, category: LeaveCategory) -> bool {
        actor.is_admin() || category.has_dedicated_operation()
    }

    /// May `actor` create an event of `category` for `target`?
    ///
    /// Staff book only for themselves, department admins for their own
    /// department, superadmins for anyone.
    pub fn authorize_create(
        &self,
        actor: &Actor,
        target: &Employee,
        category: LeaveCategory,
    ) -> Result<(), LeaveError> {
        self.check_exemption(actor, category)?;
        if target.id == actor.employee_id
            || actor.is_superadmin()
            || actor.administers(&target.department)
        {
            return Ok(());
        }
        Err(Self::department_failure(actor, &target.department, "booking for another employee"))
    }

    /// May `actor` perform `action` on `event`?
    pub fn authorize(
        &self,
        actor: &Actor,
        action: WorkflowAction,
        event: &LeaveEvent,
    ) -> Result<(), LeaveError> {
        if !action.permitted_from(event.state()) {
            return Err(LeaveError::InvalidTransition {
                from: event.state().to_string(),
                to: action.target().to_string(),
            });
        }
        self.check_exemption(actor, event.category)?;

        if actor.is_superadmin() || actor.administers(&event.department) {
            return Ok(());
        }
        match action {
            WorkflowAction::Cancel if event.submitted_by == actor.employee_id => Ok(()),
            WorkflowAction::Cancel => Err(AuthorizationFailure::NotOwner { action: "cancel this entry" }.into()),
            WorkflowAction::Approve => Err(Self::department_failure(actor, &event.department, "approving leave")),
            WorkflowAction::Reject => Err(Self::department_failure(actor, &event.department, "rejecting leave")),
        }
    }

    /// Pending → Approved
    pub fn approve(&self, event: &mut LeaveEvent) -> Result<(), LeaveError> {
        if !WorkflowAction::Approve.permitted_from(event.state()) {
            return Err(LeaveError::InvalidTransition {
                from: event.state().to_string(),
                to: WorkflowAction::Approve.target().to_string(),
            });
        }
        event.approved = true;
        Ok(())
    }
}
