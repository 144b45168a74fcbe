//! Leave policy and department configuration
//!
//! Loaded once at startup and shared read-only by every operation.

use chrono::{Datelike, Weekday};
use serde::{Deserialize, Serialize};

use core_kernel::{DateRange, LeaveDays, Timezone};
use crate::accrual::AccrualPolicy;
use crate::actor::Actor;
use crate::category::LeaveCategory;
use crate::error::LeaveError;
use crate::ledger::DEFAULT_DEBT_FLOOR;
use crate::month_lock::ConfirmationWindow;

/// Organization-wide leave policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeavePolicy {
    pub accrual: AccrualPolicy,
    /// Lowest value the entitled balance may reach
    pub debt_floor: LeaveDays,
    /// Category superadmins may not approve, cancel or create
    pub superadmin_exempt_category: LeaveCategory,
    pub confirmation_window: ConfirmationWindow,
    /// Department tag of the management office; may confirm any month
    pub management_department: String,
    /// Departments that book only Saturday leave on Saturdays
    pub saturday_leave_departments: Vec<String>,
    /// Departments known before any employee is loaded
    pub base_departments: Vec<String>,
    /// Departments whose events show up in every department's view
    pub shared_pools: Vec<String>,
    /// Organization-local timezone for "today"
    pub timezone: Timezone,
    /// Attempts per operation before a stale version is reported
    pub max_commit_attempts: u32,
    /// Largest supplemental grant accepted in one request
    pub max_grant_days: LeaveDays,
}

impl Default for LeavePolicy {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            accrual: AccrualPolicy::default(),
            debt_floor: LeaveDays::whole(DEFAULT_DEBT_FLOOR),
            superadmin_exempt_category: LeaveCategory::FlexibleShift,
            confirmation_window: ConfirmationWindow::default(),
            management_department: "management".to_string(),
            saturday_leave_departments: strings(&[
                "reception",
                "physiotherapy",
                "radiology",
                "claims-review",
                "outpatient",
                "laboratory",
            ]),
            base_departments: strings(&[
                "manual-therapy",
                "physiotherapy",
                "ward",
                "counseling",
                "operating-room",
                "claims-review",
                "reception",
                "outpatient",
                "general-affairs",
                "public-relations",
                "laboratory",
                "radiology",
                "nutrition",
                "medical-staff",
                "executive",
                "pharmacy",
            ]),
            shared_pools: strings(&["medical-staff"]),
            timezone: Timezone::default(),
            max_commit_attempts: 3,
            max_grant_days: LeaveDays::whole(365),
        }
    }
}

impl LeavePolicy {
    pub fn is_saturday_department(&self, department: &str) -> bool {
        self.saturday_leave_departments.iter().any(|d| d == department)
    }

    /// Category rules that depend on the date and the owner's department
    pub fn check_category_for_dates(
        &self,
        category: LeaveCategory,
        range: &DateRange,
        department: &str,
    ) -> Result<(), LeaveError> {
        if category.is_single_day_only() && !range.is_single_day() {
            return Err(LeaveError::validation(format!(
                "'{}' must be booked on a single date",
                category
            )));
        }

        let starts_on_saturday = range.start.weekday() == Weekday::Sat;
        if category == LeaveCategory::SaturdayFullDay && !starts_on_saturday {
            return Err(LeaveError::validation(format!(
                "'{}' can only be booked on a Saturday",
                category
            )));
        }

        if starts_on_saturday
            && self.is_saturday_department(department)
            && !matches!(
                category,
                LeaveCategory::SaturdayFullDay | LeaveCategory::RosterAssignment
            )
        {
            return Err(LeaveError::validation(format!(
                "{} books only '{}' on Saturdays",
                department,
                LeaveCategory::SaturdayFullDay
            )));
        }

        Ok(())
    }
}

/// The department list used by views and selectors
///
/// Built once from the base list plus the departments present in the
/// directory at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentRegistry {
    departments: Vec<String>,
    shared_pools: Vec<String>,
    management: String,
}

impl DepartmentRegistry {
    pub fn new<I, S>(policy: &LeavePolicy, observed: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut departments: Vec<String> = Vec::new();
        let candidates = policy
            .base_departments
            .iter()
            .cloned()
            .chain(observed.into_iter().map(Into::into));
        for dept in candidates {
            let dept = dept.trim().to_string();
            if dept.is_empty() || dept == policy.management_department || departments.contains(&dept) {
                continue;
            }
            departments.push(dept);
        }

        Self {
            departments,
            shared_pools: policy.shared_pools.clone(),
            management: policy.management_department.clone(),
        }
    }

    /// Selectable departments, management office excluded
    pub fn list(&self) -> &[String] {
        &self.departments
    }

    pub fn contains(&self, department: &str) -> bool {
        self.departments.iter().any(|d| d == department)
    }

    pub fn management(&self) -> &str {
        &self.management
    }

    /// Department whose calendar an actor sees
    ///
    /// Superadmins may pick any known department and otherwise land on the
    /// first real department; everyone else sees their own.
    pub fn resolve_view_department(&self, actor: &Actor, requested: Option<&str>) -> String {
        if !actor.is_superadmin() {
            return actor.department.clone();
        }
        match requested {
            Some(dept) if self.contains(dept) => dept.to_string(),
            _ if actor.department != self.management && self.contains(&actor.department) => {
                actor.department.clone()
            }
            _ => self
                .departments
                .first()
                .cloned()
                .unwrap_or_else(|| actor.department.clone()),
        }
    }

    /// Departments whose events appear in `department`'s view
    pub fn visible_from(&self, department: &str) -> Vec<String> {
        let mut visible = vec![department.to_string()];
        for pool in &self.shared_pools {
            if pool != department {
                visible.push(pool.clone());
            }
        }
        visible
    }
}
