//! Employee records as seen by the leave engine

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use core_kernel::{EmployeeId, LeaveDays};

/// Employment status
///
/// Employees are deactivated rather than deleted while events reference them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Active,
    Inactive,
}

impl EmploymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmploymentStatus::Active => "active",
            EmploymentStatus::Inactive => "inactive",
        }
    }
}

/// The two leave balances of an employee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Balances {
    /// Manually granted days, consumed first; never negative
    pub supplemental: LeaveDays,
    /// Accrued days; may go negative down to the debt floor
    pub entitled: LeaveDays,
}

impl Balances {
    pub fn new(supplemental: LeaveDays, entitled: LeaveDays) -> Self {
        Self { supplemental, entitled }
    }

    pub fn total(&self) -> LeaveDays {
        self.supplemental + self.entitled
    }
}

/// An employee
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
    pub id: EmployeeId,
    pub name: String,
    pub department: String,
    /// `None` when the directory holds no usable hire date
    pub hire_date: Option<NaiveDate>,
    /// Entitled days used before the system went live
    pub pre_system_usage: LeaveDays,
    /// Materialized balance cache
    pub balances: Balances,
    pub status: EmploymentStatus,
    /// Bumped on every balance write
    pub version: i64,
}

impl Employee {
    pub fn new(name: impl Into<String>, department: impl Into<String>, hire_date: Option<NaiveDate>) -> Self {
        Self {
            id: EmployeeId::new(),
            name: name.into(),
            department: department.into(),
            hire_date,
            pre_system_usage: LeaveDays::ZERO,
            balances: Balances::default(),
            status: EmploymentStatus::Active,
            version: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EmploymentStatus::Active
    }

    pub fn belongs_to(&self, department: &str) -> bool {
        self.department == department
    }
}
