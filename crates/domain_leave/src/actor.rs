//! The authenticated caller of an operation

use serde::{Deserialize, Serialize};

use core_kernel::EmployeeId;

/// Role of an actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Staff,
    DepartmentAdmin,
    SuperAdmin,
}

impl Role {
    /// Translates the directory's role flags; superadmin wins over admin
    pub fn from_flags(is_admin: bool, is_superadmin: bool) -> Self {
        match (is_admin, is_superadmin) {
            (_, true) => Role::SuperAdmin,
            (true, false) => Role::DepartmentAdmin,
            (false, false) => Role::Staff,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Staff => "staff",
            Role::DepartmentAdmin => "department_admin",
            Role::SuperAdmin => "superadmin",
        }
    }
}

/// Who is performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub employee_id: EmployeeId,
    pub department: String,
    pub role: Role,
}

impl Actor {
    pub fn new(employee_id: EmployeeId, department: impl Into<String>, role: Role) -> Self {
        Self {
            employee_id,
            department: department.into(),
            role,
        }
    }

    pub fn is_superadmin(&self) -> bool {
        self.role == Role::SuperAdmin
    }

    /// Department admin or superadmin
    pub fn is_admin(&self) -> bool {
        matches!(self.role, Role::DepartmentAdmin | Role::SuperAdmin)
    }

    /// Department admin whose department is `department`
    pub fn administers(&self, department: &str) -> bool {
        self.role == Role::DepartmentAdmin && self.department == department
    }

    /// Superadmin, or admin of `department`
    pub fn can_manage(&self, department: &str) -> bool {
        self.is_superadmin() || self.administers(department)
    }
}
