//! Supplemental leave grants

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use core_kernel::{EmployeeId, GrantId, LeaveDays};
use crate::employee::Employee;

/// Immutable audit row for one bulk grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantLogEntry {
    pub id: GrantId,
    pub recipients: Vec<EmployeeId>,
    /// "department(name, name), department(name)"
    pub summary: String,
    pub days: LeaveDays,
    pub reason: String,
    pub granted_by: EmployeeId,
    pub effective_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
}

impl GrantLogEntry {
    pub fn new(
        recipients: &[Employee],
        days: LeaveDays,
        reason: impl Into<String>,
        granted_by: EmployeeId,
        effective_date: NaiveDate,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: GrantId::new(),
            recipients: recipients.iter().map(|e| e.id).collect(),
            summary: summarize_recipients(recipients),
            days,
            reason: reason.into(),
            granted_by,
            effective_date,
            recorded_at,
        }
    }

    pub fn names(&self, employee_id: EmployeeId) -> bool {
        self.recipients.contains(&employee_id)
    }
}

/// Groups recipient names by department, departments in sorted order
pub fn summarize_recipients(recipients: &[Employee]) -> String {
    let mut by_department: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for e in recipients {
        by_department.entry(e.department.as_str()).or_default().push(e.name.as_str());
    }
    by_department
        .into_iter()
        .map(|(dept, names)| format!("{}({})", dept, names.join(", ")))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Lifetime supplemental days granted to an employee
pub fn lifetime_total(entries: &[GrantLogEntry], employee_id: EmployeeId) -> LeaveDays {
    entries
        .iter()
        .filter(|entry| entry.names(employee_id))
        .map(|entry| entry.days)
        .sum()
}
