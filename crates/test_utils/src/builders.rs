//! Test Data Builders
//!
//! Builders that default every field tests don't care about. Employee names
//! are generated with `fake` so that unrelated tests never collide on the
//! legacy (name, department) owner key.

use chrono::{DateTime, NaiveDate, Utc};
use fake::faker::name::en::Name;
use fake::Fake;

use core_kernel::{DateRange, EmployeeId, LeaveDays};
use domain_leave::{
    Balances, CategoryPayload, Deduction, Employee, EmploymentStatus, EventOwner, LeaveCategory,
    LeaveEvent,
};

use crate::fixtures::DateFixtures;

/// Builder for employees
pub struct EmployeeBuilder {
    employee: Employee,
}

impl Default for EmployeeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl EmployeeBuilder {
    /// An active ward employee hired in 2019 with no cached balances
    pub fn new() -> Self {
        let name: String = Name().fake();
        Self {
            employee: Employee::new(name, "ward", Some(DateFixtures::veteran_hire())),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.employee.name = name.into();
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.employee.department = department.into();
        self
    }

    pub fn with_hire_date(mut self, hire_date: Option<NaiveDate>) -> Self {
        self.employee.hire_date = hire_date;
        self
    }

    pub fn with_balances(mut self, supplemental: i64, entitled: i64) -> Self {
        self.employee.balances = Balances::new(LeaveDays::whole(supplemental), LeaveDays::whole(entitled));
        self
    }

    pub fn with_pre_system_usage(mut self, days: LeaveDays) -> Self {
        self.employee.pre_system_usage = days;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.employee.status = EmploymentStatus::Inactive;
        self
    }

    pub fn build(self) -> Employee {
        self.employee
    }
}

/// Builder for events seeded straight into a store
pub struct LeaveEventBuilder {
    owner: EventOwner,
    owner_name: String,
    department: String,
    submitted_by: EmployeeId,
    category: LeaveCategory,
    range: DateRange,
    approved: bool,
    payload: CategoryPayload,
    applied: Option<Deduction>,
    created_at: DateTime<Utc>,
}

impl LeaveEventBuilder {
    /// A pending full day for `owner` on the fixture weekday
    pub fn for_employee(owner: &Employee) -> Self {
        Self {
            owner: EventOwner::by_id(owner.id),
            owner_name: owner.name.clone(),
            department: owner.department.clone(),
            submitted_by: owner.id,
            category: LeaveCategory::FullDay,
            range: DateRange::single(DateFixtures::weekday()),
            approved: false,
            payload: CategoryPayload::Plain,
            applied: None,
            created_at: Utc::now(),
        }
    }

    /// Keys the event by (name, department) as rows recorded before
    /// employee ids were stored
    pub fn legacy_owner(mut self) -> Self {
        self.owner = EventOwner::ByName {
            name: self.owner_name.clone(),
            department: self.department.clone(),
        };
        self
    }

    pub fn with_category(mut self, category: LeaveCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_range(mut self, range: DateRange) -> Self {
        self.range = range;
        self
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.range = DateRange::single(date);
        self
    }

    pub fn with_payload(mut self, payload: CategoryPayload) -> Self {
        self.payload = payload;
        self
    }

    pub fn submitted_by(mut self, id: EmployeeId) -> Self {
        self.submitted_by = id;
        self
    }

    pub fn approved(mut self) -> Self {
        self.approved = true;
        self
    }

    /// Approved, with the deduction that approval recorded
    pub fn approved_with(mut self, from_supplemental: LeaveDays, from_entitled: LeaveDays) -> Self {
        self.approved = true;
        self.applied = Some(Deduction {
            from_supplemental,
            from_entitled,
        });
        self
    }

    pub fn build(self) -> LeaveEvent {
        LeaveEvent {
            id: Default::default(),
            owner: self.owner,
            owner_name: self.owner_name,
            submitted_by: self.submitted_by,
            department: self.department,
            category: self.category,
            range: self.range,
            approved: self.approved,
            payload: self.payload,
            applied: self.applied,
            created_at: self.created_at,
        }
    }
}
