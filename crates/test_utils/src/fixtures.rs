//! Pre-built Test Fixtures
//!
//! Fixed dates and actors for predictable tests. Every date sits in
//! March 2024, whose confirmation window runs from 29 March to 4 April.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::sync::Arc;

use core_kernel::{DateRange, EmployeeId, YearMonth};
use domain_leave::{Actor, Employee, LeavePolicy, MonthKey, Role};

/// The default policy shared by tests
pub static TEST_POLICY: Lazy<Arc<LeavePolicy>> = Lazy::new(|| Arc::new(LeavePolicy::default()));

/// Fixture for calendar data
pub struct DateFixtures;

impl DateFixtures {
    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid fixture date")
    }

    /// 2024-03
    pub fn month() -> YearMonth {
        YearMonth::new(2024, 3).expect("valid fixture month")
    }

    /// Monday 2024-03-04
    pub fn weekday() -> NaiveDate {
        Self::date(2024, 3, 4)
    }

    /// Saturday 2024-03-09
    pub fn saturday() -> NaiveDate {
        Self::date(2024, 3, 9)
    }

    /// 2024-03-04 through 2024-03-06
    pub fn three_days() -> DateRange {
        DateRange::new(Self::date(2024, 3, 4), Self::date(2024, 3, 6)).expect("valid fixture range")
    }

    /// 2024-03-15, outside the March confirmation window
    pub fn mid_month() -> NaiveDate {
        Self::date(2024, 3, 15)
    }

    /// 2024-03-29, first day of the March confirmation window
    pub fn window_open() -> NaiveDate {
        Self::date(2024, 3, 29)
    }

    /// Hire date with several completed years by 2024
    pub fn veteran_hire() -> NaiveDate {
        Self::date(2019, 7, 1)
    }

    /// Hire date in the first year of service as of March 2024
    pub fn recent_hire() -> NaiveDate {
        Self::date(2023, 9, 1)
    }
}

/// Fixture for actors acting on employees
pub struct ActorFixtures;

impl ActorFixtures {
    pub fn staff(employee: &Employee) -> Actor {
        Actor::new(employee.id, employee.department.clone(), Role::Staff)
    }

    pub fn admin(employee: &Employee) -> Actor {
        Actor::new(employee.id, employee.department.clone(), Role::DepartmentAdmin)
    }

    pub fn superadmin(employee: &Employee) -> Actor {
        Actor::new(employee.id, employee.department.clone(), Role::SuperAdmin)
    }

    /// A superadmin with no employee record, sitting in management
    pub fn management_superadmin() -> Actor {
        Actor::new(EmployeeId::new(), "management", Role::SuperAdmin)
    }
}

/// The March fixture month of `department`
pub fn march_key(department: &str) -> MonthKey {
    MonthKey::new(department, DateFixtures::month())
}
