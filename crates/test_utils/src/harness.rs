//! Service harness over the in-memory store

use chrono::NaiveDate;
use std::sync::Arc;

use core_kernel::FixedClock;
use domain_leave::ports::mock::InMemoryLeaveStore;
use domain_leave::{Employee, LeavePolicy, LeaveService};

use crate::fixtures::{DateFixtures, TEST_POLICY};

/// A `LeaveService` whose ports all point at one in-memory store
pub struct TestHarness {
    pub store: InMemoryLeaveStore,
    pub service: LeaveService,
}

impl TestHarness {
    /// Harness with the default policy and the clock at the fixture weekday
    pub async fn new(employees: Vec<Employee>) -> Self {
        Self::on(employees, DateFixtures::weekday()).await
    }

    /// Harness whose clock reads `today`
    pub async fn on(employees: Vec<Employee>, today: NaiveDate) -> Self {
        Self::with_policy(employees, today, TEST_POLICY.clone()).await
    }

    pub async fn with_policy(employees: Vec<Employee>, today: NaiveDate, policy: Arc<LeavePolicy>) -> Self {
        let store = InMemoryLeaveStore::with_employees(employees).await;
        let clock = Arc::new(FixedClock::on_local_date(today, &policy.timezone));
        let shared = Arc::new(store.clone());
        let service = LeaveService::bootstrap(shared.clone(), shared.clone(), shared, clock, policy)
            .await
            .expect("bootstrap against the in-memory store");
        Self { store, service }
    }

    /// Current state of an employee in the store
    pub async fn employee(&self, employee: &Employee) -> Employee {
        self.store
            .employee(employee.id)
            .await
            .expect("employee seeded in the harness")
    }
}
