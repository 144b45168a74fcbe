//! Leave Domain Ports
//!
//! Port interfaces the leave service needs from the outside world:
//!
//! - [`Directory`]: read access to employees
//! - [`EventStore`]: leave events, month locks and the grant log, with an
//!   atomic [`Changeset`] commit
//! - [`SignatureRegistry`]: whether an employee has a signature on file
//!
//! The PostgreSQL adapters live in `infra_db`; an in-memory adapter for
//! tests is available behind the `mock` feature.
//!
//! ```rust,ignore
//! let store = Arc::new(PostgresLeaveStore::new(pool));
//! let service = LeaveService::new(store.clone(), store.clone(), signatures, clock, policy);
//! ```

use async_trait::async_trait;

use core_kernel::{DateRange, DomainPort, EmployeeId, LeaveEventId, PortError};

use crate::employee::{Balances, Employee};
use crate::event::LeaveEvent;
use crate::grant::GrantLogEntry;
use crate::month_lock::{MonthKey, MonthLockRecord};

/// Employee lookup
#[async_trait]
pub trait Directory: DomainPort {
    async fn find_employee(&self, id: EmployeeId) -> Result<Option<Employee>, PortError>;

    async fn find_employee_by_name_and_department(
        &self,
        name: &str,
        department: &str,
    ) -> Result<Option<Employee>, PortError>;

    /// Employees of one department, or everyone when `department` is `None`
    async fn list_employees(&self, department: Option<&str>) -> Result<Vec<Employee>, PortError>;

    /// Looks up an employee, failing with NotFound when absent
    async fn get_employee(&self, id: EmployeeId) -> Result<Employee, PortError> {
        self.find_employee(id)
            .await?
            .ok_or_else(|| PortError::not_found("Employee", id))
    }
}

/// Write to one event
///
/// Updates and deletes only apply while the stored `approved` flag still
/// equals `expected_approved`; otherwise the commit is stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventWrite {
    Insert(LeaveEvent),
    Update {
        event: LeaveEvent,
        expected_approved: bool,
    },
    Delete {
        id: LeaveEventId,
        expected_approved: bool,
    },
}

/// Version check on an employee whose events change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OwnerGuard {
    pub employee_id: EmployeeId,
    pub expected_version: i64,
}

/// Balance cache write guarded by the version read before staging it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BalanceWrite {
    pub employee_id: EmployeeId,
    pub expected_version: i64,
    pub balances: Balances,
}

/// Everything one operation writes, committed all-or-nothing
///
/// The commit fails with [`PortError::StaleVersion`] when any employee's
/// version moved or an updated event changed state, and with
/// [`PortError::PreconditionFailed`] when any month in `require_unlocked`
/// has been locked in the meantime. Every employee named by a balance
/// write or an owner guard has its version bumped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Changeset {
    pub events: Vec<EventWrite>,
    pub balances: Vec<BalanceWrite>,
    pub owners: Vec<OwnerGuard>,
    pub grant: Option<GrantLogEntry>,
    pub require_unlocked: Vec<MonthKey>,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(mut self, event: LeaveEvent) -> Self {
        self.events.push(EventWrite::Insert(event));
        self
    }

    /// Replaces an event that was read with the given `approved` flag
    pub fn update(mut self, event: LeaveEvent, expected_approved: bool) -> Self {
        self.events.push(EventWrite::Update {
            event,
            expected_approved,
        });
        self
    }

    /// Deletes the event as it was read
    pub fn delete(mut self, read: &LeaveEvent) -> Self {
        self.events.push(EventWrite::Delete {
            id: read.id,
            expected_approved: read.approved,
        });
        self
    }

    /// Serializes this commit against other writers for `employee`
    pub fn owner(mut self, employee: &Employee) -> Self {
        if !self.owners.iter().any(|g| g.employee_id == employee.id) {
            self.owners.push(OwnerGuard {
                employee_id: employee.id,
                expected_version: employee.version,
            });
        }
        self
    }

    /// Owner guards not already covered by a balance write
    pub fn version_only_owners(&self) -> impl Iterator<Item = &OwnerGuard> {
        self.owners
            .iter()
            .filter(|g| !self.balances.iter().any(|b| b.employee_id == g.employee_id))
    }

    pub fn balance(mut self, employee: &Employee, balances: Balances) -> Self {
        self.balances.push(BalanceWrite {
            employee_id: employee.id,
            expected_version: employee.version,
            balances,
        });
        self
    }

    pub fn grant(mut self, entry: GrantLogEntry) -> Self {
        self.grant = Some(entry);
        self
    }

    pub fn require_unlocked(mut self, keys: impl IntoIterator<Item = MonthKey>) -> Self {
        self.require_unlocked.extend(keys);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty() && self.balances.is_empty() && self.grant.is_none()
    }
}

/// Persistence for events, month locks and grants
#[async_trait]
pub trait EventStore: DomainPort {
    async fn get_event(&self, id: LeaveEventId) -> Result<Option<LeaveEvent>, PortError>;

    /// Events owned by `employee` (by id, or legacy name and department),
    /// restricted to those intersecting `range` when given
    async fn events_for_owner(
        &self,
        employee: &Employee,
        range: Option<DateRange>,
    ) -> Result<Vec<LeaveEvent>, PortError>;

    /// Events of the given departments intersecting `range`
    async fn events_in_range(
        &self,
        departments: &[String],
        range: DateRange,
    ) -> Result<Vec<LeaveEvent>, PortError>;

    /// Pending events of a department, ordered by start date
    async fn pending_events(&self, department: &str) -> Result<Vec<LeaveEvent>, PortError>;

    /// Events still owned by (name, department)
    async fn legacy_events(&self) -> Result<Vec<LeaveEvent>, PortError>;

    /// Rewrites a legacy owner to an employee id
    async fn reassign_owner(&self, event_id: LeaveEventId, employee_id: EmployeeId) -> Result<(), PortError>;

    async fn commit(&self, changeset: Changeset) -> Result<(), PortError>;

    async fn month_lock(&self, key: &MonthKey) -> Result<Option<MonthLockRecord>, PortError>;

    /// Upserts `record` only if the stored lock state equals `expected_locked`
    /// (a missing record counts as unlocked). Returns whether it was written.
    async fn swap_month_lock(&self, expected_locked: bool, record: MonthLockRecord) -> Result<bool, PortError>;

    /// All grant entries, newest first
    async fn grant_entries(&self) -> Result<Vec<GrantLogEntry>, PortError>;

    /// Grant entries naming `employee_id`, newest first
    async fn grants_for(&self, employee_id: EmployeeId) -> Result<Vec<GrantLogEntry>, PortError>;
}

/// Registered signatures
#[async_trait]
pub trait SignatureRegistry: DomainPort {
    async fn has_signature(&self, employee_id: EmployeeId) -> Result<bool, PortError>;
}

#[cfg(any(test, feature = "mock"))]
pub mod mock {
    use super::*;
    use chrono::Utc;
    use core_kernel::{AdapterHealth, HealthCheckResult, HealthCheckable};
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tokio::sync::RwLock;

    #[derive(Debug, Default)]
    struct StoreState {
        employees: HashMap<EmployeeId, Employee>,
        events: HashMap<LeaveEventId, LeaveEvent>,
        locks: HashMap<MonthKey, MonthLockRecord>,
        grants: Vec<GrantLogEntry>,
        signatures: HashSet<EmployeeId>,
    }

    /// In-memory store implementing every leave port
    ///
    /// All state sits behind one lock so a commit is atomic.
    #[derive(Debug, Default, Clone)]
    pub struct InMemoryLeaveStore {
        state: Arc<RwLock<StoreState>>,
        fail_next_commit: Arc<AtomicBool>,
        stale_commits: Arc<AtomicUsize>,
        commits: Arc<AtomicUsize>,
    }

    impl InMemoryLeaveStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Pre-populates with employees
        pub async fn with_employees(employees: Vec<Employee>) -> Self {
            let store = Self::new();
            for employee in employees {
                store.insert_employee(employee).await;
            }
            store
        }

        pub async fn insert_employee(&self, employee: Employee) {
            self.state.write().await.employees.insert(employee.id, employee);
        }

        /// Seeds an event directly, bypassing every rule
        pub async fn insert_event(&self, event: LeaveEvent) {
            self.state.write().await.events.insert(event.id, event);
        }

        pub async fn register_signature(&self, employee_id: EmployeeId) {
            self.state.write().await.signatures.insert(employee_id);
        }

        /// Changes an employee's cached balances and bumps the version, as a
        /// concurrent writer would
        pub async fn touch_employee(&self, employee_id: EmployeeId, balances: Balances) {
            if let Some(e) = self.state.write().await.employees.get_mut(&employee_id) {
                e.balances = balances;
                e.version += 1;
            }
        }

        /// Makes the next commit fail with an internal error
        pub fn fail_next_commit(&self) {
            self.fail_next_commit.store(true, Ordering::SeqCst);
        }

        /// Makes the next commit fail as if another writer had moved an
        /// employee's version in between
        pub fn stale_next_commit(&self) {
            self.stale_next_commits(1);
        }

        /// Makes the next `count` commits fail as stale
        pub fn stale_next_commits(&self, count: usize) {
            self.stale_commits.store(count, Ordering::SeqCst);
        }

        /// Number of successful commits
        pub fn commit_count(&self) -> usize {
            self.commits.load(Ordering::SeqCst)
        }

        pub async fn all_events(&self) -> Vec<LeaveEvent> {
            self.state.read().await.events.values().cloned().collect()
        }

        pub async fn employee(&self, id: EmployeeId) -> Option<Employee> {
            self.state.read().await.employees.get(&id).cloned()
        }
    }

    impl DomainPort for InMemoryLeaveStore {}

    #[async_trait]
    impl HealthCheckable for InMemoryLeaveStore {
        async fn health_check(&self) -> HealthCheckResult {
            HealthCheckResult {
                adapter_id: "in-memory-leave-store".to_string(),
                status: AdapterHealth::Healthy,
                latency_ms: 0,
                message: Some("In-memory store always healthy".to_string()),
                checked_at: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl Directory for InMemoryLeaveStore {
        async fn find_employee(&self, id: EmployeeId) -> Result<Option<Employee>, PortError> {
            Ok(self.state.read().await.employees.get(&id).cloned())
        }

        async fn find_employee_by_name_and_department(
            &self,
            name: &str,
            department: &str,
        ) -> Result<Option<Employee>, PortError> {
            Ok(self
                .state
                .read()
                .await
                .employees
                .values()
                .find(|e| e.name == name && e.department == department)
                .cloned())
        }

        async fn list_employees(&self, department: Option<&str>) -> Result<Vec<Employee>, PortError> {
            let state = self.state.read().await;
            let mut employees: Vec<_> = state
                .employees
                .values()
                .filter(|e| department.map_or(true, |d| e.department == d))
                .cloned()
                .collect();
            employees.sort_by(|a, b| a.name.cmp(&b.name));
            Ok(employees)
        }
    }

    #[async_trait]
    impl EventStore for InMemoryLeaveStore {
        async fn get_event(&self, id: LeaveEventId) -> Result<Option<LeaveEvent>, PortError> {
            Ok(self.state.read().await.events.get(&id).cloned())
        }

        async fn events_for_owner(
            &self,
            employee: &Employee,
            range: Option<DateRange>,
        ) -> Result<Vec<LeaveEvent>, PortError> {
            let state = self.state.read().await;
            let mut events: Vec<_> = state
                .events
                .values()
                .filter(|ev| ev.is_owned_by(employee))
                .filter(|ev| range.map_or(true, |r| ev.range.intersects(&r)))
                .cloned()
                .collect();
            events.sort_by_key(|ev| ev.range.start);
            Ok(events)
        }

        async fn events_in_range(
            &self,
            departments: &[String],
            range: DateRange,
        ) -> Result<Vec<LeaveEvent>, PortError> {
            let state = self.state.read().await;
            let mut events: Vec<_> = state
                .events
                .values()
                .filter(|ev| departments.contains(&ev.department) && ev.range.intersects(&range))
                .cloned()
                .collect();
            events.sort_by_key(|ev| (ev.range.start, ev.created_at));
            Ok(events)
        }

        async fn pending_events(&self, department: &str) -> Result<Vec<LeaveEvent>, PortError> {
            let state = self.state.read().await;
            let mut events: Vec<_> = state
                .events
                .values()
                .filter(|ev| !ev.approved && ev.department == department)
                .cloned()
                .collect();
            events.sort_by_key(|ev| (ev.range.start, ev.created_at));
            Ok(events)
        }

        async fn legacy_events(&self) -> Result<Vec<LeaveEvent>, PortError> {
            let state = self.state.read().await;
            Ok(state.events.values().filter(|ev| ev.owner.is_legacy()).cloned().collect())
        }

        async fn reassign_owner(&self, event_id: LeaveEventId, employee_id: EmployeeId) -> Result<(), PortError> {
            let mut state = self.state.write().await;
            let event = state
                .events
                .get_mut(&event_id)
                .ok_or_else(|| PortError::not_found("LeaveEvent", event_id))?;
            event.owner = crate::event::EventOwner::by_id(employee_id);
            Ok(())
        }

        async fn commit(&self, changeset: Changeset) -> Result<(), PortError> {
            if self.fail_next_commit.swap(false, Ordering::SeqCst) {
                return Err(PortError::internal("injected commit failure"));
            }
            let stale = self
                .stale_commits
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if stale {
                return Err(PortError::stale("Employee", "concurrent writer"));
            }

            let mut state = self.state.write().await;

            for key in &changeset.require_unlocked {
                if state.locks.get(key).is_some_and(|r| r.locked) {
                    return Err(PortError::precondition(format!("{} is locked", key)));
                }
            }
            let guards = changeset
                .balances
                .iter()
                .map(|b| (b.employee_id, b.expected_version))
                .chain(changeset.version_only_owners().map(|g| (g.employee_id, g.expected_version)));
            for (employee_id, expected_version) in guards {
                let employee = state
                    .employees
                    .get(&employee_id)
                    .ok_or_else(|| PortError::not_found("Employee", employee_id))?;
                if employee.version != expected_version {
                    return Err(PortError::stale("Employee", employee_id));
                }
            }
            for write in &changeset.events {
                let (id, expected_approved) = match write {
                    EventWrite::Insert(_) => continue,
                    EventWrite::Update { event, expected_approved } => (event.id, *expected_approved),
                    EventWrite::Delete { id, expected_approved } => (*id, *expected_approved),
                };
                match state.events.get(&id) {
                    None => return Err(PortError::not_found("LeaveEvent", id)),
                    Some(stored) if stored.approved != expected_approved => {
                        return Err(PortError::stale("LeaveEvent", id));
                    }
                    Some(_) => {}
                }
            }

            let owner_ids: Vec<EmployeeId> =
                changeset.version_only_owners().map(|g| g.employee_id).collect();
            for id in owner_ids {
                if let Some(employee) = state.employees.get_mut(&id) {
                    employee.version += 1;
                }
            }
            for write in changeset.balances {
                if let Some(employee) = state.employees.get_mut(&write.employee_id) {
                    employee.balances = write.balances;
                    employee.version += 1;
                }
            }
            for write in changeset.events {
                match write {
                    EventWrite::Insert(event) | EventWrite::Update { event, .. } => {
                        state.events.insert(event.id, event);
                    }
                    EventWrite::Delete { id, .. } => {
                        state.events.remove(&id);
                    }
                }
            }
            if let Some(entry) = changeset.grant {
                state.grants.push(entry);
            }

            self.commits.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn month_lock(&self, key: &MonthKey) -> Result<Option<MonthLockRecord>, PortError> {
            Ok(self.state.read().await.locks.get(key).cloned())
        }

        async fn swap_month_lock(&self, expected_locked: bool, record: MonthLockRecord) -> Result<bool, PortError> {
            let mut state = self.state.write().await;
            let current = state.locks.get(&record.key).is_some_and(|r| r.locked);
            if current != expected_locked {
                return Ok(false);
            }
            state.locks.insert(record.key.clone(), record);
            Ok(true)
        }

        async fn grant_entries(&self) -> Result<Vec<GrantLogEntry>, PortError> {
            let mut entries = self.state.read().await.grants.clone();
            entries.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
            Ok(entries)
        }

        async fn grants_for(&self, employee_id: EmployeeId) -> Result<Vec<GrantLogEntry>, PortError> {
            Ok(self
                .grant_entries()
                .await?
                .into_iter()
                .filter(|entry| entry.names(employee_id))
                .collect())
        }
    }

    #[async_trait]
    impl SignatureRegistry for InMemoryLeaveStore {
        async fn has_signature(&self, employee_id: EmployeeId) -> Result<bool, PortError> {
            Ok(self.state.read().await.signatures.contains(&employee_id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::InMemoryLeaveStore;
    use super::*;
    use core_kernel::{HealthCheckable, LeaveDays, YearMonth};

    #[tokio::test]
    async fn test_commit_rejects_stale_version() {
        let employee = Employee::new("Shin Yejin", "ward", None);
        let store = InMemoryLeaveStore::with_employees(vec![employee.clone()]).await;
        store
            .touch_employee(employee.id, Balances::new(LeaveDays::whole(1), LeaveDays::ZERO))
            .await;

        let err = store
            .commit(Changeset::new().balance(&employee, Balances::default()))
            .await
            .unwrap_err();
        assert!(err.is_stale());
    }

    #[tokio::test]
    async fn test_commit_checks_month_locks() {
        let store = InMemoryLeaveStore::new();
        let key = MonthKey::new("ward", YearMonth::new(2024, 3).unwrap());
        let mut record = MonthLockRecord::unlocked(key.clone());
        record.locked = true;
        assert!(store.swap_month_lock(false, record.clone()).await.unwrap());
        assert!(!store.swap_month_lock(false, record).await.unwrap());

        let err = store
            .commit(Changeset::new().require_unlocked([key]))
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::PreconditionFailed { .. }));
    }

    fn pending_event(owner: &Employee) -> LeaveEvent {
        let day = chrono::NaiveDate::from_ymd_opt(2024, 3, 12).unwrap();
        LeaveEvent::new(
            owner,
            owner.id,
            crate::category::LeaveCategory::Sick,
            DateRange::single(day),
            crate::category::CategoryPayload::Plain,
            chrono::Utc::now(),
        )
    }

    #[tokio::test]
    async fn test_owner_guard_serializes_inserts_without_balance_change() {
        let employee = Employee::new("Shin Yejin", "ward", None);
        let store = InMemoryLeaveStore::with_employees(vec![employee.clone()]).await;

        let first = Changeset::new().insert(pending_event(&employee)).owner(&employee);
        let second = Changeset::new().insert(pending_event(&employee)).owner(&employee);
        store.commit(first).await.unwrap();
        let err = store.commit(second).await.unwrap_err();

        assert!(err.is_stale());
        assert_eq!(store.all_events().await.len(), 1);
        assert_eq!(store.employee(employee.id).await.unwrap().version, employee.version + 1);
    }

    #[tokio::test]
    async fn test_balance_write_covers_owner_guard() {
        let employee = Employee::new("Shin Yejin", "ward", None);
        let store = InMemoryLeaveStore::with_employees(vec![employee.clone()]).await;

        let changeset = Changeset::new()
            .owner(&employee)
            .balance(&employee, Balances::new(LeaveDays::ZERO, LeaveDays::whole(3)));
        assert_eq!(changeset.version_only_owners().count(), 0);
        store.commit(changeset).await.unwrap();
        assert_eq!(store.employee(employee.id).await.unwrap().version, employee.version + 1);
    }

    #[tokio::test]
    async fn test_delete_of_changed_event_is_stale() {
        let employee = Employee::new("Shin Yejin", "ward", None);
        let store = InMemoryLeaveStore::with_employees(vec![employee.clone()]).await;
        let read = pending_event(&employee);
        let mut approved = read.clone();
        approved.approved = true;
        store.insert_event(approved).await;

        let err = store.commit(Changeset::new().delete(&read)).await.unwrap_err();
        assert!(err.is_stale());
        assert_eq!(store.all_events().await.len(), 1);

        let err = store
            .commit(Changeset::new().update(read.clone(), false))
            .await
            .unwrap_err();
        assert!(err.is_stale());
    }

    #[tokio::test]
    async fn test_get_employee_not_found() {
        let store = InMemoryLeaveStore::new();
        let err = store.get_employee(EmployeeId::new()).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_health_check() {
        let store = InMemoryLeaveStore::new();
        let result = store.health_check().await;
        assert_eq!(result.status, core_kernel::AdapterHealth::Healthy);
    }
}
