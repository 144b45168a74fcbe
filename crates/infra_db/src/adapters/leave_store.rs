//! PostgreSQL Leave Store
//!
//! Implements the leave domain's `Directory`, `EventStore` and
//! `SignatureRegistry` ports on top of the repositories.
//!
//! A `Changeset` commits inside one transaction: month guards are checked
//! under a share lock, every employee whose balances or events change has
//! its row re-read `FOR UPDATE` with a version compare, and only then are
//! events (updates and deletes conditional on the `approved` flag read) and
//! the grant entry written. Any failure rolls the whole transaction back.
//!
//! ```rust,ignore
//! let store = Arc::new(PostgresLeaveStore::new(pool));
//! let service = LeaveService::bootstrap(store.clone(), store.clone(), store.clone(), clock, policy).await?;
//! ```

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use tracing::{debug, instrument, warn};

use core_kernel::{
    AdapterHealth, DateRange, DomainPort, EmployeeId, GrantId, HealthCheckResult, HealthCheckable,
    LeaveDays, LeaveEventId, PortError, YearMonth,
};
use domain_leave::ports::{Changeset, Directory, EventStore, EventWrite, SignatureRegistry};
use domain_leave::{
    Balances, CategoryPayload, Deduction, Employee, EmploymentStatus, EventOwner, GrantLogEntry,
    LeaveCategory, LeaveEvent, MonthKey, MonthLockRecord,
};

use crate::error::{into_port_error, DatabaseError};
use crate::repositories::{
    EmployeeRepository, EmployeeRow, GrantRepository, GrantRow, LeaveEventRepository, LeaveEventRow,
    MonthLockRepository, MonthLockRow, NewEmployee,
};

const ADAPTER_ID: &str = "postgres-leave-store";

/// PostgreSQL-backed implementation of the leave ports
#[derive(Debug, Clone)]
pub struct PostgresLeaveStore {
    pool: PgPool,
    employees: EmployeeRepository,
    events: LeaveEventRepository,
    locks: MonthLockRepository,
    grants: GrantRepository,
}

impl PostgresLeaveStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            employees: EmployeeRepository::new(pool.clone()),
            events: LeaveEventRepository::new(pool.clone()),
            locks: MonthLockRepository::new(pool.clone()),
            grants: GrantRepository::new(pool.clone()),
            pool,
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Inserts or replaces an employee record, with role flags and an
    /// optional signature file path
    #[instrument(skip(self, employee), fields(employee_id = %employee.id))]
    pub async fn save_employee(
        &self,
        employee: &Employee,
        is_admin: bool,
        is_superadmin: bool,
        signature_path: Option<String>,
    ) -> Result<(), PortError> {
        let row = NewEmployee {
            employee_id: (*employee.id.as_uuid()),
            name: employee.name.clone(),
            department: employee.department.clone(),
            hire_date: employee.hire_date,
            pre_system_usage: employee.pre_system_usage.value(),
            supplemental_days: employee.balances.supplemental.value(),
            entitled_days: employee.balances.entitled.value(),
            status: employee.status.as_str().to_string(),
            is_admin,
            is_superadmin,
            signature_path,
        };
        self.employees.upsert(&row).await.map_err(into_port_error)
    }

    /// Role flags stored for an employee, as `(is_admin, is_superadmin)`
    pub async fn role_flags(&self, id: EmployeeId) -> Result<Option<(bool, bool)>, PortError> {
        let row = self
            .employees
            .find_by_id(*id.as_uuid())
            .await
            .map_err(into_port_error)?;
        Ok(row.map(|r| (r.is_admin, r.is_superadmin)))
    }

    async fn apply(&self, changeset: Changeset) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        for key in &changeset.require_unlocked {
            let (year, month) = month_columns(key.month);
            MonthLockRepository::ensure_unlocked(&mut tx, &key.department, year, month).await?;
        }

        for write in &changeset.balances {
            EmployeeRepository::update_balances(
                &mut tx,
                *write.employee_id.as_uuid(),
                write.expected_version,
                write.balances.supplemental.value(),
                write.balances.entitled.value(),
            )
            .await?;
        }

        for guard in changeset.version_only_owners() {
            EmployeeRepository::claim_version(&mut tx, *guard.employee_id.as_uuid(), guard.expected_version)
                .await?;
        }

        for write in &changeset.events {
            match write {
                EventWrite::Insert(event) => {
                    LeaveEventRepository::insert(&mut tx, &event_to_row(event)?).await?
                }
                EventWrite::Update {
                    event,
                    expected_approved,
                } => {
                    LeaveEventRepository::update(&mut tx, &event_to_row(event)?, *expected_approved)
                        .await?
                }
                EventWrite::Delete {
                    id,
                    expected_approved,
                } => LeaveEventRepository::delete(&mut tx, *id.as_uuid(), *expected_approved).await?,
            }
        }

        if let Some(entry) = &changeset.grant {
            GrantRepository::insert(&mut tx, &grant_to_row(entry)).await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

impl DomainPort for PostgresLeaveStore {}

#[async_trait]
impl HealthCheckable for PostgresLeaveStore {
    async fn health_check(&self) -> HealthCheckResult {
        let start = std::time::Instant::now();
        let result = sqlx::query_scalar::<_, i32>("SELECT 1").fetch_one(&self.pool).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        let (status, message) = match result {
            Ok(_) => (AdapterHealth::Healthy, None),
            Err(e) => (AdapterHealth::Unhealthy, Some(format!("Database error: {}", e))),
        };
        HealthCheckResult {
            adapter_id: ADAPTER_ID.to_string(),
            status,
            latency_ms,
            message,
            checked_at: Utc::now(),
        }
    }
}

#[async_trait]
impl Directory for PostgresLeaveStore {
    #[instrument(skip(self), fields(employee_id = %id))]
    async fn find_employee(&self, id: EmployeeId) -> Result<Option<Employee>, PortError> {
        self.employees
            .find_by_id(*id.as_uuid())
            .await
            .map_err(into_port_error)?
            .map(row_to_employee)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn find_employee_by_name_and_department(
        &self,
        name: &str,
        department: &str,
    ) -> Result<Option<Employee>, PortError> {
        self.employees
            .find_by_name_and_department(name, department)
            .await
            .map_err(into_port_error)?
            .map(row_to_employee)
            .transpose()
    }

    #[instrument(skip(self))]
    async fn list_employees(&self, department: Option<&str>) -> Result<Vec<Employee>, PortError> {
        self.employees
            .list(department)
            .await
            .map_err(into_port_error)?
            .into_iter()
            .map(row_to_employee)
            .collect()
    }
}

#[async_trait]
impl EventStore for PostgresLeaveStore {
    #[instrument(skip(self), fields(event_id = %id))]
    async fn get_event(&self, id: LeaveEventId) -> Result<Option<LeaveEvent>, PortError> {
        self.events
            .get(*id.as_uuid())
            .await
            .map_err(into_port_error)?
            .map(row_to_event)
            .transpose()
    }

    #[instrument(skip(self, employee), fields(employee_id = %employee.id))]
    async fn events_for_owner(
        &self,
        employee: &Employee,
        range: Option<DateRange>,
    ) -> Result<Vec<LeaveEvent>, PortError> {
        self.events
            .for_owner(
                *employee.id.as_uuid(),
                &employee.name,
                &employee.department,
                range.map(|r| (r.start, r.end)),
            )
            .await
            .map_err(into_port_error)?
            .into_iter()
            .map(row_to_event)
            .collect()
    }

    #[instrument(skip(self), fields(range = %range))]
    async fn events_in_range(
        &self,
        departments: &[String],
        range: DateRange,
    ) -> Result<Vec<LeaveEvent>, PortError> {
        self.events
            .in_range(departments, range.start, range.end)
            .await
            .map_err(into_port_error)?
            .into_iter()
            .map(row_to_event)
            .collect()
    }

    async fn pending_events(&self, department: &str) -> Result<Vec<LeaveEvent>, PortError> {
        self.events
            .pending(department)
            .await
            .map_err(into_port_error)?
            .into_iter()
            .map(row_to_event)
            .collect()
    }

    async fn legacy_events(&self) -> Result<Vec<LeaveEvent>, PortError> {
        self.events
            .legacy()
            .await
            .map_err(into_port_error)?
            .into_iter()
            .map(row_to_event)
            .collect()
    }

    async fn reassign_owner(&self, event_id: LeaveEventId, employee_id: EmployeeId) -> Result<(), PortError> {
        self.events
            .reassign_owner(*event_id.as_uuid(), *employee_id.as_uuid())
            .await
            .map_err(into_port_error)
    }

    #[instrument(
        skip(self, changeset),
        fields(
            events = changeset.events.len(),
            balances = changeset.balances.len(),
            guarded_months = changeset.require_unlocked.len()
        )
    )]
    async fn commit(&self, changeset: Changeset) -> Result<(), PortError> {
        if changeset.is_empty() {
            return Ok(());
        }
        match self.apply(changeset).await {
            Ok(()) => {
                debug!("Changeset committed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Changeset rolled back");
                Err(into_port_error(e))
            }
        }
    }

    async fn month_lock(&self, key: &MonthKey) -> Result<Option<MonthLockRecord>, PortError> {
        let (year, month) = month_columns(key.month);
        self.locks
            .get(&key.department, year, month)
            .await
            .map_err(into_port_error)?
            .map(row_to_lock)
            .transpose()
    }

    #[instrument(skip(self, record), fields(key = %record.key, locked = record.locked))]
    async fn swap_month_lock(&self, expected_locked: bool, record: MonthLockRecord) -> Result<bool, PortError> {
        self.locks
            .swap(expected_locked, &lock_to_row(&record))
            .await
            .map_err(into_port_error)
    }

    async fn grant_entries(&self) -> Result<Vec<GrantLogEntry>, PortError> {
        self.grants
            .list()
            .await
            .map_err(into_port_error)
            .map(|rows| rows.into_iter().map(row_to_grant).collect())
    }

    async fn grants_for(&self, employee_id: EmployeeId) -> Result<Vec<GrantLogEntry>, PortError> {
        self.grants
            .for_recipient(*employee_id.as_uuid())
            .await
            .map_err(into_port_error)
            .map(|rows| rows.into_iter().map(row_to_grant).collect())
    }
}

#[async_trait]
impl SignatureRegistry for PostgresLeaveStore {
    async fn has_signature(&self, employee_id: EmployeeId) -> Result<bool, PortError> {
        self.employees
            .has_signature(*employee_id.as_uuid())
            .await
            .map_err(into_port_error)
    }
}

// ============================================================================
// Row conversions
// ============================================================================

fn month_columns(month: YearMonth) -> (i32, i32) {
    (month.year, month.month as i32)
}

fn row_to_employee(row: EmployeeRow) -> Result<Employee, PortError> {
    let status = match row.status.as_str() {
        "active" => EmploymentStatus::Active,
        "inactive" => EmploymentStatus::Inactive,
        other => {
            return Err(PortError::transformation(format!(
                "unknown employment status '{}' for employee {}",
                other, row.employee_id
            )))
        }
    };
    Ok(Employee {
        id: EmployeeId::from_uuid(row.employee_id),
        name: row.name,
        department: row.department,
        hire_date: row.hire_date,
        pre_system_usage: LeaveDays::new(row.pre_system_usage),
        balances: Balances::new(LeaveDays::new(row.supplemental_days), LeaveDays::new(row.entitled_days)),
        status,
        version: row.version,
    })
}

fn row_to_event(row: LeaveEventRow) -> Result<LeaveEvent, PortError> {
    let category: LeaveCategory = row.category.parse().map_err(PortError::transformation)?;
    let payload: CategoryPayload = serde_json::from_value(row.payload)
        .map_err(|e| PortError::transformation(format!("event {} payload: {}", row.event_id, e)))?;
    let range = DateRange::new(row.start_date, row.end_date)
        .map_err(|e| PortError::transformation(e.to_string()))?;
    let owner = match row.owner_employee_id {
        Some(id) => EventOwner::by_id(EmployeeId::from_uuid(id)),
        None => EventOwner::ByName {
            name: row.owner_name.clone(),
            department: row.department.clone(),
        },
    };
    let applied = match (row.applied_supplemental, row.applied_entitled) {
        (Some(supplemental), Some(entitled)) => Some(Deduction {
            from_supplemental: LeaveDays::new(supplemental),
            from_entitled: LeaveDays::new(entitled),
        }),
        _ => None,
    };

    Ok(LeaveEvent {
        id: LeaveEventId::from_uuid(row.event_id),
        owner,
        owner_name: row.owner_name,
        submitted_by: EmployeeId::from_uuid(row.submitted_by),
        department: row.department,
        category,
        range,
        approved: row.approved,
        payload,
        applied,
        created_at: row.created_at,
    })
}

fn event_to_row(event: &LeaveEvent) -> Result<LeaveEventRow, DatabaseError> {
    let payload = serde_json::to_value(&event.payload)
        .map_err(|e| DatabaseError::SerializationError(e.to_string()))?;
    Ok(LeaveEventRow {
        event_id: *event.id.as_uuid(),
        owner_employee_id: event.owner.employee_id().map(|id| *id.as_uuid()),
        owner_name: event.owner_name.clone(),
        submitted_by: *event.submitted_by.as_uuid(),
        department: event.department.clone(),
        category: event.category.as_str().to_string(),
        start_date: event.range.start,
        end_date: event.range.end,
        approved: event.approved,
        payload,
        applied_supplemental: event.applied.map(|d| d.from_supplemental.value()),
        applied_entitled: event.applied.map(|d| d.from_entitled.value()),
        created_at: event.created_at,
    })
}

fn row_to_lock(row: MonthLockRow) -> Result<MonthLockRecord, PortError> {
    let month = u32::try_from(row.month)
        .ok()
        .and_then(|m| YearMonth::new(row.year, m).ok())
        .ok_or_else(|| {
            PortError::transformation(format!("invalid lock month {}-{}", row.year, row.month))
        })?;
    Ok(MonthLockRecord {
        key: MonthKey::new(row.department, month),
        locked: row.locked,
        locked_at: row.locked_at,
        locked_by: row.locked_by.map(EmployeeId::from_uuid),
    })
}

fn lock_to_row(record: &MonthLockRecord) -> MonthLockRow {
    let (year, month) = month_columns(record.key.month);
    MonthLockRow {
        department: record.key.department.clone(),
        year,
        month,
        locked: record.locked,
        locked_at: record.locked_at,
        locked_by: record.locked_by.map(|id| *id.as_uuid()),
    }
}

fn row_to_grant(row: GrantRow) -> GrantLogEntry {
    GrantLogEntry {
        id: GrantId::from_uuid(row.grant_id),
        recipients: row.recipients.into_iter().map(EmployeeId::from_uuid).collect(),
        summary: row.summary,
        days: LeaveDays::new(row.days),
        reason: row.reason,
        granted_by: EmployeeId::from_uuid(row.granted_by),
        effective_date: row.effective_date,
        recorded_at: row.recorded_at,
    }
}

fn grant_to_row(entry: &GrantLogEntry) -> GrantRow {
    GrantRow {
        grant_id: *entry.id.as_uuid(),
        recipients: entry.recipients.iter().map(|id| *id.as_uuid()).collect(),
        summary: entry.summary.clone(),
        days: entry.days.value(),
        reason: entry.reason.clone(),
        granted_by: *entry.granted_by.as_uuid(),
        effective_date: entry.effective_date,
        recorded_at: entry.recorded_at,
    }
}
