//! Leave service
//!
//! Orchestrates the accrual calculator, ledger, overlap guard, approval
//! workflow and month lock against the directory and event store.
//!
//! Every mutating operation follows the same shape: take the in-process
//! lock for the employee (or month key), read fresh state, run the rules,
//! stage ledger changes on a copy of the balances, and commit one
//! [`Changeset`]. A commit rejected for a stale employee version is retried
//! from a fresh read up to `max_commit_attempts` times. Nothing staged
//! survives a failed commit.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use core_kernel::{
    Clock, DateRange, EmployeeId, LeaveDays, LeaveEventId, PortError, YearMonth,
};

use crate::accrual::AccrualCalculator;
use crate::actor::Actor;
use crate::category::{CategoryPayload, LeaveCategory};
use crate::employee::{Balances, Employee};
use crate::error::{AuthorizationFailure, ErrorKind, LeaveError};
use crate::event::{EventOwner, LeaveEvent};
use crate::grant::{self, GrantLogEntry};
use crate::ledger::{Deduction, LeaveLedger};
use crate::locks::KeyedLocks;
use crate::month_lock::{MonthKey, MonthLock, MonthLockRecord, MonthLockStatus};
use crate::overlap::OverlapGuard;
use crate::policy::{DepartmentRegistry, LeavePolicy};
use crate::ports::{Changeset, Directory, EventStore, SignatureRegistry};
use crate::summary::{self, BalanceSummary, CalendarQuery};
use crate::workflow::{ApprovalWorkflow, WorkflowAction};

/// A leave request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitLeave {
    /// Employee the leave is for; the actor when absent
    pub employee_id: Option<EmployeeId>,
    pub category: LeaveCategory,
    pub start: NaiveDate,
    pub end: NaiveDate,
    #[serde(default)]
    pub payload: CategoryPayload,
}

/// Result of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitOutcome {
    pub event: LeaveEvent,
    /// Owner's cached balances after the operation
    pub balances: Balances,
}

/// Result of approving an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproveOutcome {
    pub event: LeaveEvent,
    pub balances: Option<Balances>,
}

/// Result of cancelling or rejecting an event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOutcome {
    pub event_id: LeaveEventId,
    pub was_approved: bool,
    /// Days returned to the owner's balances
    pub refunded: Option<Deduction>,
    pub balances: Option<Balances>,
}

/// Duty roster entries for a date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignRoster {
    pub employee_ids: Vec<EmployeeId>,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterOutcome {
    pub created: Vec<LeaveEvent>,
    /// Employees that already had an entry on the date
    pub skipped: Vec<EmployeeId>,
}

/// Signed hour adjustment on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlexAdjustment {
    pub employee_id: EmployeeId,
    pub date: NaiveDate,
    pub hours: Decimal,
}

/// Bulk supplemental grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSupplemental {
    pub employee_ids: Vec<EmployeeId>,
    pub days: LeaveDays,
    pub reason: String,
    /// Defaults to today
    pub effective_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantOutcome {
    pub entry: GrantLogEntry,
    pub balances: Vec<(EmployeeId, Balances)>,
}

/// Outcome of rewriting legacy (name, department) owners
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyMigrationReport {
    pub migrated: usize,
    pub unresolved: Vec<LeaveEventId>,
}

/// The leave engine's entry point
pub struct LeaveService {
    directory: Arc<dyn Directory>,
    store: Arc<dyn EventStore>,
    signatures: Arc<dyn SignatureRegistry>,
    clock: Arc<dyn Clock>,
    policy: Arc<LeavePolicy>,
    departments: DepartmentRegistry,
    accrual: AccrualCalculator,
    ledger: LeaveLedger,
    guard: OverlapGuard,
    workflow: ApprovalWorkflow,
    month_lock: MonthLock,
    employee_locks: KeyedLocks<EmployeeId>,
    month_locks: KeyedLocks<MonthKey>,
}

impl LeaveService {
    /// Builds a service whose department list holds only the configured base
    /// departments
    pub fn new(
        directory: Arc<dyn Directory>,
        store: Arc<dyn EventStore>,
        signatures: Arc<dyn SignatureRegistry>,
        clock: Arc<dyn Clock>,
        policy: Arc<LeavePolicy>,
    ) -> Self {
        let departments = DepartmentRegistry::new(&policy, Vec::<String>::new());
        Self {
            accrual: AccrualCalculator::new(policy.accrual.clone()),
            ledger: LeaveLedger::new(policy.debt_floor),
            guard: OverlapGuard::new(),
            workflow: ApprovalWorkflow::new(policy.superadmin_exempt_category),
            month_lock: MonthLock::new(policy.confirmation_window, policy.management_department.clone()),
            employee_locks: KeyedLocks::new(),
            month_locks: KeyedLocks::new(),
            directory,
            store,
            signatures,
            clock,
            policy,
            departments,
        }
    }

    /// Startup: merges observed departments into the registry and migrates
    /// legacy event owners
    pub async fn bootstrap(
        directory: Arc<dyn Directory>,
        store: Arc<dyn EventStore>,
        signatures: Arc<dyn SignatureRegistry>,
        clock: Arc<dyn Clock>,
        policy: Arc<LeavePolicy>,
    ) -> Result<Self, LeaveError> {
        let mut service = Self::new(directory, store, signatures, clock, policy);
        let employees = service.directory.list_employees(None).await?;
        service.departments =
            DepartmentRegistry::new(&service.policy, employees.into_iter().map(|e| e.department));

        let report = service.migrate_legacy_owners().await?;
        info!(
            departments = service.departments.list().len(),
            migrated = report.migrated,
            unresolved = report.unresolved.len(),
            "Leave service ready"
        );
        Ok(service)
    }

    pub fn policy(&self) -> &LeavePolicy {
        &self.policy
    }

    pub fn departments(&self) -> &DepartmentRegistry {
        &self.departments
    }

    pub fn accrual(&self) -> &AccrualCalculator {
        &self.accrual
    }

    fn today(&self) -> NaiveDate {
        self.clock.today(&self.policy.timezone)
    }

    fn month_keys(department: &str, range: &DateRange) -> Vec<MonthKey> {
        range
            .months()
            .into_iter()
            .map(|month| MonthKey::new(department, month))
            .collect()
    }

    /// Fails when any of `keys` is locked and the actor is not a superadmin
    async fn ensure_months_open(&self, actor: &Actor, keys: &[MonthKey]) -> Result<(), LeaveError> {
        for key in keys {
            let record = self.store.month_lock(key).await?;
            self.month_lock.gate(actor, record.as_ref())?;
        }
        Ok(())
    }

    /// Month keys the commit must re-check; superadmins bypass the gate
    fn commit_guard(actor: &Actor, keys: &[MonthKey]) -> Vec<MonthKey> {
        if actor.is_superadmin() {
            Vec::new()
        } else {
            keys.to_vec()
        }
    }

    fn rejected(&self, operation: &'static str, actor: &Actor, err: LeaveError) -> LeaveError {
        if err.kind() == ErrorKind::Authorization {
            warn!(operation, actor = %actor.employee_id, role = actor.role.as_str(), error = %err, "Request denied");
        }
        err
    }

    fn commit_failure(err: PortError, keys: &[MonthKey]) -> LeaveError {
        match (err, keys.first()) {
            (PortError::PreconditionFailed { .. }, Some(key)) => AuthorizationFailure::MonthLocked {
                department: key.department.clone(),
                month: key.month,
            }
            .into(),
            (err, _) => err.into(),
        }
    }

    fn should_retry(&self, err: &PortError, attempt: u32) -> bool {
        if err.is_stale() && attempt < self.policy.max_commit_attempts {
            debug!(attempt, error = %err, "Retrying after concurrent update");
            return true;
        }
        false
    }

    async fn active_employee(&self, id: EmployeeId) -> Result<Employee, LeaveError> {
        let employee = self
            .directory
            .find_employee(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("Employee", id))?;
        if !employee.is_active() {
            return Err(LeaveError::validation(format!("{} is no longer active", employee.name)));
        }
        Ok(employee)
    }

    async fn resolve_owner(&self, owner: &EventOwner) -> Result<Option<Employee>, LeaveError> {
        let employee = match owner {
            EventOwner::ById { employee_id } => self.directory.find_employee(*employee_id).await?,
            EventOwner::ByName { name, department } => {
                self.directory
                    .find_employee_by_name_and_department(name, department)
                    .await?
            }
        };
        Ok(employee)
    }

    async fn load_event(&self, id: LeaveEventId) -> Result<LeaveEvent, LeaveError> {
        self.store
            .get_event(id)
            .await?
            .ok_or_else(|| LeaveError::not_found("LeaveEvent", id))
    }

    /// Charges an approved event against `balances`, recording the deduction
    fn charge(&self, balances: &mut Balances, event: &mut LeaveEvent) -> bool {
        let days = self.ledger.consumption_for(event.category);
        if !days.is_positive() {
            return false;
        }
        event.applied = Some(self.ledger.apply_consumption(balances, days));
        true
    }

    // ------------------------------------------------------------------
    // Leave requests
    // ------------------------------------------------------------------

    /// Books leave for the actor or, for admins, for an employee they manage
    #[instrument(skip(self, actor, request), fields(actor = %actor.employee_id, category = %request.category))]
    pub async fn submit(&self, actor: &Actor, request: SubmitLeave) -> Result<SubmitOutcome, LeaveError> {
        let category = request.category;
        if category.has_dedicated_operation() {
            return Err(LeaveError::validation(format!(
                "'{}' entries are created through their own operation",
                category
            )));
        }
        let range = DateRange::new(request.start, request.end)?;
        request.payload.validate_for(category).map_err(LeaveError::Validation)?;

        let target_id = request.employee_id.unwrap_or(actor.employee_id);
        let _guard = self.employee_locks.lock(&target_id).await;

        let mut attempt = 0;
        loop {
            attempt += 1;
            let target = self.active_employee(target_id).await?;
            self.workflow
                .authorize_create(actor, &target, category)
                .map_err(|e| self.rejected("submit", actor, e))?;
            self.policy.check_category_for_dates(category, &range, &target.department)?;

            let keys = Self::month_keys(&target.department, &range);
            self.ensure_months_open(actor, &keys)
                .await
                .map_err(|e| self.rejected("submit", actor, e))?;

            let existing = self.store.events_for_owner(&target, Some(range)).await?;
            self.guard.check(&target, category, &range, &existing)?;

            let mut event = LeaveEvent::new(
                &target,
                actor.employee_id,
                category,
                range,
                request.payload.clone(),
                self.clock.now(),
            );
            let mut balances = target.balances;
            let mut changeset = Changeset::new()
                .require_unlocked(Self::commit_guard(actor, &keys))
                .owner(&target);
            if self.workflow.starts_approved(actor, category) {
                self.workflow.approve(&mut event)?;
                if self.charge(&mut balances, &mut event) {
                    changeset = changeset.balance(&target, balances);
                }
            }
            changeset = changeset.insert(event.clone());

            match self.store.commit(changeset).await {
                Ok(()) => {
                    info!(
                        event_id = %event.id,
                        employee = %target.id,
                        range = %event.range,
                        state = %event.state(),
                        charged = %event.charged(),
                        "Leave submitted"
                    );
                    return Ok(SubmitOutcome { event, balances });
                }
                Err(e) if self.should_retry(&e, attempt) => continue,
                Err(e) => return Err(Self::commit_failure(e, &keys)),
            }
        }
    }

    /// Pending → Approved, applying consumption
    #[instrument(skip(self, actor), fields(actor = %actor.employee_id))]
    pub async fn approve(&self, actor: &Actor, event_id: LeaveEventId) -> Result<ApproveOutcome, LeaveError> {
        let event = self.load_event(event_id).await?;
        let owner = self.resolve_owner(&event.owner).await?;
        let _guard = match &owner {
            Some(o) => Some(self.employee_locks.lock(&o.id).await),
            None => None,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut event = self.load_event(event_id).await?;
            self.workflow
                .authorize(actor, WorkflowAction::Approve, &event)
                .map_err(|e| self.rejected("approve", actor, e))?;

            let keys = Self::month_keys(&event.department, &event.range);
            self.ensure_months_open(actor, &keys)
                .await
                .map_err(|e| self.rejected("approve", actor, e))?;

            let was_approved = event.approved;
            self.workflow.approve(&mut event)?;
            let mut changeset = Changeset::new().require_unlocked(Self::commit_guard(actor, &keys));
            let owner = self.resolve_owner(&event.owner).await?;
            if let Some(owner) = &owner {
                changeset = changeset.owner(owner);
            }
            let mut balances = None;
            if event.category.consumes_balance() {
                let owner = match &owner {
                    Some(owner) => owner,
                    None => return Err(LeaveError::not_found("Employee", owner_label(&event.owner))),
                };
                let mut staged = owner.balances;
                if self.charge(&mut staged, &mut event) {
                    changeset = changeset.balance(owner, staged);
                }
                balances = Some(staged);
            }
            changeset = changeset.update(event.clone(), was_approved);

            match self.store.commit(changeset).await {
                Ok(()) => {
                    info!(event_id = %event.id, charged = %event.charged(), "Leave approved");
                    return Ok(ApproveOutcome { event, balances });
                }
                Err(e) if self.should_retry(&e, attempt) => continue,
                Err(e) => return Err(Self::commit_failure(e, &keys)),
            }
        }
    }

    /// Deletes a pending request without ledger effect
    #[instrument(skip(self, actor), fields(actor = %actor.employee_id))]
    pub async fn reject(&self, actor: &Actor, event_id: LeaveEventId) -> Result<CancelOutcome, LeaveError> {
        self.remove(actor, event_id, WorkflowAction::Reject).await
    }

    /// Deletes an event, returning any consumption to the owner
    #[instrument(skip(self, actor), fields(actor = %actor.employee_id))]
    pub async fn cancel(&self, actor: &Actor, event_id: LeaveEventId) -> Result<CancelOutcome, LeaveError> {
        self.remove(actor, event_id, WorkflowAction::Cancel).await
    }

    async fn remove(
        &self,
        actor: &Actor,
        event_id: LeaveEventId,
        action: WorkflowAction,
    ) -> Result<CancelOutcome, LeaveError> {
        let operation = match action {
            WorkflowAction::Reject => "reject",
            _ => "cancel",
        };
        let event = self.load_event(event_id).await?;
        let owner = self.resolve_owner(&event.owner).await?;
        let _guard = match &owner {
            Some(o) => Some(self.employee_locks.lock(&o.id).await),
            None => None,
        };

        let mut attempt = 0;
        loop {
            attempt += 1;
            let event = self.load_event(event_id).await?;
            self.workflow
                .authorize(actor, action, &event)
                .map_err(|e| self.rejected(operation, actor, e))?;

            let keys = Self::month_keys(&event.department, &event.range);
            self.ensure_months_open(actor, &keys)
                .await
                .map_err(|e| self.rejected(operation, actor, e))?;

            let mut changeset = Changeset::new()
                .require_unlocked(Self::commit_guard(actor, &keys))
                .delete(&event);
            let owner = self.resolve_owner(&event.owner).await?;
            if let Some(owner) = &owner {
                changeset = changeset.owner(owner);
            }
            let mut balances = None;
            let refunded = event.applied.filter(|d| !d.is_empty());
            if let (Some(deduction), Some(owner)) = (refunded, &owner) {
                let mut staged = owner.balances;
                self.ledger.reverse_consumption(&mut staged, &deduction);
                changeset = changeset.balance(owner, staged);
                balances = Some(staged);
            }

            match self.store.commit(changeset).await {
                Ok(()) => {
                    info!(
                        event_id = %event.id,
                        was_approved = event.approved,
                        refunded = %event.charged(),
                        "Leave {}", if action == WorkflowAction::Reject { "rejected" } else { "cancelled" }
                    );
                    return Ok(CancelOutcome {
                        event_id: event.id,
                        was_approved: event.approved,
                        refunded,
                        balances,
                    });
                }
                Err(e) if self.should_retry(&e, attempt) => continue,
                Err(e) => return Err(Self::commit_failure(e, &keys)),
            }
        }
    }

    // ------------------------------------------------------------------
    // Roster and flex entries
    // ------------------------------------------------------------------

    /// Records duty roster entries; always approved, one per employee and date
    #[instrument(skip(self, actor, request), fields(actor = %actor.employee_id, date = %request.date))]
    pub async fn assign_roster(&self, actor: &Actor, request: AssignRoster) -> Result<RosterOutcome, LeaveError> {
        if request.employee_ids.is_empty() {
            return Err(LeaveError::validation("no employees selected for the roster"));
        }
        let range = DateRange::single(request.date);
        let _guards = self.employee_locks.lock_all(&request.employee_ids).await;

        let mut seen = Vec::new();
        let mut owners = Vec::new();
        let mut created = Vec::new();
        let mut skipped = Vec::new();
        let mut keys = Vec::new();
        for id in &request.employee_ids {
            if seen.contains(id) {
                continue;
            }
            seen.push(*id);

            let target = self.active_employee(*id).await?;
            if !(actor.is_superadmin() || actor.department == target.department) {
                return Err(self.rejected(
                    "assign_roster",
                    actor,
                    AuthorizationFailure::DepartmentMismatch {
                        actor_department: actor.department.clone(),
                        department: target.department.clone(),
                    }
                    .into(),
                ));
            }
            let target_keys = Self::month_keys(&target.department, &range);
            self.ensure_months_open(actor, &target_keys)
                .await
                .map_err(|e| self.rejected("assign_roster", actor, e))?;

            let existing = self.store.events_for_owner(&target, Some(range)).await?;
            let duplicate = existing.iter().any(|ev| {
                ev.category == LeaveCategory::RosterAssignment && ev.department == target.department
            });
            if duplicate {
                skipped.push(target.id);
                continue;
            }

            let mut event = LeaveEvent::new(
                &target,
                actor.employee_id,
                LeaveCategory::RosterAssignment,
                range,
                CategoryPayload::Plain,
                self.clock.now(),
            );
            self.workflow.approve(&mut event)?;
            created.push(event);
            owners.push(target);
            for key in target_keys {
                if !keys.contains(&key) {
                    keys.push(key);
                }
            }
        }

        if !created.is_empty() {
            let changeset = owners.iter().fold(
                created
                    .iter()
                    .cloned()
                    .fold(Changeset::new(), Changeset::insert)
                    .require_unlocked(Self::commit_guard(actor, &keys)),
                Changeset::owner,
            );
            self.store
                .commit(changeset)
                .await
                .map_err(|e| Self::commit_failure(e, &keys))?;
        }

        info!(created = created.len(), skipped = skipped.len(), "Roster assigned");
        Ok(RosterOutcome { created, skipped })
    }

    /// Records a signed hour adjustment; no balance effect, no overlap check
    #[instrument(skip(self, actor, request), fields(actor = %actor.employee_id, employee = %request.employee_id))]
    pub async fn adjust_flex(&self, actor: &Actor, request: FlexAdjustment) -> Result<LeaveEvent, LeaveError> {
        let payload = CategoryPayload::Flex { hours: request.hours };
        payload
            .validate_for(LeaveCategory::FlexibleShift)
            .map_err(LeaveError::Validation)?;
        let range = DateRange::single(request.date);

        let _guard = self.employee_locks.lock(&request.employee_id).await;
        let target = self.active_employee(request.employee_id).await?;
        self.workflow
            .authorize_create(actor, &target, LeaveCategory::FlexibleShift)
            .map_err(|e| self.rejected("adjust_flex", actor, e))?;

        let keys = Self::month_keys(&target.department, &range);
        self.ensure_months_open(actor, &keys)
            .await
            .map_err(|e| self.rejected("adjust_flex", actor, e))?;

        let mut event = LeaveEvent::new(
            &target,
            actor.employee_id,
            LeaveCategory::FlexibleShift,
            range,
            payload,
            self.clock.now(),
        );
        self.workflow.approve(&mut event)?;

        self.store
            .commit(
                Changeset::new()
                    .insert(event.clone())
                    .owner(&target)
                    .require_unlocked(Self::commit_guard(actor, &keys)),
            )
            .await
            .map_err(|e| Self::commit_failure(e, &keys))?;

        info!(event_id = %event.id, hours = %request.hours, "Flex adjustment recorded");
        Ok(event)
    }

    // ------------------------------------------------------------------
    // Supplemental grants
    // ------------------------------------------------------------------

    /// Credits every recipient's supplemental balance and logs one entry
    #[instrument(skip(self, actor, request), fields(actor = %actor.employee_id, recipients = request.employee_ids.len()))]
    pub async fn grant_supplemental(
        &self,
        actor: &Actor,
        request: GrantSupplemental,
    ) -> Result<GrantOutcome, LeaveError> {
        if !actor.is_superadmin() {
            return Err(self.rejected(
                "grant_supplemental",
                actor,
                AuthorizationFailure::RoleRequired {
                    action: "granting supplemental leave",
                    required: "superadmin",
                }
                .into(),
            ));
        }
        let days = LeaveDays::positive(request.days.value())?;
        if days > self.policy.max_grant_days {
            return Err(LeaveError::validation(format!(
                "a grant may add at most {} days",
                self.policy.max_grant_days
            )));
        }
        let reason = request.reason.trim();
        if reason.is_empty() {
            return Err(LeaveError::validation("a grant needs a reason"));
        }
        let mut ids = request.employee_ids.clone();
        ids.sort();
        ids.dedup();
        if ids.is_empty() {
            return Err(LeaveError::validation("a grant needs at least one recipient"));
        }

        let _guards = self.employee_locks.lock_all(&ids).await;
        let effective_date = request.effective_date.unwrap_or_else(|| self.today());

        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut recipients = Vec::with_capacity(ids.len());
            for id in &ids {
                recipients.push(self.active_employee(*id).await?);
            }

            let entry = GrantLogEntry::new(
                &recipients,
                days,
                reason,
                actor.employee_id,
                effective_date,
                self.clock.now(),
            );
            let mut changeset = Changeset::new().grant(entry.clone());
            let mut balances = Vec::with_capacity(recipients.len());
            for recipient in &recipients {
                let mut staged = recipient.balances;
                self.ledger.credit_supplemental(&mut staged, days);
                changeset = changeset.balance(recipient, staged);
                balances.push((recipient.id, staged));
            }

            match self.store.commit(changeset).await {
                Ok(()) => {
                    info!(grant_id = %entry.id, days = %entry.days, summary = %entry.summary, "Supplemental leave granted");
                    return Ok(GrantOutcome { entry, balances });
                }
                Err(e) if self.should_retry(&e, attempt) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Grant entries: all of them for superadmins, otherwise those naming
    /// `employee_id`, which must be the actor or someone they administer
    pub async fn grant_history(
        &self,
        actor: &Actor,
        employee_id: Option<EmployeeId>,
    ) -> Result<Vec<GrantLogEntry>, LeaveError> {
        match employee_id {
            None if actor.is_superadmin() => Ok(self.store.grant_entries().await?),
            None => Ok(self.store.grants_for(actor.employee_id).await?),
            Some(id) => {
                self.ensure_can_view(actor, id).await?;
                Ok(self.store.grants_for(id).await?)
            }
        }
    }

    // ------------------------------------------------------------------
    // Month confirmation
    // ------------------------------------------------------------------

    #[instrument(skip(self, actor), fields(actor = %actor.employee_id, key = %key))]
    pub async fn confirm_month(&self, actor: &Actor, key: MonthKey) -> Result<MonthLockRecord, LeaveError> {
        let _guard = self.month_locks.lock(&key).await;
        let current = self.store.month_lock(&key).await?;
        let has_signature = self.signatures.has_signature(actor.employee_id).await?;

        let record = self
            .month_lock
            .confirm(current.as_ref(), &key, actor, has_signature, self.today(), self.clock.now())
            .map_err(|e| self.rejected("confirm_month", actor, e))?;

        if !self.store.swap_month_lock(false, record.clone()).await? {
            return Err(LeaveError::AlreadyConfirmed {
                department: key.department.clone(),
                month: key.month,
            });
        }
        info!("Month confirmed");
        Ok(record)
    }

    /// Unlocks a month; unlocking an unlocked month changes nothing
    #[instrument(skip(self, actor), fields(actor = %actor.employee_id, key = %key))]
    pub async fn unlock_month(&self, actor: &Actor, key: MonthKey) -> Result<MonthLockRecord, LeaveError> {
        let _guard = self.month_locks.lock(&key).await;
        let current = self.store.month_lock(&key).await?;

        let Some(record) = self
            .month_lock
            .unlock(current.as_ref(), &key, actor)
            .map_err(|e| self.rejected("unlock_month", actor, e))?
        else {
            debug!("Month already unlocked");
            return Ok(current.unwrap_or_else(|| MonthLockRecord::unlocked(key)));
        };

        if !self.store.swap_month_lock(true, record.clone()).await? {
            debug!("Month unlocked concurrently");
        }
        info!("Month unlocked");
        Ok(record)
    }

    pub async fn month_lock_status(&self, key: MonthKey) -> Result<MonthLockStatus, LeaveError> {
        let record = self.store.month_lock(&key).await?;
        Ok(self.month_lock.status(key, record.as_ref(), self.today()))
    }

    /// Lock metadata for exporters
    pub async fn month_lock_record(&self, key: &MonthKey) -> Result<Option<MonthLockRecord>, LeaveError> {
        Ok(self.store.month_lock(key).await?)
    }

    /// Approved events of a department touching a month, for exporters
    pub async fn approved_events_for_month(
        &self,
        department: &str,
        month: YearMonth,
    ) -> Result<Vec<LeaveEvent>, LeaveError> {
        let events = self
            .store
            .events_in_range(&[department.to_string()], month.range())
            .await?;
        Ok(events.into_iter().filter(|ev| ev.approved).collect())
    }

    // ------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------

    /// Pending requests awaiting the actor's decision, earliest first
    pub async fn pending_queue(
        &self,
        actor: &Actor,
        department: Option<&str>,
    ) -> Result<Vec<LeaveEvent>, LeaveError> {
        if !actor.is_admin() {
            return Err(self.rejected(
                "pending_queue",
                actor,
                AuthorizationFailure::RoleRequired {
                    action: "reviewing pending leave",
                    required: "an administrator",
                }
                .into(),
            ));
        }
        let department = self.departments.resolve_view_department(actor, department);
        Ok(self.store.pending_events(&department).await?)
    }

    /// Events shown on the actor's calendar for a month
    pub async fn calendar(&self, actor: &Actor, query: CalendarQuery) -> Result<Vec<LeaveEvent>, LeaveError> {
        let department = self
            .departments
            .resolve_view_department(actor, query.department.as_deref());
        let visible = self.departments.visible_from(&department);
        let events = self.store.events_in_range(&visible, query.month.range()).await?;

        let me = if query.mine_only {
            self.directory.find_employee(actor.employee_id).await?
        } else {
            None
        };
        Ok(events
            .into_iter()
            .filter(|ev| summary::is_visible_to(actor, ev))
            .filter(|ev| !query.mine_only || summary::is_mine(actor, ev, me.as_ref()))
            .collect())
    }

    async fn ensure_can_view(&self, actor: &Actor, employee_id: EmployeeId) -> Result<Employee, LeaveError> {
        let employee = self
            .directory
            .find_employee(employee_id)
            .await?
            .ok_or_else(|| LeaveError::not_found("Employee", employee_id))?;
        if employee.id == actor.employee_id || actor.can_manage(&employee.department) {
            return Ok(employee);
        }
        Err(self.rejected(
            "view_employee",
            actor,
            AuthorizationFailure::NotOwner {
                action: "view another employee's leave",
            }
            .into(),
        ))
    }

    /// Entitlement, usage and remaining balances for an employee
    pub async fn balance_summary(
        &self,
        actor: &Actor,
        employee_id: EmployeeId,
        as_of: Option<NaiveDate>,
    ) -> Result<BalanceSummary, LeaveError> {
        let employee = self.ensure_can_view(actor, employee_id).await?;
        self.summarize(employee, as_of.unwrap_or_else(|| self.today())).await
    }

    async fn summarize(&self, employee: Employee, as_of: NaiveDate) -> Result<BalanceSummary, LeaveError> {
        let accrued = LeaveDays::from(self.accrual.entitlement_for(employee.hire_date, as_of));
        let approved_usage: LeaveDays = self
            .store
            .events_for_owner(&employee, None)
            .await?
            .iter()
            .map(LeaveEvent::consumed)
            .sum();
        let grants = self.store.grants_for(employee.id).await?;
        let lifetime_grants = grant::lifetime_total(&grants, employee.id);
        let remaining = self.ledger.derive_balances(
            accrued,
            lifetime_grants,
            employee.pre_system_usage + approved_usage,
        );

        Ok(BalanceSummary {
            employee_id: employee.id,
            name: employee.name,
            department: employee.department,
            as_of,
            accrued,
            pre_system_usage: employee.pre_system_usage,
            approved_usage,
            lifetime_grants,
            remaining,
            cached: employee.balances,
        })
    }

    /// Rewrites an employee's cached balances from the derived summary
    #[instrument(skip(self, actor), fields(actor = %actor.employee_id))]
    pub async fn reconcile_balances(
        &self,
        actor: &Actor,
        employee_id: EmployeeId,
    ) -> Result<BalanceSummary, LeaveError> {
        if !actor.is_superadmin() {
            return Err(self.rejected(
                "reconcile_balances",
                actor,
                AuthorizationFailure::RoleRequired {
                    action: "reconciling balances",
                    required: "superadmin",
                }
                .into(),
            ));
        }
        let _guard = self.employee_locks.lock(&employee_id).await;
        let today = self.today();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let employee = self
                .directory
                .find_employee(employee_id)
                .await?
                .ok_or_else(|| LeaveError::not_found("Employee", employee_id))?;
            let mut summary = self.summarize(employee.clone(), today).await?;
            if summary.cache_matches() {
                return Ok(summary);
            }

            match self.store.commit(Changeset::new().balance(&employee, summary.remaining)).await {
                Ok(()) => {
                    info!(
                        employee = %employee_id,
                        supplemental = %summary.remaining.supplemental,
                        entitled = %summary.remaining.entitled,
                        "Balance cache reconciled"
                    );
                    summary.cached = summary.remaining;
                    return Ok(summary);
                }
                Err(e) if self.should_retry(&e, attempt) => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    // ------------------------------------------------------------------
    // Startup maintenance
    // ------------------------------------------------------------------

    /// Rewrites events owned by (name, department) to reference the
    /// matching employee id
    #[instrument(skip(self))]
    pub async fn migrate_legacy_owners(&self) -> Result<LegacyMigrationReport, LeaveError> {
        let mut report = LegacyMigrationReport::default();
        for event in self.store.legacy_events().await? {
            match self.resolve_owner(&event.owner).await? {
                Some(owner) => {
                    self.store.reassign_owner(event.id, owner.id).await?;
                    report.migrated += 1;
                }
                None => {
                    warn!(event_id = %event.id, owner = %owner_label(&event.owner), "Legacy owner has no matching employee");
                    report.unresolved.push(event.id);
                }
            }
        }
        Ok(report)
    }
}

fn owner_label(owner: &EventOwner) -> String {
    match owner {
        EventOwner::ById { employee_id } => employee_id.to_string(),
        EventOwner::ByName { name, department } => format!("{} ({})", name, department),
    }
}
