//! Leave Domain
//!
//! Paid-leave entitlement, consumption and monthly schedule confirmation
//! for hospital staff.
//!
//! # Components
//!
//! - **AccrualCalculator**: cumulative entitlement from the hire date
//! - **LeaveLedger**: supplemental-first deduction with a debt floor
//! - **OverlapGuard**: per-employee date-range conflicts
//! - **ApprovalWorkflow**: role- and department-aware request transitions
//! - **MonthLock**: per department-month schedule confirmation
//! - **LeaveService**: composes the above against the store ports

pub mod accrual;
pub mod actor;
pub mod category;
pub mod employee;
pub mod error;
pub mod event;
pub mod grant;
pub mod ledger;
pub mod locks;
pub mod month_lock;
pub mod overlap;
pub mod policy;
pub mod ports;
pub mod service;
pub mod summary;
pub mod workflow;

pub use accrual::{AccrualBreakdown, AccrualCalculator, AccrualPolicy, TenureStep};
pub use actor::{Actor, Role};
pub use category::{CategoryPayload, LeaveCategory};
pub use employee::{Balances, Employee, EmploymentStatus};
pub use error::{AuthorizationFailure, ErrorKind, LeaveError};
pub use event::{ApprovalState, EventOwner, LeaveEvent};
pub use grant::GrantLogEntry;
pub use ledger::{Deduction, LeaveLedger};
pub use month_lock::{ConfirmationWindow, MonthKey, MonthLock, MonthLockRecord, MonthLockStatus};
pub use overlap::OverlapGuard;
pub use policy::{DepartmentRegistry, LeavePolicy};
pub use ports::{Changeset, Directory, EventStore, EventWrite, OwnerGuard, SignatureRegistry};
pub use service::{
    ApproveOutcome, AssignRoster, CancelOutcome, FlexAdjustment, GrantOutcome, GrantSupplemental,
    LeaveService, LegacyMigrationReport, RosterOutcome, SubmitLeave, SubmitOutcome,
};
pub use summary::{BalanceSummary, CalendarQuery};
pub use workflow::{ApprovalWorkflow, WorkflowAction};
