//! Repository implementations for the leave tables
//!
//! Each repository owns the SQL for one table and works in row types;
//! mapping to domain values happens in the adapters. Writes that must be
//! atomic with others take a `&mut PgConnection` so they can run inside the
//! caller's transaction.

pub mod employees;
pub mod grants;
pub mod leave_events;
pub mod month_locks;

pub use employees::{EmployeeRepository, EmployeeRow, NewEmployee};
pub use grants::{GrantRepository, GrantRow};
pub use leave_events::{LeaveEventRepository, LeaveEventRow};
pub use month_locks::{MonthLockRepository, MonthLockRow};
