//! Core Kernel - Foundational types for the leave engine
//!
//! This crate provides the building blocks used by the domain, storage and
//! API layers:
//! - Leave-day quantities with precise decimal arithmetic
//! - Calendar types (inclusive date ranges, months, timezone, clocks)
//! - Strongly-typed identifiers
//! - Port and adapter plumbing

pub mod days;
pub mod temporal;
pub mod identifiers;
pub mod ports;

pub use days::{LeaveDays, DaysError, MAX_LEAVE_DAYS};
pub use temporal::{Clock, DateRange, FixedClock, SystemClock, TemporalError, Timezone, YearMonth};
pub use identifiers::{EmployeeId, LeaveEventId, GrantId};
pub use ports::{
    PortError, DomainPort, HealthCheckable, HealthCheckResult, AdapterHealth,
};
