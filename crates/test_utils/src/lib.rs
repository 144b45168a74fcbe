//! Test Utilities Crate
//!
//! Shared test infrastructure for the leave engine.
//!
//! # Modules
//!
//! - `fixtures`: fixed dates, the test policy and actors
//! - `builders`: builders for employees and events
//! - `harness`: a `LeaveService` wired to the in-memory store
//! - `database`: PostgreSQL test containers with the schema applied
//! - `assertions`: balance assertions and result macros
//! - `generators`: proptest strategies

pub mod assertions;
pub mod builders;
pub mod database;
pub mod fixtures;
pub mod generators;
pub mod harness;

pub use assertions::*;
pub use builders::*;
pub use database::*;
pub use fixtures::*;
pub use generators::*;
pub use harness::*;
