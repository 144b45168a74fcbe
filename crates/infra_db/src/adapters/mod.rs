//! Port adapters backed by PostgreSQL

pub mod leave_store;

pub use leave_store::PostgresLeaveStore;
