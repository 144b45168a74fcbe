//! Infrastructure Database Layer
//!
//! PostgreSQL persistence for the leave engine using SQLx.
//!
//! # Architecture
//!
//! - `repositories`: one repository per table, working in row types
//! - `adapters`: [`PostgresLeaveStore`], which maps rows to domain values
//!   and implements the leave domain's ports
//! - `migrations/`: the schema, applied with [`run_migrations`]
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, run_migrations, DatabaseConfig, PostgresLeaveStore};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/ward_leave")).await?;
//! run_migrations(&pool).await?;
//! let store = PostgresLeaveStore::new(pool);
//! ```

pub mod adapters;
pub mod error;
pub mod pool;
pub mod repositories;

pub use adapters::PostgresLeaveStore;
pub use error::{into_port_error, DatabaseError};
pub use pool::{create_pool, create_pool_from_url, run_migrations, DatabaseConfig, DatabasePool};
