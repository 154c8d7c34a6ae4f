//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repository implementations only translate between Diesel rows and domain
//! types; no sync rules live here. Row structs (`models.rs`) and table
//! definitions (`schema.rs`) stay private to this module.
//!
//! ```ignore
//! use spendsync::outbound::persistence::{DbPool, DieselExpenseStore, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/expenses")).await?;
//! let store = DieselExpenseStore::new(pool, Arc::new(DefaultClock));
//! ```

mod diesel_basic_error_mapping;
mod diesel_expense_store;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_expense_store::DieselExpenseStore;
pub use migrations::run_migrations;
pub use pool::{DbPool, OwnedConnection, PoolConfig, PoolError};
