//! Outbound adapters implementing domain ports for external infrastructure.
//!
//! - **persistence**: PostgreSQL-backed expense store using Diesel ORM
//! - **memory**: process-local expense store for development and tests
//! - **auth**: bearer token authenticators
//!
//! Adapters are thin translators between domain types and
//! infrastructure-specific representations. They contain no sync rules.

pub mod auth;
pub mod memory;
pub mod persistence;
