//! Domain ports.
//!
//! Driven ports (`ExpenseStore`, `Authenticator`) are implemented by outbound
//! adapters; driving ports (`SyncCommand`, `SnapshotQuery`) are implemented
//! by domain services and called by inbound adapters.

mod macros;

pub(crate) use macros::define_port_error;

mod authenticator;
mod expense_store;
mod snapshot_query;
mod sync_command;

#[cfg(test)]
pub use authenticator::MockAuthenticator;
pub use authenticator::{Authenticator, AuthenticatorError, FixtureAuthenticator};
pub use expense_store::{
    ExpenseQuery, ExpenseStore, ExpenseStoreError, ExpenseTransaction, Visibility,
};
#[cfg(test)]
pub use snapshot_query::MockSnapshotQuery;
pub use snapshot_query::SnapshotQuery;
#[cfg(test)]
pub use sync_command::MockSyncCommand;
pub use sync_command::SyncCommand;
