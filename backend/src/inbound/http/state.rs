//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on domain ports and remain testable without I/O.

use std::sync::Arc;

use crate::domain::ports::{Authenticator, SnapshotQuery, SyncCommand};

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub sync: Arc<dyn SyncCommand>,
    pub snapshots: Arc<dyn SnapshotQuery>,
    pub authenticator: Arc<dyn Authenticator>,
}

impl HttpState {
    /// Bundle the driving ports and the authenticator.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    ///
    /// use mockable::DefaultClock;
    /// use spendsync::domain::UserId;
    /// use spendsync::domain::ports::FixtureAuthenticator;
    /// use spendsync::domain::sync::{SnapshotService, SyncService};
    /// use spendsync::inbound::http::state::HttpState;
    /// use spendsync::outbound::memory::InMemoryExpenseStore;
    ///
    /// let clock = Arc::new(DefaultClock);
    /// let store = Arc::new(InMemoryExpenseStore::new(clock.clone()));
    /// let state = HttpState::new(
    ///     Arc::new(SyncService::new(store.clone())),
    ///     Arc::new(SnapshotService::new(store, clock)),
    ///     Arc::new(FixtureAuthenticator(UserId::random())),
    /// );
    /// let _sync = state.sync.clone();
    /// ```
    pub fn new(
        sync: Arc<dyn SyncCommand>,
        snapshots: Arc<dyn SnapshotQuery>,
        authenticator: Arc<dyn Authenticator>,
    ) -> Self {
        Self {
            sync,
            snapshots,
            authenticator,
        }
    }
}
