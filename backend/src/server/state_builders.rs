//! Builders wiring store adapters into the HTTP state.

use std::sync::Arc;

use mockable::{Clock, DefaultClock};
use tracing::warn;

use spendsync::domain::ports::{ExpenseStore, SnapshotQuery, SyncCommand};
use spendsync::domain::sync::{SnapshotService, SyncService};
use spendsync::inbound::http::state::HttpState;
use spendsync::outbound::memory::InMemoryExpenseStore;
use spendsync::outbound::persistence::DieselExpenseStore;

use super::ServerConfig;

/// Build the sync command and snapshot query over one shared store.
fn build_services<S>(
    store: Arc<S>,
    clock: Arc<dyn Clock>,
) -> (Arc<dyn SyncCommand>, Arc<dyn SnapshotQuery>)
where
    S: ExpenseStore + 'static,
{
    let sync = Arc::new(SyncService::new(Arc::clone(&store)));
    let snapshots = Arc::new(SnapshotService::new(store, clock));
    (sync, snapshots)
}

/// Assemble [`HttpState`] from the configured adapters.
///
/// Uses the Diesel store when a pool is configured, otherwise an in-memory
/// store that loses its contents on restart.
pub(super) fn build_http_state(config: &ServerConfig) -> HttpState {
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let (sync, snapshots) = match &config.db_pool {
        Some(pool) => build_services(
            Arc::new(DieselExpenseStore::new(pool.clone(), Arc::clone(&clock))),
            clock,
        ),
        None => {
            warn!("no database configured; expenses are kept in memory only");
            build_services(
                Arc::new(InMemoryExpenseStore::new(Arc::clone(&clock))),
                clock,
            )
        }
    };
    HttpState::new(sync, snapshots, Arc::clone(&config.authenticator))
}
