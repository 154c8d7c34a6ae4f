//! Driving port for pull-based reconciliation reads.

use async_trait::async_trait;

use crate::domain::sync::{FullSnapshot, IncrementalSnapshot, SnapshotWindow};
use crate::domain::{Error, UserId};

/// Read-only views of a user's data for offline clients.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SnapshotQuery: Send + Sync {
    /// Expenses changed inside the window, including soft-deleted ones.
    async fn export_incremental(
        &self,
        user_id: &UserId,
        window: SnapshotWindow,
    ) -> Result<IncrementalSnapshot, Error>;

    /// Every expense, category, and product name the user has.
    async fn export_full(&self, user_id: &UserId) -> Result<FullSnapshot, Error>;
}
