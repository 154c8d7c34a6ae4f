//! Driving port for mutating sync operations.

use async_trait::async_trait;

use crate::domain::sync::{ReplaceReport, ReplacementExpense, SyncBatch, SyncReport};
use crate::domain::{Error, UserId};

/// Apply client-side changes to the authoritative store.
///
/// Both operations are atomic: on `Err` none of the call's writes persist.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SyncCommand: Send + Sync {
    /// Apply one batch of creations, updates, and deletions.
    async fn run_sync(&self, user_id: &UserId, batch: SyncBatch) -> Result<SyncReport, Error>;

    /// Upload a client's full dataset, updating known rows and creating new
    /// ones.
    async fn replace_all(
        &self,
        user_id: &UserId,
        entries: Vec<ReplacementExpense>,
    ) -> Result<ReplaceReport, Error>;
}
