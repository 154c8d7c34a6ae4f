//! Sync transaction orchestration.
//!
//! One client call maps to one store transaction. Per-item outcomes
//! (`not_found`, duplicate, stale) are recorded and the batch carries on;
//! any store failure rolls the whole call back.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::domain::ports::{
    ExpenseStore, ExpenseStoreError, ExpenseTransaction, SyncCommand, Visibility,
};
use crate::domain::{Error, ExpenseChanges, NewExpense, UserId};

use super::category_resolver::CategoryResolver;
use super::conflict_resolver::{ConflictDecision, resolve_conflict};
use super::duplicate_detector::find_collision;
use super::{
    CreatedExpense, CreatedMapping, ReplaceReport, ReplacementExpense, SyncBatch, SyncReport,
    UpdateOutcome, UpdatedExpense,
};

/// Sync service implementing the [`SyncCommand`] driving port.
#[derive(Clone)]
pub struct SyncService<S> {
    store: Arc<S>,
}

impl<S> SyncService<S> {
    /// Create a service over the given store.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }
}

pub(crate) fn map_store_error(error: ExpenseStoreError) -> Error {
    match error {
        ExpenseStoreError::Connection { message } => {
            Error::service_unavailable(format!("expense store unavailable: {message}"))
        }
        ExpenseStoreError::Query { message } => {
            Error::internal(format!("expense store error: {message}"))
        }
    }
}

/// Commit on success, roll back on failure. A failed rollback is logged and
/// the original error wins.
async fn finish<T: Send>(
    tx: Box<dyn ExpenseTransaction>,
    outcome: Result<T, ExpenseStoreError>,
) -> Result<T, ExpenseStoreError> {
    match outcome {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(failure) => {
            if let Err(rollback_error) = tx.rollback().await {
                warn!(error = %rollback_error, "rollback after failed sync also failed");
            }
            Err(failure)
        }
    }
}

async fn create_expense(
    tx: &mut dyn ExpenseTransaction,
    categories: &mut CategoryResolver,
    user_id: &UserId,
    item: CreatedExpense,
) -> Result<CreatedMapping, ExpenseStoreError> {
    let category_id = categories.resolve(tx, &item.category).await?;
    let stored = tx
        .insert_expense(&NewExpense {
            user_id: *user_id,
            local_id: Some(item.local_id.clone()),
            product: item.product,
            price: item.price,
            category_id: Some(category_id),
            timestamp: item.timestamp,
        })
        .await?;
    Ok(CreatedMapping {
        local_id: item.local_id,
        server_id: stored.id,
    })
}

async fn update_expense(
    tx: &mut dyn ExpenseTransaction,
    categories: &mut CategoryResolver,
    user_id: &UserId,
    item: UpdatedExpense,
) -> Result<UpdateOutcome, ExpenseStoreError> {
    let id = item.id;
    let Some(existing) = tx.find_expense(user_id, id, Visibility::ActiveOnly).await? else {
        return Ok(UpdateOutcome::NotFound { id });
    };

    if let Some(conflicting_id) =
        find_collision(tx, user_id, &item.product, item.timestamp, id).await?
    {
        debug!(%user_id, expense_id = %id, %conflicting_id, "update would duplicate another expense");
        return Ok(UpdateOutcome::Duplicate { id, conflicting_id });
    }

    if resolve_conflict(&existing, item.timestamp) == ConflictDecision::RejectStale {
        debug!(%user_id, expense_id = %id, "stale update rejected");
        return Ok(UpdateOutcome::Stale { id });
    }

    let category_id = categories.resolve(tx, &item.category).await?;
    let changes = ExpenseChanges {
        product: item.product,
        price: item.price,
        category_id: Some(category_id),
        timestamp: item.timestamp,
    };
    Ok(match tx.update_expense(user_id, id, &changes).await? {
        Some(_) => UpdateOutcome::Applied { id },
        None => UpdateOutcome::NotFound { id },
    })
}

async fn apply_batch(
    tx: &mut dyn ExpenseTransaction,
    user_id: &UserId,
    batch: SyncBatch,
) -> Result<SyncReport, ExpenseStoreError> {
    let mut categories = CategoryResolver::new(*user_id);
    let mut report = SyncReport::default();

    for item in batch.created {
        let mapping = create_expense(tx, &mut categories, user_id, item).await?;
        report.created_map.push(mapping);
    }

    for item in batch.updated {
        let outcome = update_expense(tx, &mut categories, user_id, item).await?;
        report.updated_results.push(outcome);
    }

    if !batch.deleted_ids.is_empty() {
        report.deleted_count = tx.soft_delete_expenses(user_id, &batch.deleted_ids).await?;
    }

    Ok(report)
}

async fn apply_replacements(
    tx: &mut dyn ExpenseTransaction,
    user_id: &UserId,
    entries: Vec<ReplacementExpense>,
) -> Result<ReplaceReport, ExpenseStoreError> {
    let mut categories = CategoryResolver::new(*user_id);
    let mut report = ReplaceReport::default();

    for entry in entries {
        match (entry.id, entry.local_id) {
            (Some(id), _) => {
                if tx
                    .find_expense(user_id, id, Visibility::ActiveOnly)
                    .await?
                    .is_none()
                {
                    debug!(%user_id, expense_id = %id, "replacement targets unknown expense");
                    continue;
                }
                let category_id = categories.resolve(tx, &entry.category).await?;
                let changes = ExpenseChanges {
                    product: entry.product,
                    price: entry.price,
                    category_id: Some(category_id),
                    timestamp: entry.timestamp,
                };
                if tx.update_expense(user_id, id, &changes).await?.is_some() {
                    report.updated_count += 1;
                }
            }
            (None, Some(local_id)) => {
                let category_id = categories.resolve(tx, &entry.category).await?;
                tx.insert_expense(&NewExpense {
                    user_id: *user_id,
                    local_id: Some(local_id),
                    product: entry.product,
                    price: entry.price,
                    category_id: Some(category_id),
                    timestamp: entry.timestamp,
                })
                .await?;
                report.created_count += 1;
            }
            (None, None) => debug!(%user_id, "replacement row has no identifiers; ignored"),
        }
    }

    Ok(report)
}

#[async_trait]
impl<S> SyncCommand for SyncService<S>
where
    S: ExpenseStore,
{
    async fn run_sync(&self, user_id: &UserId, batch: SyncBatch) -> Result<SyncReport, Error> {
        if batch.is_empty() {
            debug!(%user_id, "empty sync batch");
            return Ok(SyncReport::default());
        }

        let (created, updated, deleted) = (
            batch.created.len(),
            batch.updated.len(),
            batch.deleted_ids.len(),
        );
        let mut tx = self.store.begin().await.map_err(map_store_error)?;
        let outcome = apply_batch(tx.as_mut(), user_id, batch).await;
        match finish(tx, outcome).await {
            Ok(report) => {
                info!(
                    %user_id,
                    created,
                    updated,
                    deleted,
                    deleted_count = report.deleted_count,
                    "sync batch committed"
                );
                Ok(report)
            }
            Err(failure) => {
                error!(%user_id, error = %failure, "sync batch rolled back");
                Err(map_store_error(failure))
            }
        }
    }

    async fn replace_all(
        &self,
        user_id: &UserId,
        entries: Vec<ReplacementExpense>,
    ) -> Result<ReplaceReport, Error> {
        let submitted = entries.len();
        let mut tx = self.store.begin().await.map_err(map_store_error)?;
        let outcome = apply_replacements(tx.as_mut(), user_id, entries).await;
        match finish(tx, outcome).await {
            Ok(report) => {
                info!(
                    %user_id,
                    submitted,
                    created = report.created_count,
                    updated = report.updated_count,
                    "client data replacement committed"
                );
                Ok(report)
            }
            Err(failure) => {
                error!(%user_id, error = %failure, "client data replacement rolled back");
                Err(map_store_error(failure))
            }
        }
    }
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
