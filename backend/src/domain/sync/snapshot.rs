//! Point-in-time exports for pull-based reconciliation.
//!
//! Both export forms include soft-deleted expenses so clients learn about
//! deletions, and both return a `server_timestamp` watermark the client
//! should send back as `since` on its next incremental pull.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tracing::debug;

use crate::domain::ports::{ExpenseQuery, ExpenseStore, SnapshotQuery, Visibility};
use crate::domain::{
    Category, CategoryId, Error, Expense, ExpenseId, LocalId, Price, ProductName, UserId,
};

use super::service::map_store_error;

/// Change window and page for an incremental export.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotWindow {
    /// Inclusive lower bound on `created_at`, `updated_at`, or `deleted_at`.
    pub since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Exported view of one expense with its category name resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseSnapshot {
    pub id: ExpenseId,
    pub local_id: Option<LocalId>,
    pub product: ProductName,
    pub price: Price,
    pub category: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Expenses changed since a watermark.
#[derive(Debug, Clone, PartialEq)]
pub struct IncrementalSnapshot {
    pub expenses: Vec<ExpenseSnapshot>,
    pub server_timestamp: DateTime<Utc>,
}

/// Everything the user owns.
#[derive(Debug, Clone, PartialEq)]
pub struct FullSnapshot {
    pub expenses: Vec<ExpenseSnapshot>,
    pub categories: Vec<Category>,
    pub product_names: Vec<String>,
    pub server_timestamp: DateTime<Utc>,
}

/// Snapshot exporter implementing the [`SnapshotQuery`] driving port.
#[derive(Clone)]
pub struct SnapshotService<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
}

impl<S> SnapshotService<S> {
    /// Create an exporter reading from `store` and stamping with `clock`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

fn render(expenses: Vec<Expense>, names: &HashMap<CategoryId, String>) -> Vec<ExpenseSnapshot> {
    expenses
        .into_iter()
        .map(|expense| ExpenseSnapshot {
            category: expense
                .category_id
                .and_then(|id| names.get(&id).cloned()),
            id: expense.id,
            local_id: expense.local_id,
            product: expense.product,
            price: expense.price,
            timestamp: expense.timestamp,
            updated_at: expense.updated_at,
            deleted_at: expense.deleted_at,
        })
        .collect()
}

fn name_index(categories: &[Category]) -> HashMap<CategoryId, String> {
    categories
        .iter()
        .map(|category| (category.id, category.name.as_str().to_owned()))
        .collect()
}

impl<S> SnapshotService<S>
where
    S: ExpenseStore,
{
    /// Resolve category names for a page of expenses with one lookup.
    async fn category_names(
        &self,
        user_id: &UserId,
        expenses: &[Expense],
    ) -> Result<HashMap<CategoryId, String>, Error> {
        let mut ids: Vec<CategoryId> = expenses.iter().filter_map(|e| e.category_id).collect();
        ids.sort_unstable();
        ids.dedup();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let categories = self
            .store
            .find_categories(user_id, &ids)
            .await
            .map_err(map_store_error)?;
        Ok(name_index(&categories))
    }
}

#[async_trait]
impl<S> SnapshotQuery for SnapshotService<S>
where
    S: ExpenseStore,
{
    async fn export_incremental(
        &self,
        user_id: &UserId,
        window: SnapshotWindow,
    ) -> Result<IncrementalSnapshot, Error> {
        // Read before the query. Rows stamped after this instant reappear in
        // the next pull; a sync stamped earlier but committed after the read
        // is missed by both.
        let server_timestamp = self.clock.utc();
        let query = ExpenseQuery {
            visibility: Visibility::IncludeDeleted,
            changed_since: window.since,
            limit: window.limit,
            offset: window.offset,
        };
        let expenses = self
            .store
            .list_expenses(user_id, query)
            .await
            .map_err(map_store_error)?;
        let names = self.category_names(user_id, &expenses).await?;
        debug!(%user_id, count = expenses.len(), "incremental export");

        Ok(IncrementalSnapshot {
            expenses: render(expenses, &names),
            server_timestamp,
        })
    }

    async fn export_full(&self, user_id: &UserId) -> Result<FullSnapshot, Error> {
        let server_timestamp = self.clock.utc();
        let query = ExpenseQuery {
            visibility: Visibility::IncludeDeleted,
            ..ExpenseQuery::default()
        };
        let expenses = self
            .store
            .list_expenses(user_id, query)
            .await
            .map_err(map_store_error)?;
        let categories = self
            .store
            .list_categories(user_id)
            .await
            .map_err(map_store_error)?;
        let product_names = self
            .store
            .distinct_product_names(user_id, Visibility::IncludeDeleted)
            .await
            .map_err(map_store_error)?;
        let names = name_index(&categories);
        debug!(
            %user_id,
            expenses = expenses.len(),
            categories = categories.len(),
            "full export"
        );

        Ok(FullSnapshot {
            expenses: render(expenses, &names),
            categories,
            product_names,
            server_timestamp,
        })
    }
}

#[cfg(test)]
#[path = "snapshot_tests.rs"]
mod tests;
