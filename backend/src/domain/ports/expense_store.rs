//! Driven port for the transactional expense store.
//!
//! The sync core needs multi-statement atomicity: every write of one sync
//! call must become visible together or not at all. [`ExpenseStore::begin`]
//! hands out an [`ExpenseTransaction`] that owns the unit of work until it is
//! explicitly committed or rolled back. Read-only export queries run outside
//! a transaction.
//!
//! Every method takes the owning [`UserId`]; adapters must filter on it so
//! rows belonging to other users are indistinguishable from missing rows.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    Category, CategoryId, CategoryName, Expense, ExpenseChanges, ExpenseId, NewExpense, UserId,
};

use super::define_port_error;

define_port_error! {
    /// Errors raised by expense store adapters.
    pub enum ExpenseStoreError {
        /// The store could not be reached.
        Connection { message: String } =>
            "expense store connection failed: {message}",
        /// A query or mutation failed during execution.
        Query { message: String } =>
            "expense store query failed: {message}",
    }
}

/// Whether soft-deleted rows take part in a query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    /// Only rows without a `deleted_at` marker.
    #[default]
    ActiveOnly,
    /// Active and soft-deleted rows alike.
    IncludeDeleted,
}

impl Visibility {
    /// Whether a row with the given deletion marker is visible.
    #[must_use]
    pub const fn admits(self, deleted_at: Option<&DateTime<Utc>>) -> bool {
        match self {
            Self::ActiveOnly => deleted_at.is_none(),
            Self::IncludeDeleted => true,
        }
    }
}

/// Filter and page selection for [`ExpenseStore::list_expenses`].
///
/// Results are always ordered by expense id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExpenseQuery {
    pub visibility: Visibility,
    /// Keep rows created, updated, or deleted at or after this instant.
    pub changed_since: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

/// Read side of the expense store and factory for write transactions.
#[async_trait]
pub trait ExpenseStore: Send + Sync {
    /// Open a new unit of work.
    async fn begin(&self) -> Result<Box<dyn ExpenseTransaction>, ExpenseStoreError>;

    /// List the user's expenses matching `query`, ordered by id.
    async fn list_expenses(
        &self,
        user_id: &UserId,
        query: ExpenseQuery,
    ) -> Result<Vec<Expense>, ExpenseStoreError>;

    /// All of the user's categories, ordered by id.
    async fn list_categories(&self, user_id: &UserId) -> Result<Vec<Category>, ExpenseStoreError>;

    /// Fetch the user's categories with the given ids in a single lookup.
    async fn find_categories(
        &self,
        user_id: &UserId,
        ids: &[CategoryId],
    ) -> Result<Vec<Category>, ExpenseStoreError>;

    /// Distinct product names used by the user, sorted.
    async fn distinct_product_names(
        &self,
        user_id: &UserId,
        visibility: Visibility,
    ) -> Result<Vec<String>, ExpenseStoreError>;
}

/// An open unit of work against the expense store.
///
/// Callers must finish every transaction with [`commit`] or [`rollback`].
/// Dropping an unfinished transaction discards its writes.
///
/// [`commit`]: ExpenseTransaction::commit
/// [`rollback`]: ExpenseTransaction::rollback
#[async_trait]
pub trait ExpenseTransaction: Send {
    /// Look up a category by its case-folded name.
    async fn find_category_by_name(
        &mut self,
        user_id: &UserId,
        normalized_name: &str,
    ) -> Result<Option<Category>, ExpenseStoreError>;

    /// Insert a category unless one with the same case-folded name exists.
    ///
    /// Returns `None` when the uniqueness constraint rejected the insert,
    /// which happens when a concurrent writer created the category first.
    async fn insert_category_if_absent(
        &mut self,
        user_id: &UserId,
        name: &CategoryName,
    ) -> Result<Option<Category>, ExpenseStoreError>;

    /// Insert a new expense and return the stored row.
    async fn insert_expense(&mut self, expense: &NewExpense) -> Result<Expense, ExpenseStoreError>;

    /// Fetch one of the user's expenses.
    async fn find_expense(
        &mut self,
        user_id: &UserId,
        id: ExpenseId,
        visibility: Visibility,
    ) -> Result<Option<Expense>, ExpenseStoreError>;

    /// Find an active expense, other than `exclude`, whose case-folded
    /// product and timestamp both match.
    async fn find_duplicate(
        &mut self,
        user_id: &UserId,
        normalized_product: &str,
        timestamp: DateTime<Utc>,
        exclude: ExpenseId,
    ) -> Result<Option<ExpenseId>, ExpenseStoreError>;

    /// Overwrite the client-editable fields of an active expense and bump
    /// `updated_at`. Returns `None` when no such expense exists.
    async fn update_expense(
        &mut self,
        user_id: &UserId,
        id: ExpenseId,
        changes: &ExpenseChanges,
    ) -> Result<Option<Expense>, ExpenseStoreError>;

    /// Soft-delete the user's active expenses among `ids`, setting
    /// `deleted_at` and bumping `updated_at`. Returns the affected count.
    async fn soft_delete_expenses(
        &mut self,
        user_id: &UserId,
        ids: &[ExpenseId],
    ) -> Result<u64, ExpenseStoreError>;

    /// Make every write of this transaction visible.
    async fn commit(self: Box<Self>) -> Result<(), ExpenseStoreError>;

    /// Discard every write of this transaction.
    async fn rollback(self: Box<Self>) -> Result<(), ExpenseStoreError>;
}
