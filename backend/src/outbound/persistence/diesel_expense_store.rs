//! PostgreSQL-backed expense store.
//!
//! Each [`ExpenseStore::begin`] checks a connection out of the pool, issues
//! `BEGIN`, and keeps the connection until the domain commits or rolls back.
//! A transaction dropped without either is discarded together with its
//! connection, since the pool refuses connections left mid-transaction.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use diesel::sql_types::Text;
use diesel_async::{AnsiTransactionManager, RunQueryDsl, TransactionManager};
use mockable::Clock;
use uuid::Uuid;

use crate::domain::ports::{
    ExpenseQuery, ExpenseStore, ExpenseStoreError, ExpenseTransaction, Visibility,
};
use crate::domain::timestamps::normalise;
use crate::domain::{
    Category, CategoryId, CategoryName, Expense, ExpenseChanges, ExpenseId, NewExpense, UserId,
};

use super::diesel_basic_error_mapping::{map_diesel_error, map_pool_error};
use super::models::{CategoryRow, ExpenseChangesRow, ExpenseRow, NewCategoryRow, NewExpenseRow};
use super::pool::{DbPool, OwnedConnection};
use super::schema::{categories, expenses};

diesel::define_sql_function! {
    /// SQL `lower()`, matching the case-folded unique index on categories.
    fn lower(value: Text) -> Text;
}

/// Diesel-backed implementation of the [`ExpenseStore`] port.
#[derive(Clone)]
pub struct DieselExpenseStore {
    pool: DbPool,
    clock: Arc<dyn Clock>,
}

impl DieselExpenseStore {
    /// Create a store over `pool`, stamping writes with `clock`.
    pub fn new(pool: DbPool, clock: Arc<dyn Clock>) -> Self {
        Self { pool, clock }
    }
}

fn convert_all<R, T>(rows: Vec<R>) -> Result<Vec<T>, ExpenseStoreError>
where
    T: TryFrom<R, Error = ExpenseStoreError>,
{
    rows.into_iter().map(T::try_from).collect()
}

fn id_values(ids: &[ExpenseId]) -> Vec<i64> {
    ids.iter().map(|id| id.get()).collect()
}

#[async_trait]
impl ExpenseStore for DieselExpenseStore {
    async fn begin(&self) -> Result<Box<dyn ExpenseTransaction>, ExpenseStoreError> {
        let mut conn = self.pool.get_owned().await.map_err(map_pool_error)?;
        AnsiTransactionManager::begin_transaction(&mut *conn)
            .await
            .map_err(map_diesel_error)?;
        Ok(Box::new(DieselExpenseTransaction {
            conn,
            clock: Arc::clone(&self.clock),
        }))
    }

    async fn list_expenses(
        &self,
        user_id: &UserId,
        query: ExpenseQuery,
    ) -> Result<Vec<Expense>, ExpenseStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut statement = expenses::table
            .filter(expenses::user_id.eq(user_id.as_uuid()))
            .select(ExpenseRow::as_select())
            .order(expenses::id.asc())
            .into_boxed();
        if query.visibility == Visibility::ActiveOnly {
            statement = statement.filter(expenses::deleted_at.is_null());
        }
        if let Some(since) = query.changed_since {
            statement = statement.filter(
                expenses::created_at
                    .ge(since)
                    .or(expenses::updated_at.ge(since))
                    .or(expenses::deleted_at.assume_not_null().ge(since)),
            );
        }
        if let Some(offset) = query.offset {
            statement = statement.offset(i64::from(offset));
        }
        if let Some(limit) = query.limit {
            statement = statement.limit(i64::from(limit));
        }

        let rows: Vec<ExpenseRow> = statement.load(&mut conn).await.map_err(map_diesel_error)?;
        convert_all(rows)
    }

    async fn list_categories(&self, user_id: &UserId) -> Result<Vec<Category>, ExpenseStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CategoryRow> = categories::table
            .filter(categories::user_id.eq(user_id.as_uuid()))
            .select(CategoryRow::as_select())
            .order(categories::id.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        convert_all(rows)
    }

    async fn find_categories(
        &self,
        user_id: &UserId,
        ids: &[CategoryId],
    ) -> Result<Vec<Category>, ExpenseStoreError> {
        let wanted: Vec<i64> = ids.iter().map(|id| id.get()).collect();
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let rows: Vec<CategoryRow> = categories::table
            .filter(categories::user_id.eq(user_id.as_uuid()))
            .filter(categories::id.eq_any(wanted))
            .select(CategoryRow::as_select())
            .order(categories::id.asc())
            .load(&mut conn)
            .await
            .map_err(map_diesel_error)?;
        convert_all(rows)
    }

    async fn distinct_product_names(
        &self,
        user_id: &UserId,
        visibility: Visibility,
    ) -> Result<Vec<String>, ExpenseStoreError> {
        let mut conn = self.pool.get().await.map_err(map_pool_error)?;
        let mut statement = expenses::table
            .filter(expenses::user_id.eq(user_id.as_uuid()))
            .select(expenses::product)
            .distinct()
            .order(expenses::product.asc())
            .into_boxed();
        if visibility == Visibility::ActiveOnly {
            statement = statement.filter(expenses::deleted_at.is_null());
        }
        statement.load(&mut conn).await.map_err(map_diesel_error)
    }
}

/// Open PostgreSQL transaction holding its pooled connection.
struct DieselExpenseTransaction {
    conn: OwnedConnection,
    clock: Arc<dyn Clock>,
}

impl DieselExpenseTransaction {
    fn now(&self) -> DateTime<Utc> {
        normalise(self.clock.utc())
    }
}

#[async_trait]
impl ExpenseTransaction for DieselExpenseTransaction {
    async fn find_category_by_name(
        &mut self,
        user_id: &UserId,
        normalized_name: &str,
    ) -> Result<Option<Category>, ExpenseStoreError> {
        let row: Option<CategoryRow> = categories::table
            .filter(categories::user_id.eq(user_id.as_uuid()))
            .filter(lower(categories::name).eq(normalized_name))
            .select(CategoryRow::as_select())
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Category::try_from).transpose()
    }

    async fn insert_category_if_absent(
        &mut self,
        user_id: &UserId,
        name: &CategoryName,
    ) -> Result<Option<Category>, ExpenseStoreError> {
        let row: Option<CategoryRow> = diesel::insert_into(categories::table)
            .values(NewCategoryRow {
                user_id: *user_id.as_uuid(),
                name: name.as_str(),
            })
            .on_conflict_do_nothing()
            .returning(CategoryRow::as_returning())
            .get_result(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.map(Category::try_from).transpose()
    }

    async fn insert_expense(&mut self, expense: &NewExpense) -> Result<Expense, ExpenseStoreError> {
        let now = self.now();
        let row: ExpenseRow = diesel::insert_into(expenses::table)
            .values(NewExpenseRow {
                user_id: *expense.user_id.as_uuid(),
                local_id: expense.local_id.as_ref().map(|id| id.as_str()),
                product: expense.product.as_str(),
                price: expense.price.amount(),
                category_id: expense.category_id.map(CategoryId::get),
                spent_at: normalise(expense.timestamp),
                created_at: now,
                updated_at: now,
            })
            .returning(ExpenseRow::as_returning())
            .get_result(&mut *self.conn)
            .await
            .map_err(map_diesel_error)?;
        Expense::try_from(row)
    }

    async fn find_expense(
        &mut self,
        user_id: &UserId,
        id: ExpenseId,
        visibility: Visibility,
    ) -> Result<Option<Expense>, ExpenseStoreError> {
        let row: Option<ExpenseRow> = expenses::table
            .filter(expenses::user_id.eq(user_id.as_uuid()))
            .filter(expenses::id.eq(id.get()))
            .select(ExpenseRow::as_select())
            .for_update()
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        row.filter(|found| visibility.admits(found.deleted_at.as_ref()))
            .map(Expense::try_from)
            .transpose()
    }

    async fn find_duplicate(
        &mut self,
        user_id: &UserId,
        normalized_product: &str,
        timestamp: DateTime<Utc>,
        exclude: ExpenseId,
    ) -> Result<Option<ExpenseId>, ExpenseStoreError> {
        let found: Option<i64> = expenses::table
            .filter(expenses::user_id.eq(user_id.as_uuid()))
            .filter(expenses::id.ne(exclude.get()))
            .filter(expenses::deleted_at.is_null())
            .filter(expenses::spent_at.eq(normalise(timestamp)))
            .filter(lower(expenses::product).eq(normalized_product))
            .select(expenses::id)
            .order(expenses::id.asc())
            .first(&mut *self.conn)
            .await
            .optional()
            .map_err(map_diesel_error)?;
        Ok(found.map(ExpenseId::new))
    }

    async fn update_expense(
        &mut self,
        user_id: &UserId,
        id: ExpenseId,
        changes: &ExpenseChanges,
    ) -> Result<Option<Expense>, ExpenseStoreError> {
        let now = self.now();
        let row: Option<ExpenseRow> = diesel::update(
            expenses::table
                .filter(expenses::user_id.eq(user_id.as_uuid()))
                .filter(expenses::id.eq(id.get()))
                .filter(expenses::deleted_at.is_null()),
        )
        .set((
            ExpenseChangesRow {
                product: changes.product.as_str(),
                price: changes.price.amount(),
                category_id: changes.category_id.map(CategoryId::get),
                spent_at: normalise(changes.timestamp),
            },
            expenses::updated_at.eq(now),
        ))
        .returning(ExpenseRow::as_returning())
        .get_result(&mut *self.conn)
        .await
        .optional()
        .map_err(map_diesel_error)?;
        row.map(Expense::try_from).transpose()
    }

    async fn soft_delete_expenses(
        &mut self,
        user_id: &UserId,
        ids: &[ExpenseId],
    ) -> Result<u64, ExpenseStoreError> {
        let now = self.now();
        let affected = diesel::update(
            expenses::table
                .filter(expenses::user_id.eq(user_id.as_uuid()))
                .filter(expenses::id.eq_any(id_values(ids)))
                .filter(expenses::deleted_at.is_null()),
        )
        .set((
            expenses::deleted_at.eq(Some(now)),
            expenses::updated_at.eq(now),
        ))
        .execute(&mut *self.conn)
        .await
        .map_err(map_diesel_error)?;
        u64::try_from(affected).map_err(|_| ExpenseStoreError::query("affected row count overflow"))
    }

    async fn commit(self: Box<Self>) -> Result<(), ExpenseStoreError> {
        let mut this = self;
        AnsiTransactionManager::commit_transaction(&mut *this.conn)
            .await
            .map_err(map_diesel_error)
    }

    async fn rollback(self: Box<Self>) -> Result<(), ExpenseStoreError> {
        let mut this = self;
        AnsiTransactionManager::rollback_transaction(&mut *this.conn)
            .await
            .map_err(map_diesel_error)
    }
}
