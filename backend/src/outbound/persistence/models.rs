//! Internal Diesel row structs for database operations.
//!
//! These types are implementation details of the persistence layer and must
//! never be exposed to the domain. Conversions into domain types re-validate
//! every field so a corrupt row surfaces as a query error instead of a panic.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::domain::ports::ExpenseStoreError;
use crate::domain::{
    Category, CategoryId, CategoryName, Expense, ExpenseId, FieldError, LocalId, Price,
    ProductName, UserId,
};

use super::schema::{categories, expenses};

/// Row struct for reading from the categories table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct CategoryRow {
    pub id: i64,
    pub user_id: Uuid,
    pub name: String,
}

/// Insertable struct for creating category records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = categories)]
pub(crate) struct NewCategoryRow<'a> {
    pub user_id: Uuid,
    pub name: &'a str,
}

/// Row struct for reading from the expenses table.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = expenses)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct ExpenseRow {
    pub id: i64,
    pub user_id: Uuid,
    pub local_id: Option<String>,
    pub product: String,
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub spent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Insertable struct for creating expense records.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = expenses)]
pub(crate) struct NewExpenseRow<'a> {
    pub user_id: Uuid,
    pub local_id: Option<&'a str>,
    pub product: &'a str,
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub spent_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Changeset applied by client edits.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = expenses)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct ExpenseChangesRow<'a> {
    pub product: &'a str,
    pub price: Decimal,
    pub category_id: Option<i64>,
    pub spent_at: DateTime<Utc>,
}

fn corrupt(column: &str, error: FieldError) -> ExpenseStoreError {
    ExpenseStoreError::query(format!("stored {column} is invalid: {error}"))
}

impl TryFrom<CategoryRow> for Category {
    type Error = ExpenseStoreError;

    fn try_from(row: CategoryRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CategoryId::new(row.id),
            user_id: UserId::from_uuid(row.user_id),
            name: CategoryName::new(&row.name).map_err(|err| corrupt("category name", err))?,
        })
    }
}

impl TryFrom<ExpenseRow> for Expense {
    type Error = ExpenseStoreError;

    fn try_from(row: ExpenseRow) -> Result<Self, Self::Error> {
        let local_id = row
            .local_id
            .map(LocalId::new)
            .transpose()
            .map_err(|err| corrupt("local id", err))?;
        Ok(Self {
            id: ExpenseId::new(row.id),
            user_id: UserId::from_uuid(row.user_id),
            local_id,
            product: ProductName::new(&row.product).map_err(|err| corrupt("product", err))?,
            price: Price::new(row.price).map_err(|err| corrupt("price", err))?,
            category_id: row.category_id.map(CategoryId::new),
            timestamp: row.spent_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}
