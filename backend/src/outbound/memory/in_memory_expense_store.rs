//! In-memory `ExpenseStore` implementation.
//!
//! A transaction takes the store lock for its whole lifetime and works on a
//! private copy of the state; commit swaps the copy in, rollback (or drop)
//! discards it. Transactions are therefore fully serialised, which trivially
//! satisfies the atomicity and category-uniqueness requirements.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use mockable::Clock;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::ports::{
    ExpenseQuery, ExpenseStore, ExpenseStoreError, ExpenseTransaction, Visibility,
};
use crate::domain::timestamps::normalise;
use crate::domain::{
    Category, CategoryId, CategoryName, Expense, ExpenseChanges, ExpenseId, NewExpense, UserId,
};

/// Store operations that can be made to fail in tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    Begin,
    InsertCategory,
    InsertExpense,
    UpdateExpense,
    SoftDelete,
    Commit,
}

/// Fail the `operation` once it has succeeded `after` times.
#[cfg_attr(
    not(any(test, feature = "test-support")),
    expect(dead_code, reason = "constructed only by tests")
)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreFault {
    pub operation: StoreOperation,
    pub after: usize,
}

type FaultSlot = Arc<Mutex<Option<StoreFault>>>;

fn trip(faults: &FaultSlot, operation: StoreOperation) -> Result<(), ExpenseStoreError> {
    let mut slot = faults.lock().unwrap_or_else(PoisonError::into_inner);
    match slot.as_mut() {
        Some(fault) if fault.operation == operation => {
            if fault.after == 0 {
                *slot = None;
                return Err(ExpenseStoreError::query(format!(
                    "injected fault during {operation:?}"
                )));
            }
            fault.after -= 1;
            Ok(())
        }
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    last_expense_id: i64,
    last_category_id: i64,
    expenses: BTreeMap<ExpenseId, Expense>,
    categories: BTreeMap<CategoryId, Category>,
}

impl StoreState {
    fn owned_expenses<'a>(
        &'a self,
        user_id: &'a UserId,
        visibility: Visibility,
    ) -> impl Iterator<Item = &'a Expense> + 'a {
        self.expenses.values().filter(move |expense| {
            expense.user_id == *user_id && visibility.admits(expense.deleted_at.as_ref())
        })
    }

    fn owned_categories<'a>(
        &'a self,
        user_id: &'a UserId,
    ) -> impl Iterator<Item = &'a Category> + 'a {
        self.categories
            .values()
            .filter(move |category| category.user_id == *user_id)
    }

    fn active_expense_mut(&mut self, user_id: &UserId, id: ExpenseId) -> Option<&mut Expense> {
        self.expenses
            .get_mut(&id)
            .filter(|expense| expense.user_id == *user_id && !expense.is_deleted())
    }
}

fn changed_since(expense: &Expense, since: DateTime<Utc>) -> bool {
    expense.created_at >= since
        || expense.updated_at >= since
        || expense.deleted_at.is_some_and(|deleted| deleted >= since)
}

fn to_usize(value: Option<u32>) -> Option<usize> {
    value.and_then(|raw| usize::try_from(raw).ok())
}

/// Expense store held in process memory.
#[derive(Clone)]
pub struct InMemoryExpenseStore {
    state: Arc<AsyncMutex<StoreState>>,
    clock: Arc<dyn Clock>,
    faults: FaultSlot,
}

impl InMemoryExpenseStore {
    /// Create an empty store stamping writes with `clock`.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(AsyncMutex::new(StoreState::default())),
            clock,
            faults: Arc::new(Mutex::new(None)),
        }
    }

    /// Arrange for a future operation to fail.
    #[cfg(any(test, feature = "test-support"))]
    pub fn inject_fault(&self, fault: StoreFault) {
        *self.faults.lock().unwrap_or_else(PoisonError::into_inner) = Some(fault);
    }
}

#[async_trait]
impl ExpenseStore for InMemoryExpenseStore {
    async fn begin(&self) -> Result<Box<dyn ExpenseTransaction>, ExpenseStoreError> {
        trip(&self.faults, StoreOperation::Begin)?;
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryTransaction {
            guard,
            working,
            clock: Arc::clone(&self.clock),
            faults: Arc::clone(&self.faults),
        }))
    }

    async fn list_expenses(
        &self,
        user_id: &UserId,
        query: ExpenseQuery,
    ) -> Result<Vec<Expense>, ExpenseStoreError> {
        let state = self.state.lock().await;
        let matching = state
            .owned_expenses(user_id, query.visibility)
            .filter(|expense| query.changed_since.is_none_or(|since| changed_since(expense, since)))
            .skip(to_usize(query.offset).unwrap_or(0));
        Ok(match to_usize(query.limit) {
            Some(limit) => matching.take(limit).cloned().collect(),
            None => matching.cloned().collect(),
        })
    }

    async fn list_categories(&self, user_id: &UserId) -> Result<Vec<Category>, ExpenseStoreError> {
        let state = self.state.lock().await;
        Ok(state.owned_categories(user_id).cloned().collect())
    }

    async fn find_categories(
        &self,
        user_id: &UserId,
        ids: &[CategoryId],
    ) -> Result<Vec<Category>, ExpenseStoreError> {
        let state = self.state.lock().await;
        Ok(state
            .owned_categories(user_id)
            .filter(|category| ids.contains(&category.id))
            .cloned()
            .collect())
    }

    async fn distinct_product_names(
        &self,
        user_id: &UserId,
        visibility: Visibility,
    ) -> Result<Vec<String>, ExpenseStoreError> {
        let state = self.state.lock().await;
        let names: BTreeSet<String> = state
            .owned_expenses(user_id, visibility)
            .map(|expense| expense.product.as_str().to_owned())
            .collect();
        Ok(names.into_iter().collect())
    }
}

struct InMemoryTransaction {
    guard: OwnedMutexGuard<StoreState>,
    working: StoreState,
    clock: Arc<dyn Clock>,
    faults: FaultSlot,
}

impl InMemoryTransaction {
    fn now(&self) -> DateTime<Utc> {
        normalise(self.clock.utc())
    }
}

#[async_trait]
impl ExpenseTransaction for InMemoryTransaction {
    async fn find_category_by_name(
        &mut self,
        user_id: &UserId,
        normalized_name: &str,
    ) -> Result<Option<Category>, ExpenseStoreError> {
        Ok(self
            .working
            .owned_categories(user_id)
            .find(|category| category.name.normalized() == normalized_name)
            .cloned())
    }

    async fn insert_category_if_absent(
        &mut self,
        user_id: &UserId,
        name: &CategoryName,
    ) -> Result<Option<Category>, ExpenseStoreError> {
        trip(&self.faults, StoreOperation::InsertCategory)?;
        let key = name.normalized();
        if self
            .working
            .owned_categories(user_id)
            .any(|category| category.name.normalized() == key)
        {
            return Ok(None);
        }

        self.working.last_category_id += 1;
        let category = Category {
            id: CategoryId::new(self.working.last_category_id),
            user_id: *user_id,
            name: name.clone(),
        };
        self.working.categories.insert(category.id, category.clone());
        Ok(Some(category))
    }

    async fn insert_expense(&mut self, expense: &NewExpense) -> Result<Expense, ExpenseStoreError> {
        trip(&self.faults, StoreOperation::InsertExpense)?;
        let now = self.now();
        self.working.last_expense_id += 1;
        let stored = Expense {
            id: ExpenseId::new(self.working.last_expense_id),
            user_id: expense.user_id,
            local_id: expense.local_id.clone(),
            product: expense.product.clone(),
            price: expense.price,
            category_id: expense.category_id,
            timestamp: expense.timestamp,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.working.expenses.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn find_expense(
        &mut self,
        user_id: &UserId,
        id: ExpenseId,
        visibility: Visibility,
    ) -> Result<Option<Expense>, ExpenseStoreError> {
        Ok(self
            .working
            .owned_expenses(user_id, visibility)
            .find(|expense| expense.id == id)
            .cloned())
    }

    async fn find_duplicate(
        &mut self,
        user_id: &UserId,
        normalized_product: &str,
        timestamp: DateTime<Utc>,
        exclude: ExpenseId,
    ) -> Result<Option<ExpenseId>, ExpenseStoreError> {
        Ok(self
            .working
            .owned_expenses(user_id, Visibility::ActiveOnly)
            .find(|expense| {
                expense.id != exclude
                    && expense.timestamp == timestamp
                    && expense.product.normalized() == normalized_product
            })
            .map(|expense| expense.id))
    }

    async fn update_expense(
        &mut self,
        user_id: &UserId,
        id: ExpenseId,
        changes: &ExpenseChanges,
    ) -> Result<Option<Expense>, ExpenseStoreError> {
        trip(&self.faults, StoreOperation::UpdateExpense)?;
        let now = self.now();
        Ok(self.working.active_expense_mut(user_id, id).map(|expense| {
            expense.product = changes.product.clone();
            expense.price = changes.price;
            expense.category_id = changes.category_id;
            expense.timestamp = changes.timestamp;
            expense.updated_at = now;
            expense.clone()
        }))
    }

    async fn soft_delete_expenses(
        &mut self,
        user_id: &UserId,
        ids: &[ExpenseId],
    ) -> Result<u64, ExpenseStoreError> {
        trip(&self.faults, StoreOperation::SoftDelete)?;
        let now = self.now();
        let targets: BTreeSet<ExpenseId> = ids.iter().copied().collect();
        let mut affected = 0;
        for id in targets {
            if let Some(expense) = self.working.active_expense_mut(user_id, id) {
                expense.deleted_at = Some(now);
                expense.updated_at = now;
                affected += 1;
            }
        }
        Ok(affected)
    }

    async fn commit(self: Box<Self>) -> Result<(), ExpenseStoreError> {
        trip(&self.faults, StoreOperation::Commit)?;
        let Self {
            mut guard, working, ..
        } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), ExpenseStoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::test_support::{MutableClock, fixed_clock, new_expense, utc};
    use rstest::{fixture, rstest};

    #[fixture]
    fn clock() -> Arc<MutableClock> {
        Arc::new(fixed_clock())
    }

    fn store_with(clock: &Arc<MutableClock>) -> InMemoryExpenseStore {
        InMemoryExpenseStore::new(Arc::clone(clock) as Arc<dyn Clock>)
    }

    #[rstest]
    #[tokio::test]
    async fn rollback_discards_writes(clock: Arc<MutableClock>) {
        let store = store_with(&clock);
        let user = UserId::random();
        let mut tx = store.begin().await.expect("begin");
        tx.insert_expense(&new_expense(user, "Milk", "2024-01-01T00:00:00Z"))
            .await
            .expect("insert");
        tx.rollback().await.expect("rollback");

        let listed = store
            .list_expenses(&user, ExpenseQuery::default())
            .await
            .expect("list");
        assert!(listed.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn soft_delete_bumps_updated_at_and_skips_foreign_rows(clock: Arc<MutableClock>) {
        let store = store_with(&clock);
        let user = UserId::random();
        let other = UserId::random();
        let mut tx = store.begin().await.expect("begin");
        let mine = tx
            .insert_expense(&new_expense(user, "Milk", "2024-01-01T00:00:00Z"))
            .await
            .expect("insert");
        let theirs = tx
            .insert_expense(&new_expense(other, "Milk", "2024-01-01T00:00:00Z"))
            .await
            .expect("insert");
        clock.advance_seconds(60);
        let affected = tx
            .soft_delete_expenses(&user, &[mine.id, mine.id, theirs.id])
            .await
            .expect("delete");
        tx.commit().await.expect("commit");

        assert_eq!(affected, 1);
        let query = ExpenseQuery {
            visibility: Visibility::IncludeDeleted,
            ..ExpenseQuery::default()
        };
        let listed = store.list_expenses(&user, query).await.expect("list");
        let deleted = listed.first().expect("one row");
        assert_eq!(deleted.deleted_at, Some(clock.utc()));
        assert_eq!(deleted.updated_at, clock.utc());
        let foreign = store.list_expenses(&other, query).await.expect("list");
        assert!(foreign.iter().all(|expense| expense.deleted_at.is_none()));
    }

    #[rstest]
    #[tokio::test]
    async fn list_filters_by_change_window_and_pages_by_id(clock: Arc<MutableClock>) {
        let store = store_with(&clock);
        let user = UserId::random();
        let mut tx = store.begin().await.expect("begin");
        for product in ["A", "B", "C"] {
            tx.insert_expense(&new_expense(user, product, "2024-01-01T00:00:00Z"))
                .await
                .expect("insert");
        }
        clock.advance_seconds(10);
        let watermark = clock.utc();
        for product in ["D", "E"] {
            tx.insert_expense(&new_expense(user, product, "2024-01-01T00:00:00Z"))
                .await
                .expect("insert");
        }
        tx.commit().await.expect("commit");

        let query = ExpenseQuery {
            changed_since: Some(watermark),
            limit: Some(1),
            offset: Some(1),
            ..ExpenseQuery::default()
        };
        let page = store.list_expenses(&user, query).await.expect("list");
        let products: Vec<&str> = page.iter().map(|e| e.product.as_str()).collect();
        assert_eq!(products, vec!["E"]);
    }

    #[rstest]
    #[tokio::test]
    async fn injected_fault_fires_after_configured_successes(clock: Arc<MutableClock>) {
        let store = store_with(&clock);
        let user = UserId::random();
        store.inject_fault(StoreFault {
            operation: StoreOperation::InsertExpense,
            after: 1,
        });
        let mut tx = store.begin().await.expect("begin");
        tx.insert_expense(&new_expense(user, "A", "2024-01-01T00:00:00Z"))
            .await
            .expect("first insert succeeds");
        let failure = tx
            .insert_expense(&new_expense(user, "B", "2024-01-01T00:00:00Z"))
            .await
            .expect_err("second insert fails");
        assert!(matches!(failure, ExpenseStoreError::Query { .. }));
        tx.insert_expense(&new_expense(user, "C", "2024-01-01T00:00:00Z"))
            .await
            .expect("fault fires once");
    }

    #[rstest]
    #[tokio::test]
    async fn product_names_are_distinct_and_sorted(clock: Arc<MutableClock>) {
        let store = store_with(&clock);
        let user = UserId::random();
        let mut tx = store.begin().await.expect("begin");
        for product in ["Milk", "Bread", "Milk"] {
            tx.insert_expense(&new_expense(user, product, "2024-01-01T00:00:00Z"))
                .await
                .expect("insert");
        }
        tx.commit().await.expect("commit");

        let names = store
            .distinct_product_names(&user, Visibility::IncludeDeleted)
            .await
            .expect("names");
        assert_eq!(names, vec!["Bread".to_owned(), "Milk".to_owned()]);
    }

    #[rstest]
    #[tokio::test]
    async fn update_ignores_deleted_expenses(clock: Arc<MutableClock>) {
        let store = store_with(&clock);
        let user = UserId::random();
        let mut tx = store.begin().await.expect("begin");
        let stored = tx
            .insert_expense(&new_expense(user, "Milk", "2024-01-01T00:00:00Z"))
            .await
            .expect("insert");
        tx.soft_delete_expenses(&user, &[stored.id]).await.expect("delete");
        let changes = ExpenseChanges {
            product: stored.product.clone(),
            price: stored.price,
            category_id: None,
            timestamp: utc("2024-02-01T00:00:00Z"),
        };

        let updated = tx
            .update_expense(&user, stored.id, &changes)
            .await
            .expect("update");
        assert!(updated.is_none());
    }
}
