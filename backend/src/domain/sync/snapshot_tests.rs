//! Tests for incremental and full exports.

use std::sync::Arc;

use super::*;
use crate::domain::ports::{ExpenseStoreError, ExpenseTransaction, SyncCommand};
use crate::domain::sync::{CreatedExpense, SyncBatch, SyncService};
use crate::domain::{CategoryName, ErrorCode, LocalId};
use crate::outbound::memory::InMemoryExpenseStore;
use crate::test_support::{MutableClock, fixed_clock, utc};
use rstest::{fixture, rstest};

struct Harness {
    clock: Arc<MutableClock>,
    sync: SyncService<InMemoryExpenseStore>,
    snapshots: SnapshotService<InMemoryExpenseStore>,
    user: UserId,
}

impl Harness {
    async fn create(&self, local_id: &str, product: &str, category: &str) -> ExpenseId {
        let batch = SyncBatch {
            created: vec![CreatedExpense {
                local_id: LocalId::new(local_id).expect("valid local id"),
                product: ProductName::new(product).expect("valid product"),
                price: Price::from_f64(4.2).expect("valid price"),
                category: CategoryName::new(category).expect("valid category"),
                timestamp: utc("2024-05-01T09:30:00Z"),
            }],
            ..SyncBatch::default()
        };
        let report = self.sync.run_sync(&self.user, batch).await.expect("create");
        report
            .created_map
            .first()
            .map(|mapping| mapping.server_id)
            .expect("created mapping")
    }

    async fn delete(&self, id: ExpenseId) {
        let batch = SyncBatch {
            deleted_ids: vec![id],
            ..SyncBatch::default()
        };
        self.sync.run_sync(&self.user, batch).await.expect("delete");
    }
}

#[fixture]
fn harness() -> Harness {
    let clock = Arc::new(fixed_clock());
    let store = Arc::new(InMemoryExpenseStore::new(clock.clone()));
    Harness {
        sync: SyncService::new(Arc::clone(&store)),
        snapshots: SnapshotService::new(store, clock.clone()),
        clock,
        user: UserId::random(),
    }
}

fn ids(expenses: &[ExpenseSnapshot]) -> Vec<ExpenseId> {
    expenses.iter().map(|expense| expense.id).collect()
}

#[rstest]
#[tokio::test]
async fn incremental_export_is_inclusive_of_since(harness: Harness) {
    let early = harness.create("a", "Milk", "Food").await;
    harness.clock.advance_seconds(60);
    let late = harness.create("b", "Bread", "Food").await;
    let boundary = harness.clock.utc();

    let window = SnapshotWindow {
        since: Some(boundary),
        ..SnapshotWindow::default()
    };
    let snapshot = harness
        .snapshots
        .export_incremental(&harness.user, window)
        .await
        .expect("export");

    assert_eq!(ids(&snapshot.expenses), vec![late]);
    assert_ne!(early, late);
}

#[rstest]
#[tokio::test]
async fn incremental_export_reports_deletions(harness: Harness) {
    let id = harness.create("a", "Milk", "Food").await;
    harness.clock.advance_seconds(60);
    let since = harness.clock.utc();
    harness.delete(id).await;

    let window = SnapshotWindow {
        since: Some(since),
        ..SnapshotWindow::default()
    };
    let snapshot = harness
        .snapshots
        .export_incremental(&harness.user, window)
        .await
        .expect("export");

    let row = snapshot.expenses.first().expect("deleted row exported");
    assert_eq!(row.id, id);
    assert_eq!(row.deleted_at, Some(since));
    assert_eq!(row.category.as_deref(), Some("Food"));
}

#[rstest]
#[tokio::test]
async fn incremental_export_pages_results(harness: Harness) {
    let first = harness.create("a", "Milk", "Food").await;
    let second = harness.create("b", "Bread", "Food").await;
    let third = harness.create("c", "Eggs", "Food").await;

    let window = SnapshotWindow {
        since: None,
        limit: Some(1),
        offset: Some(1),
    };
    let snapshot = harness
        .snapshots
        .export_incremental(&harness.user, window)
        .await
        .expect("export");

    assert_eq!(ids(&snapshot.expenses), vec![second]);
    assert_ne!(first, third);
}

#[rstest]
#[tokio::test]
async fn watermark_is_taken_from_the_clock(harness: Harness) {
    harness.clock.set(utc("2025-03-04T05:06:07Z"));

    let snapshot = harness
        .snapshots
        .export_incremental(&harness.user, SnapshotWindow::default())
        .await
        .expect("export");

    assert!(snapshot.expenses.is_empty());
    assert_eq!(snapshot.server_timestamp, utc("2025-03-04T05:06:07Z"));
}

#[rstest]
#[tokio::test]
async fn rows_stamped_at_the_watermark_reappear_in_the_next_pull(harness: Harness) {
    let first = harness
        .snapshots
        .export_incremental(&harness.user, SnapshotWindow::default())
        .await
        .expect("export");
    let written = harness.create("a", "Milk", "Food").await;

    let window = SnapshotWindow {
        since: Some(first.server_timestamp),
        ..SnapshotWindow::default()
    };
    let next = harness
        .snapshots
        .export_incremental(&harness.user, window)
        .await
        .expect("export");

    assert!(first.expenses.is_empty());
    assert_eq!(ids(&next.expenses), vec![written]);
}

#[rstest]
#[tokio::test]
async fn full_export_lists_categories_and_product_names(harness: Harness) {
    harness.create("a", "Milk", "Food").await;
    harness.create("b", "Bus ticket", "Travel").await;
    let gone = harness.create("c", "Apples", "food").await;
    harness.delete(gone).await;
    let stranger = UserId::random();

    let snapshot = harness
        .snapshots
        .export_full(&harness.user)
        .await
        .expect("export");

    assert_eq!(snapshot.expenses.len(), 3);
    let categories: Vec<&str> = snapshot
        .categories
        .iter()
        .map(|category| category.name.as_str())
        .collect();
    assert_eq!(categories, vec!["Food", "Travel"]);
    assert_eq!(
        snapshot.product_names,
        vec!["Apples".to_owned(), "Bus ticket".to_owned(), "Milk".to_owned()]
    );

    let empty = harness
        .snapshots
        .export_full(&stranger)
        .await
        .expect("export");
    assert!(empty.expenses.is_empty());
    assert!(empty.categories.is_empty());
}

struct OfflineStore;

fn offline() -> ExpenseStoreError {
    ExpenseStoreError::connection("refused")
}

#[async_trait]
impl ExpenseStore for OfflineStore {
    async fn begin(&self) -> Result<Box<dyn ExpenseTransaction>, ExpenseStoreError> {
        Err(offline())
    }

    async fn list_expenses(
        &self,
        _user_id: &UserId,
        _query: ExpenseQuery,
    ) -> Result<Vec<Expense>, ExpenseStoreError> {
        Err(offline())
    }

    async fn list_categories(&self, _user_id: &UserId) -> Result<Vec<Category>, ExpenseStoreError> {
        Err(offline())
    }

    async fn find_categories(
        &self,
        _user_id: &UserId,
        _ids: &[CategoryId],
    ) -> Result<Vec<Category>, ExpenseStoreError> {
        Err(offline())
    }

    async fn distinct_product_names(
        &self,
        _user_id: &UserId,
        _visibility: Visibility,
    ) -> Result<Vec<String>, ExpenseStoreError> {
        Err(offline())
    }
}

#[rstest]
#[tokio::test]
async fn unreachable_store_maps_to_service_unavailable() {
    let service = SnapshotService::new(Arc::new(OfflineStore), Arc::new(fixed_clock()));

    let error = service
        .export_full(&UserId::random())
        .await
        .expect_err("offline store fails");

    assert_eq!(error.code(), ErrorCode::ServiceUnavailable);
}
