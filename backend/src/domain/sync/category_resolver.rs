//! Case-insensitive find-or-create for categories.

use std::collections::HashMap;

use tracing::debug;

use crate::domain::ports::{ExpenseStoreError, ExpenseTransaction};
use crate::domain::{CategoryId, CategoryName, UserId};

/// Resolves category names to ids for one user inside one transaction.
///
/// Results are memoised by case-folded name, so a batch naming "Food" and
/// "food" costs one lookup and never inserts twice. Concurrent writers are
/// arbitrated by the store's uniqueness constraint: losing that race falls
/// back to reading the winner's row.
#[derive(Debug)]
pub struct CategoryResolver {
    user_id: UserId,
    resolved: HashMap<String, CategoryId>,
}

impl CategoryResolver {
    /// Start with an empty memo for `user_id`.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self {
            user_id,
            resolved: HashMap::new(),
        }
    }

    /// Return the id of the user's category matching `name`, creating it with
    /// the given casing if absent.
    pub async fn resolve(
        &mut self,
        tx: &mut dyn ExpenseTransaction,
        name: &CategoryName,
    ) -> Result<CategoryId, ExpenseStoreError> {
        let key = name.normalized();
        if let Some(id) = self.resolved.get(&key) {
            return Ok(*id);
        }

        let id = self.find_or_create(tx, name, &key).await?;
        self.resolved.insert(key, id);
        Ok(id)
    }

    async fn find_or_create(
        &self,
        tx: &mut dyn ExpenseTransaction,
        name: &CategoryName,
        key: &str,
    ) -> Result<CategoryId, ExpenseStoreError> {
        if let Some(existing) = tx.find_category_by_name(&self.user_id, key).await? {
            return Ok(existing.id);
        }

        if let Some(created) = tx.insert_category_if_absent(&self.user_id, name).await? {
            debug!(user_id = %self.user_id, category_id = %created.id, "created category");
            return Ok(created.id);
        }

        debug!(user_id = %self.user_id, "category insert lost a race; re-reading");
        tx.find_category_by_name(&self.user_id, key)
            .await?
            .map(|category| category.id)
            .ok_or_else(|| {
                ExpenseStoreError::query(format!(
                    "category {name} rejected as duplicate but not found"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use std::sync::Arc;

    use super::*;
    use crate::domain::ports::ExpenseStore;
    use crate::outbound::memory::InMemoryExpenseStore;
    use crate::test_support::fixed_clock;
    use rstest::rstest;

    fn name(raw: &str) -> CategoryName {
        CategoryName::new(raw).expect("valid category name")
    }

    #[rstest]
    #[tokio::test]
    async fn differently_cased_names_share_one_category() {
        let store = InMemoryExpenseStore::new(Arc::new(fixed_clock()));
        let user = UserId::random();
        let mut tx = store.begin().await.expect("begin");
        let mut resolver = CategoryResolver::new(user);

        let first = resolver.resolve(tx.as_mut(), &name("Food")).await.expect("resolve");
        let second = resolver.resolve(tx.as_mut(), &name("FOOD")).await.expect("resolve");
        tx.commit().await.expect("commit");

        assert_eq!(first, second);
        let categories = store.list_categories(&user).await.expect("list");
        assert_eq!(categories.len(), 1);
        assert_eq!(categories.first().map(|c| c.name.as_str()), Some("Food"));
    }

    #[rstest]
    #[tokio::test]
    async fn reuses_categories_from_earlier_transactions() {
        let store = InMemoryExpenseStore::new(Arc::new(fixed_clock()));
        let user = UserId::random();

        let mut tx = store.begin().await.expect("begin");
        let first = CategoryResolver::new(user)
            .resolve(tx.as_mut(), &name("Rent"))
            .await
            .expect("resolve");
        tx.commit().await.expect("commit");

        let mut tx = store.begin().await.expect("begin");
        let second = CategoryResolver::new(user)
            .resolve(tx.as_mut(), &name("rent"))
            .await
            .expect("resolve");
        tx.commit().await.expect("commit");

        assert_eq!(first, second);
    }

    #[rstest]
    #[tokio::test]
    async fn categories_are_scoped_per_user() {
        let store = InMemoryExpenseStore::new(Arc::new(fixed_clock()));
        let mut tx = store.begin().await.expect("begin");

        let alice = CategoryResolver::new(UserId::random())
            .resolve(tx.as_mut(), &name("Food"))
            .await
            .expect("resolve");
        let bob = CategoryResolver::new(UserId::random())
            .resolve(tx.as_mut(), &name("Food"))
            .await
            .expect("resolve");

        assert_ne!(alice, bob);
    }
}
