//! Collision check for incoming updates.

use chrono::{DateTime, Utc};

use crate::domain::ports::{ExpenseStoreError, ExpenseTransaction};
use crate::domain::{ExpenseId, ProductName, UserId};

/// Find another active expense of the user that the update would collide
/// with: same product ignoring case, same timestamp to the microsecond.
///
/// `updating` is excluded so an expense never collides with itself.
pub async fn find_collision(
    tx: &mut dyn ExpenseTransaction,
    user_id: &UserId,
    product: &ProductName,
    timestamp: DateTime<Utc>,
    updating: ExpenseId,
) -> Result<Option<ExpenseId>, ExpenseStoreError> {
    tx.find_duplicate(user_id, &product.normalized(), timestamp, updating)
        .await
}
