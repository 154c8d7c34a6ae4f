//! Validated sync request items.
//!
//! Inbound adapters build these only after every item of the request has
//! passed validation, so the orchestrator never starts a transaction for a
//! malformed batch.

use chrono::{DateTime, Utc};

use crate::domain::{CategoryName, ExpenseId, LocalId, Price, ProductName};

/// Expense created offline and not yet known to the server.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedExpense {
    pub local_id: LocalId,
    pub product: ProductName,
    pub price: Price,
    pub category: CategoryName,
    pub timestamp: DateTime<Utc>,
}

/// Client edit of an expense the server already knows.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedExpense {
    pub id: ExpenseId,
    pub product: ProductName,
    pub price: Price,
    pub category: CategoryName,
    pub timestamp: DateTime<Utc>,
}

/// One client sync call: creations, edits, and deletions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncBatch {
    pub created: Vec<CreatedExpense>,
    pub updated: Vec<UpdatedExpense>,
    pub deleted_ids: Vec<ExpenseId>,
}

impl SyncBatch {
    /// Whether the batch carries no operations at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted_ids.is_empty()
    }
}

/// Row of a full client upload used to overwrite or extend server state.
///
/// Rows with an `id` update that expense; rows with only a `local_id`
/// create one; rows with neither are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplacementExpense {
    pub id: Option<ExpenseId>,
    pub local_id: Option<LocalId>,
    pub product: ProductName,
    pub price: Price,
    pub category: CategoryName,
    pub timestamp: DateTime<Utc>,
}
