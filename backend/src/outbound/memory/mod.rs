//! Process-local adapters.
//!
//! Used when no database is configured (local development) and as a fast,
//! deterministic store for tests.

mod in_memory_expense_store;

pub use in_memory_expense_store::InMemoryExpenseStore;
#[cfg(any(test, feature = "test-support"))]
pub use in_memory_expense_store::{StoreFault, StoreOperation};
