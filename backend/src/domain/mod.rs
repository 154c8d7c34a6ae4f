//! Domain primitives, services, and ports for expense sync.
//!
//! Purpose: model users' expenses and categories, and the rules that
//! reconcile offline clients with the authoritative store. Nothing here
//! knows about HTTP or SQL; adapters plug in through [`ports`].
//!
//! Public surface:
//! - Error and ErrorCode: transport-agnostic failure payload.
//! - UserId: owner of every row.
//! - Expense, Category and their value types.
//! - sync: resolver, detector, conflict policy, orchestrator, exporter.

pub mod category;
pub mod error;
pub mod expense;
pub mod field_error;
pub mod ports;
pub mod sync;
pub mod timestamps;
pub mod trace_id;
pub mod user;

pub use self::category::{CATEGORY_NAME_MAX, Category, CategoryId, CategoryName};
pub use self::error::{Error, ErrorCode, ErrorValidationError, FieldViolation};
pub use self::expense::{
    Expense, ExpenseChanges, ExpenseId, LOCAL_ID_MAX, LocalId, NewExpense, PRODUCT_NAME_MAX,
    Price, ProductName,
};
pub use self::field_error::FieldError;
pub use self::timestamps::parse_client_timestamp;
pub use self::trace_id::{TRACE_ID_HEADER, TraceId};
pub use self::user::{UserId, UserIdError};
