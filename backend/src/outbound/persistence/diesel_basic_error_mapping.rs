//! Mapping from pool and Diesel failures onto expense store errors.

use diesel::result::{DatabaseErrorKind, Error as DieselError};
use tracing::debug;

use crate::domain::ports::ExpenseStoreError;

use super::pool::PoolError;

/// Pool failures mean the database is unreachable.
pub(super) fn map_pool_error(error: PoolError) -> ExpenseStoreError {
    match error {
        PoolError::Checkout { message } | PoolError::Build { message } => {
            ExpenseStoreError::connection(message)
        }
    }
}

/// Map Diesel errors, logging database detail at debug level only.
pub(super) fn map_diesel_error(error: DieselError) -> ExpenseStoreError {
    match &error {
        DieselError::DatabaseError(kind, info) => {
            debug!(?kind, message = info.message(), "diesel operation failed");
        }
        _ => debug!(error = %error, "diesel operation failed"),
    }

    match error {
        DieselError::NotFound => ExpenseStoreError::query("record not found"),
        DieselError::DatabaseError(DatabaseErrorKind::ClosedConnection, _) => {
            ExpenseStoreError::connection("database connection closed")
        }
        DieselError::BrokenTransactionManager => {
            ExpenseStoreError::connection("database transaction state lost")
        }
        DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
            ExpenseStoreError::query("unique constraint violated")
        }
        DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
            ExpenseStoreError::query("foreign key constraint violated")
        }
        _ => ExpenseStoreError::query("database error"),
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(PoolError::checkout("timed out"))]
    #[case(PoolError::build("bad url"))]
    fn pool_errors_are_connection_failures(#[case] error: PoolError) {
        assert!(matches!(
            map_pool_error(error),
            ExpenseStoreError::Connection { .. }
        ));
    }

    #[rstest]
    fn not_found_is_a_query_failure() {
        assert_eq!(
            map_diesel_error(DieselError::NotFound),
            ExpenseStoreError::query("record not found")
        );
    }

    #[rstest]
    fn closed_connection_is_a_connection_failure() {
        let error = DieselError::DatabaseError(
            DatabaseErrorKind::ClosedConnection,
            Box::new("server closed the connection".to_owned()),
        );

        assert!(matches!(
            map_diesel_error(error),
            ExpenseStoreError::Connection { .. }
        ));
    }

    #[rstest]
    fn broken_transaction_manager_is_a_connection_failure() {
        assert!(matches!(
            map_diesel_error(DieselError::BrokenTransactionManager),
            ExpenseStoreError::Connection { .. }
        ));
    }
}
