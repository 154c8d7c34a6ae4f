//! Embedded schema migrations.

use diesel::{Connection, PgConnection};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::info;

use crate::domain::ports::ExpenseStoreError;

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Apply pending migrations on a blocking thread.
///
/// # Errors
///
/// Returns a connection error when the database is unreachable and a query
/// error when a migration fails.
pub async fn run_migrations(database_url: &str) -> Result<(), ExpenseStoreError> {
    let url = database_url.to_owned();
    tokio::task::spawn_blocking(move || apply(&url))
        .await
        .map_err(|err| ExpenseStoreError::query(format!("migration task failed: {err}")))?
}

fn apply(database_url: &str) -> Result<(), ExpenseStoreError> {
    let mut conn = PgConnection::establish(database_url)
        .map_err(|err| ExpenseStoreError::connection(err.to_string()))?;
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|err| ExpenseStoreError::query(format!("migration: {err}")))?;
    info!(count = applied.len(), "database migrations applied");
    Ok(())
}
