//! Database migration management.
//!
//! Embeds SQL migrations and applies them with `SQLx`'s built-in
//! migration support, which tracks applied migrations in a
//! `_sqlx_migrations` table so repeated runs are no-ops.

use crate::error::{DatabaseError, Result};
use sqlx::{Pool, Sqlite};

/// Run all pending database migrations.
///
/// # Errors
/// Returns `DatabaseError::Migration` if any migration fails to execute.
pub async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    tracing::info!("Running database migrations");

    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| DatabaseError::Migration(format!("migration execution failed: {e}")))?;

    Ok(())
}
