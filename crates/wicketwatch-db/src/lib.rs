//! Wicketwatch persistence layer.
//!
//! A thin `SQLite` layer over `SQLx` holding the single `tracked_matches`
//! table. The schema is fully re-creatable: migrations are embedded and
//! idempotent, so a fresh database file initializes itself on first open.

#![warn(clippy::all)]
#![allow(clippy::missing_errors_doc)]

pub mod error;
pub mod migrations;
pub mod tracked_matches;

pub use error::{DatabaseError, Result};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::str::FromStr;

/// High-level database handle wrapping a `SQLx` connection pool.
#[derive(Debug)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open (creating if missing) the database at `path`.
    pub async fn open(path: &str) -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str(path)
            .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(connect_options)
            .await
            .map_err(|e| DatabaseError::Open(e.to_string()))?;

        tracing::info!("Database pool created at {}", path);
        Ok(Self { pool })
    }

    /// Open an in-memory database.
    ///
    /// Restricted to a single connection: each `SQLite` in-memory
    /// connection is its own database, so a larger pool would lose the
    /// schema between connections.
    pub async fn in_memory() -> Result<Self> {
        let connect_options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DatabaseError::Open(format!("invalid connection string: {e}")))?;

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(connect_options)
            .await
            .map_err(|e| DatabaseError::Open(e.to_string()))?;

        Ok(Self { pool })
    }

    /// Run all pending migrations. Idempotent.
    pub async fn run_migrations(&self) -> Result<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Get a reference to the underlying `SQLx` pool.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Close the connection pool gracefully.
    pub async fn close(self) {
        self.pool.close().await;
        tracing::info!("Database pool closed");
    }
}
