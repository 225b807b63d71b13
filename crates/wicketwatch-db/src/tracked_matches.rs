//! Persisted set of tracked match identifiers.
//!
//! The discovery cycle is the single writer: after each cycle it upserts
//! the full observed snapshot (resetting `deletion_attempts` to 0) and
//! deletes rows for identifiers whose worker was stopped. The stop
//! endpoint may also delete a row mid-cycle, which is safe because
//! `delete` is idempotent and the next cycle re-adds anything still live.

use sqlx::SqlitePool;
use std::collections::HashSet;
use wicketwatch_core::MatchId;

/// Insert every identifier, or reset its `deletion_attempts` counter to 0
/// if it is already tracked.
///
/// This is full-resync semantics: the given snapshot is the truth now.
pub async fn upsert_all(pool: &SqlitePool, ids: &[MatchId]) -> Result<(), sqlx::Error> {
    for id in ids {
        sqlx::query(
            "INSERT INTO tracked_matches (url, deletion_attempts) VALUES (?, 0)
             ON CONFLICT(url) DO UPDATE SET deletion_attempts = 0",
        )
        .bind(id.as_str())
        .execute(pool)
        .await?;
    }
    Ok(())
}

/// Every tracked identifier.
pub async fn load_all(pool: &SqlitePool) -> Result<HashSet<MatchId>, sqlx::Error> {
    let urls: Vec<String> = sqlx::query_scalar("SELECT url FROM tracked_matches")
        .fetch_all(pool)
        .await?;

    Ok(urls
        .into_iter()
        .filter_map(|url| MatchId::new(url).ok())
        .collect())
}

/// Remove one identifier. No-op when the row does not exist.
pub async fn delete(pool: &SqlitePool, id: &MatchId) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM tracked_matches WHERE url = ?")
        .bind(id.as_str())
        .execute(pool)
        .await?;
    Ok(())
}

/// The `deletion_attempts` counter for one identifier, if tracked.
///
/// Currently only read by tests; the counter is the extension point for a
/// debounce-before-delete eviction policy.
pub async fn deletion_attempts(
    pool: &SqlitePool,
    id: &MatchId,
) -> Result<Option<i64>, sqlx::Error> {
    sqlx::query_scalar("SELECT deletion_attempts FROM tracked_matches WHERE url = ?")
        .bind(id.as_str())
        .fetch_optional(pool)
        .await
}
