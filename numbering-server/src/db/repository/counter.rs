//! Numbering Counter Repository

use super::RepoResult;
use shared::models::NumberingCounter;
use sqlx::SqlitePool;

/// Atomically advance the counter of `scope_key` and return the new value
///
/// The first call for a scope creates the row at 1. Concurrent callers
/// always observe distinct values; a value handed out is never reused.
pub async fn increment(pool: &SqlitePool, scope_key: &str) -> RepoResult<i64> {
    let now = shared::util::now_millis();
    let sequence = sqlx::query_scalar::<_, i64>(
        "INSERT INTO numbering_counter (scope_key, last_sequence, created_at, updated_at) VALUES (?1, 1, ?2, ?2) \
         ON CONFLICT(scope_key) DO UPDATE SET last_sequence = last_sequence + 1, updated_at = excluded.updated_at \
         RETURNING last_sequence",
    )
    .bind(scope_key)
    .bind(now)
    .fetch_one(pool)
    .await?;
    Ok(sequence)
}

pub async fn find(pool: &SqlitePool, scope_key: &str) -> RepoResult<Option<NumberingCounter>> {
    let counter = sqlx::query_as::<_, NumberingCounter>(
        "SELECT scope_key, last_sequence, created_at, updated_at FROM numbering_counter WHERE scope_key = ?",
    )
    .bind(scope_key)
    .fetch_optional(pool)
    .await?;
    Ok(counter)
}
