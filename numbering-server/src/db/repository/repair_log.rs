//! Repair Audit Log Repository

use super::RepoResult;
use shared::models::{RepairActionKind, RepairLogEntry};
use sqlx::SqlitePool;

/// Audit row to append
#[derive(Debug, Clone)]
pub struct NewRepairLog {
    pub document_id: i64,
    pub scope_key: String,
    pub action: RepairActionKind,
    pub previous_number: String,
    pub new_number: Option<String>,
    pub operator: Option<String>,
}

pub async fn create(pool: &SqlitePool, data: NewRepairLog) -> RepoResult<i64> {
    let id = shared::util::snowflake_id();
    let now = shared::util::now_millis();
    sqlx::query(
        "INSERT INTO numbering_repair_log (id, document_id, scope_key, action, previous_number, new_number, operator, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
    )
    .bind(id)
    .bind(data.document_id)
    .bind(&data.scope_key)
    .bind(data.action)
    .bind(&data.previous_number)
    .bind(&data.new_number)
    .bind(&data.operator)
    .bind(now)
    .execute(pool)
    .await?;
    Ok(id)
}

pub async fn find_by_document(pool: &SqlitePool, document_id: i64) -> RepoResult<Vec<RepairLogEntry>> {
    let entries = sqlx::query_as::<_, RepairLogEntry>(
        "SELECT id, document_id, scope_key, action, previous_number, new_number, operator, created_at \
         FROM numbering_repair_log WHERE document_id = ? ORDER BY created_at ASC, id ASC",
    )
    .bind(document_id)
    .fetch_all(pool)
    .await?;
    Ok(entries)
}
