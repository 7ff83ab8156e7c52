//! Document Repository
//!
//! Writes that touch `document_number` are compare-and-set on the number the
//! caller last saw, so a concurrent repair can never be silently overwritten.

use super::{RepoError, RepoResult};
use shared::models::{
    Document, DocumentLine, DocumentType, DuplicateKey, DuplicateMember, ScopeFilter,
};
use sqlx::SqlitePool;
use sqlx::types::Json;

const DOCUMENT_COLUMNS: &str = "id, document_type, store_id, partner_id, period_key, scope_key, document_number, lines, note, created_at, updated_at, removed_at";

/// Row to insert, number already allocated
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub id: i64,
    pub document_type: DocumentType,
    pub store_id: i64,
    pub partner_id: Option<i64>,
    pub period_key: String,
    pub scope_key: String,
    pub document_number: String,
    pub lines: Vec<DocumentLine>,
    pub note: Option<String>,
    pub created_at: i64,
}

pub async fn find_by_id(pool: &SqlitePool, id: i64) -> RepoResult<Option<Document>> {
    let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM document WHERE id = ?");
    let document = sqlx::query_as::<_, Document>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(document)
}

// Another live holder of ?number under the same guard key as the row being
// written. Mirrors the partial unique indexes so the check also holds on a
// database whose indexes are still blocked by legacy duplicates.
const HELD_ELSEWHERE: &str = "EXISTS (SELECT 1 FROM document AS other \
     WHERE other.store_id = ?store AND other.partner_id IS ?partner \
       AND other.document_number = ?number AND other.removed_at IS NULL \
       AND other.id != ?id)";

fn held_elsewhere(store: &str, partner: &str, number: &str, id: &str) -> String {
    HELD_ELSEWHERE
        .replace("?store", store)
        .replace("?partner", partner)
        .replace("?number", number)
        .replace("?id", id)
}

/// Insert a document; fails with [`RepoError::Duplicate`] when the number is
/// already held under the same guard key
pub async fn create(pool: &SqlitePool, data: NewDocument) -> RepoResult<Document> {
    let sql = format!(
        "INSERT INTO document (id, document_type, store_id, partner_id, period_key, scope_key, document_number, lines, note, created_at, updated_at) \
         SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10 \
         WHERE NOT {}",
        held_elsewhere("?3", "?4", "?7", "?1")
    );
    let rows = sqlx::query(&sql)
        .bind(data.id)
        .bind(data.document_type)
        .bind(data.store_id)
        .bind(data.partner_id)
        .bind(&data.period_key)
        .bind(&data.scope_key)
        .bind(&data.document_number)
        .bind(Json(&data.lines))
        .bind(&data.note)
        .bind(data.created_at)
        .execute(pool)
        .await?;

    if rows.rows_affected() == 0 {
        return Err(RepoError::Duplicate(format!(
            "{} already held in store {}",
            data.document_number, data.store_id
        )));
    }

    find_by_id(pool, data.id)
        .await?
        .ok_or_else(|| RepoError::Database("Failed to read document after insert".into()))
}

/// Replace the number of a live document, only if it still carries
/// `expected_number` and `new_number` is free under its guard key
///
/// Returns `Ok(None)` when nothing was written; the caller tells the
/// reasons apart by re-reading the row.
pub async fn renumber(
    pool: &SqlitePool,
    id: i64,
    expected_number: &str,
    new_number: &str,
) -> RepoResult<Option<Document>> {
    let now = shared::util::now_millis();
    let sql = format!(
        "UPDATE document SET document_number = ?1, updated_at = ?2 \
         WHERE id = ?3 AND document_number = ?4 AND removed_at IS NULL \
           AND NOT {}",
        held_elsewhere("document.store_id", "document.partner_id", "?1", "?3")
    );
    let rows = sqlx::query(&sql)
        .bind(new_number)
        .bind(now)
        .bind(id)
        .bind(expected_number)
        .execute(pool)
        .await?;

    if rows.rows_affected() == 0 {
        return Ok(None);
    }
    find_by_id(pool, id).await
}

/// Soft-delete a live document still carrying `expected_number`
///
/// Returns `false` when nothing matched.
pub async fn soft_remove(pool: &SqlitePool, id: i64, expected_number: &str) -> RepoResult<bool> {
    let now = shared::util::now_millis();
    let rows = sqlx::query(
        "UPDATE document SET removed_at = ?1, updated_at = ?1 WHERE id = ?2 AND document_number = ?3 AND removed_at IS NULL",
    )
    .bind(now)
    .bind(id)
    .bind(expected_number)
    .execute(pool)
    .await?;
    Ok(rows.rows_affected() > 0)
}

// Shared WHERE clause of the duplicate queries; binds ?1..?5 from the filter.
const FILTER_CLAUSE: &str = "removed_at IS NULL \
     AND (?1 IS NULL OR store_id = ?1) \
     AND (?2 IS NULL OR partner_id = ?2) \
     AND (?3 IS NULL OR document_type = ?3) \
     AND (?4 IS NULL OR period_key = ?4) \
     AND (?5 IS NULL OR scope_key = ?5)";

/// One page of duplicate group keys, strictly after `after`, in key order
pub async fn duplicate_keys_page(
    pool: &SqlitePool,
    filter: &ScopeFilter,
    after: Option<&DuplicateKey>,
    limit: u32,
) -> RepoResult<Vec<DuplicateKey>> {
    let sql = format!(
        "SELECT scope_key, document_number FROM document \
         WHERE {FILTER_CLAUSE} \
           AND (?6 IS NULL OR scope_key > ?6 OR (scope_key = ?6 AND document_number > ?7)) \
         GROUP BY scope_key, document_number \
         HAVING COUNT(*) > 1 \
         ORDER BY scope_key, document_number \
         LIMIT ?8"
    );
    let keys = sqlx::query_as::<_, DuplicateKey>(&sql)
        .bind(filter.store_id)
        .bind(filter.partner_id)
        .bind(filter.document_type)
        .bind(filter.period_key.as_deref())
        .bind(filter.scope_key.as_deref())
        .bind(after.map(|k| k.scope_key.as_str()))
        .bind(after.map(|k| k.document_number.as_str()))
        .bind(i64::from(limit))
        .fetch_all(pool)
        .await?;
    Ok(keys)
}

/// Live holders of one number, earliest first
pub async fn group_members(
    pool: &SqlitePool,
    scope_key: &str,
    document_number: &str,
) -> RepoResult<Vec<DuplicateMember>> {
    let members = sqlx::query_as::<_, DuplicateMember>(
        "SELECT id, created_at FROM document \
         WHERE scope_key = ? AND document_number = ? AND removed_at IS NULL \
         ORDER BY created_at ASC, id ASC",
    )
    .bind(scope_key)
    .bind(document_number)
    .fetch_all(pool)
    .await?;
    Ok(members)
}

/// `(groups, documents)` taking part in duplicates under `filter`
pub async fn duplicate_totals(pool: &SqlitePool, filter: &ScopeFilter) -> RepoResult<(i64, i64)> {
    let sql = format!(
        "SELECT COUNT(*), COALESCE(SUM(holders), 0) FROM ( \
             SELECT COUNT(*) AS holders FROM document \
             WHERE {FILTER_CLAUSE} \
             GROUP BY scope_key, document_number \
             HAVING COUNT(*) > 1 \
         )"
    );
    let totals = sqlx::query_as::<_, (i64, i64)>(&sql)
        .bind(filter.store_id)
        .bind(filter.partner_id)
        .bind(filter.document_type)
        .bind(filter.period_key.as_deref())
        .bind(filter.scope_key.as_deref())
        .fetch_one(pool)
        .await?;
    Ok(totals)
}
