//! Storage seam of the numbering core
//!
//! Production uses [`crate::db::SqliteNumberingStore`]; tests substitute
//! in-memory or failing stores.

use super::error::StoreError;
use crate::db::repository::document::NewDocument;
use crate::db::repository::repair_log::NewRepairLog;
use async_trait::async_trait;
use shared::models::{Document, DuplicateKey, DuplicateMember, IndexStatus, ScopeFilter};

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait NumberingStore: Send + Sync {
    /// Atomically advance the scope counter and return the new value (first is 1)
    async fn increment_counter(&self, scope_key: &str) -> StoreResult<i64>;

    /// Last value handed out, `None` before the first allocation
    async fn current_sequence(&self, scope_key: &str) -> StoreResult<Option<i64>>;

    /// Insert a numbered document; [`StoreError::DuplicateKey`] when the
    /// number is already held in the scope
    async fn insert_document(&self, document: NewDocument) -> StoreResult<Document>;

    async fn find_document(&self, id: i64) -> StoreResult<Option<Document>>;

    /// Compare-and-set the number of a live document
    ///
    /// [`StoreError::Stale`] when it no longer carries `expected_number`,
    /// [`StoreError::DuplicateKey`] when `new_number` is taken.
    async fn renumber_document(
        &self,
        id: i64,
        expected_number: &str,
        new_number: &str,
    ) -> StoreResult<Document>;

    /// Soft-delete a live document still carrying `expected_number`
    async fn remove_document(&self, id: i64, expected_number: &str) -> StoreResult<()>;

    /// Up to `limit` duplicate group keys strictly after `after`, ascending
    async fn duplicate_keys_page(
        &self,
        filter: &ScopeFilter,
        after: Option<&DuplicateKey>,
        limit: u32,
    ) -> StoreResult<Vec<DuplicateKey>>;

    /// Live holders of a number, ordered by `(created_at, id)`
    async fn group_members(
        &self,
        scope_key: &str,
        document_number: &str,
    ) -> StoreResult<Vec<DuplicateMember>>;

    /// `(groups, documents)` in duplicate groups under `filter`
    async fn duplicate_totals(&self, filter: &ScopeFilter) -> StoreResult<(usize, usize)>;

    async fn record_repair(&self, entry: NewRepairLog) -> StoreResult<()>;

    /// Read-only view of the uniqueness guard
    async fn guard_status(&self) -> StoreResult<Vec<IndexStatus>>;

    /// Create or rebuild the uniqueness guard where possible
    async fn ensure_guard(&self) -> StoreResult<Vec<IndexStatus>>;
}
