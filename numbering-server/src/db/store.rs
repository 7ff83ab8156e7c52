//! SQLite binding of [`NumberingStore`]

use super::guard;
use super::repository::document::{self, NewDocument};
use super::repository::repair_log::{self, NewRepairLog};
use super::repository::counter;
use crate::numbering::error::StoreError;
use crate::numbering::store::{NumberingStore, StoreResult};
use async_trait::async_trait;
use shared::models::{Document, DuplicateKey, DuplicateMember, IndexStatus, ScopeFilter};
use sqlx::SqlitePool;

#[derive(Clone)]
pub struct SqliteNumberingStore {
    pool: SqlitePool,
}

impl SqliteNumberingStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Explain a compare-and-set that wrote nothing
    async fn rejected_write(
        &self,
        id: i64,
        expected_number: &str,
        new_number: Option<&str>,
    ) -> StoreError {
        match document::find_by_id(&self.pool, id).await {
            Ok(Some(doc)) if doc.is_removed() => {
                StoreError::Stale(format!("document {id} was removed"))
            }
            Ok(Some(doc)) if doc.document_number != expected_number => StoreError::Stale(format!(
                "document {id} now carries {} instead of {expected_number}",
                doc.document_number
            )),
            // Row unchanged: the target number is held by another document
            Ok(Some(_)) => match new_number {
                Some(number) => StoreError::DuplicateKey(format!("{number} already held in scope")),
                None => StoreError::Stale(format!("document {id} was not updated")),
            },
            Ok(None) => StoreError::NotFound(format!("document {id}")),
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl NumberingStore for SqliteNumberingStore {
    async fn increment_counter(&self, scope_key: &str) -> StoreResult<i64> {
        Ok(counter::increment(&self.pool, scope_key).await?)
    }

    async fn current_sequence(&self, scope_key: &str) -> StoreResult<Option<i64>> {
        let row = counter::find(&self.pool, scope_key).await?;
        Ok(row.map(|c| c.last_sequence))
    }

    async fn insert_document(&self, data: NewDocument) -> StoreResult<Document> {
        Ok(document::create(&self.pool, data).await?)
    }

    async fn find_document(&self, id: i64) -> StoreResult<Option<Document>> {
        Ok(document::find_by_id(&self.pool, id).await?)
    }

    async fn renumber_document(
        &self,
        id: i64,
        expected_number: &str,
        new_number: &str,
    ) -> StoreResult<Document> {
        match document::renumber(&self.pool, id, expected_number, new_number).await? {
            Some(doc) => Ok(doc),
            None => Err(self.rejected_write(id, expected_number, Some(new_number)).await),
        }
    }

    async fn remove_document(&self, id: i64, expected_number: &str) -> StoreResult<()> {
        if document::soft_remove(&self.pool, id, expected_number).await? {
            Ok(())
        } else {
            Err(self.rejected_write(id, expected_number, None).await)
        }
    }

    async fn duplicate_keys_page(
        &self,
        filter: &ScopeFilter,
        after: Option<&DuplicateKey>,
        limit: u32,
    ) -> StoreResult<Vec<DuplicateKey>> {
        Ok(document::duplicate_keys_page(&self.pool, filter, after, limit).await?)
    }

    async fn group_members(
        &self,
        scope_key: &str,
        document_number: &str,
    ) -> StoreResult<Vec<DuplicateMember>> {
        Ok(document::group_members(&self.pool, scope_key, document_number).await?)
    }

    async fn duplicate_totals(&self, filter: &ScopeFilter) -> StoreResult<(usize, usize)> {
        let (groups, documents) = document::duplicate_totals(&self.pool, filter).await?;
        Ok((groups.max(0) as usize, documents.max(0) as usize))
    }

    async fn record_repair(&self, entry: NewRepairLog) -> StoreResult<()> {
        repair_log::create(&self.pool, entry).await?;
        Ok(())
    }

    async fn guard_status(&self) -> StoreResult<Vec<IndexStatus>> {
        Ok(guard::status(&self.pool).await?)
    }

    async fn ensure_guard(&self) -> StoreResult<Vec<IndexStatus>> {
        Ok(guard::ensure(&self.pool).await?)
    }
}
