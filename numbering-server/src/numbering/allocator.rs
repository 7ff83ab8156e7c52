//! Allocator (编号分配)
//!
//! Issues numbers from the per-scope counter and persists the document in
//! the same attempt. A collision with an existing holder (legacy duplicate,
//! manual insert) burns that sequence and retries with the next one, up to
//! a bounded number of attempts with capped exponential backoff.

use super::error::{NumberingError, NumberingResult, StoreError};
use super::format::NumberFormat;
use super::scope::Scope;
use super::store::NumberingStore;
use crate::db::repository::document::NewDocument;
use rand::Rng;
use shared::models::{Document, DocumentLine};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Retry and deadline settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorConfig {
    /// Attempts per allocation, collisions included
    pub max_attempts: u32,
    pub backoff_base: Duration,
    pub backoff_max: Duration,
    /// Overall deadline of one allocation
    pub timeout: Duration,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_millis(10),
            backoff_max: Duration::from_millis(200),
            timeout: Duration::from_secs(5),
        }
    }
}

impl AllocatorConfig {
    /// Delay before retry number `attempt + 1`, without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.backoff_base
            .saturating_mul(factor)
            .min(self.backoff_max)
    }

    /// Backoff plus up to 50% random jitter
    fn jittered_backoff(&self, attempt: u32) -> Duration {
        let base = self.backoff(attempt);
        let spread = base.as_millis() as u64 / 2;
        if spread == 0 {
            return base;
        }
        base + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}

/// Document to be numbered and persisted
#[derive(Debug, Clone)]
pub struct DocumentDraft {
    pub scope: Scope,
    pub lines: Vec<DocumentLine>,
    pub note: Option<String>,
}

#[derive(Clone)]
pub struct Allocator {
    store: Arc<dyn NumberingStore>,
    format: NumberFormat,
    config: AllocatorConfig,
}

impl Allocator {
    pub fn new(store: Arc<dyn NumberingStore>, format: NumberFormat, config: AllocatorConfig) -> Self {
        Self {
            store,
            format,
            config,
        }
    }

    pub fn format(&self) -> &NumberFormat {
        &self.format
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }

    /// Number and persist a new document under the configured deadline
    pub async fn allocate(&self, draft: DocumentDraft) -> NumberingResult<Document> {
        self.allocate_within(draft, self.config.timeout).await
    }

    /// Like [`Allocator::allocate`] with a caller-supplied deadline
    pub async fn allocate_within(
        &self,
        draft: DocumentDraft,
        timeout: Duration,
    ) -> NumberingResult<Document> {
        let scope_key = draft.scope.key();
        let created_at = shared::util::now_millis();

        let attempt = self.with_fresh_number(&draft.scope, |number| {
            let data = NewDocument {
                id: shared::util::snowflake_id(),
                document_type: draft.scope.document_type(),
                store_id: draft.scope.store_id(),
                partner_id: draft.scope.partner_id(),
                period_key: draft.scope.period_key().to_string(),
                scope_key: scope_key.clone(),
                document_number: number,
                lines: draft.lines.clone(),
                note: draft.note.clone(),
                created_at,
            };
            let store = Arc::clone(&self.store);
            async move { store.insert_document(data).await }
        });

        let document = with_deadline(timeout, &scope_key, attempt).await?;
        tracing::debug!(
            scope_key = %scope_key,
            document_id = document.id,
            document_number = %document.document_number,
            "Document number allocated"
        );
        Ok(document)
    }

    /// Give an existing document a fresh number in its own scope
    ///
    /// The write is compare-and-set on the document's current number, so a
    /// document renumbered concurrently is reported rather than overwritten.
    pub async fn renumber(&self, document: &Document) -> NumberingResult<Document> {
        let scope = Scope::of_document(document)?;
        let scope_key = scope.key();
        let previous = document.document_number.clone();
        let id = document.id;

        let attempt = self.with_fresh_number(&scope, |number| {
            let store = Arc::clone(&self.store);
            let previous = previous.clone();
            async move { store.renumber_document(id, &previous, &number).await }
        });

        match with_deadline(self.config.timeout, &scope_key, attempt).await {
            Ok(updated) => {
                tracing::info!(
                    scope_key = %scope_key,
                    document_id = id,
                    previous_number = %previous,
                    document_number = %updated.document_number,
                    "Document renumbered"
                );
                Ok(updated)
            }
            Err(NumberingError::Storage(reason)) => Err(NumberingError::UnresolvedDuplicate {
                document_id: id,
                reason,
            }),
            Err(e) => Err(e),
        }
    }

    /// Last sequence issued in `scope`, 0 before the first allocation
    ///
    /// Read-only; a concurrent allocation may advance it at any time.
    pub async fn peek(&self, scope: &Scope) -> NumberingResult<i64> {
        Ok(self.store.current_sequence(&scope.key()).await?.unwrap_or(0))
    }

    /// Bounded allocate-then-write loop shared by insert and renumber
    async fn with_fresh_number<T, F, Fut>(&self, scope: &Scope, mut write: F) -> NumberingResult<T>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T, StoreError>>,
    {
        let scope_key = scope.key();
        let max_attempts = self.config.max_attempts.max(1);

        for attempt in 0..max_attempts {
            let sequence = self.store.increment_counter(&scope_key).await?;
            let number = self
                .format
                .format(scope.prefix(), scope.period_key().as_str(), sequence)?;

            match write(number.clone()).await {
                Ok(value) => return Ok(value),
                Err(StoreError::DuplicateKey(detail)) => {
                    tracing::warn!(
                        scope_key = %scope_key,
                        document_number = %number,
                        attempt = attempt + 1,
                        detail = %detail,
                        "Document number already held, retrying"
                    );
                    if attempt + 1 < max_attempts {
                        tokio::time::sleep(self.config.jittered_backoff(attempt)).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        tracing::error!(
            scope_key = %scope_key,
            attempts = max_attempts,
            "Document number allocation exhausted"
        );
        Err(NumberingError::AllocationExhausted {
            scope_key,
            attempts: max_attempts,
        })
    }
}

async fn with_deadline<T>(
    timeout: Duration,
    scope_key: &str,
    fut: impl Future<Output = NumberingResult<T>>,
) -> NumberingResult<T> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => {
            tracing::error!(
                scope_key = %scope_key,
                timeout_ms = timeout.as_millis() as u64,
                "Numbering storage did not answer in time"
            );
            Err(NumberingError::Unavailable(format!(
                "no answer within {} ms",
                timeout.as_millis()
            )))
        }
    }
}
