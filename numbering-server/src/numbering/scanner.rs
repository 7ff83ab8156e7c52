//! DuplicateScanner (重号扫描)
//!
//! Read-only. Walks duplicate group keys page by page in key order and
//! resolves each key into its current live members, so memory stays bounded
//! by one page however large the document table grows.

use super::error::NumberingResult;
use super::store::NumberingStore;
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use shared::models::{DuplicateGroup, DuplicateKey, ScopeFilter};
use std::collections::VecDeque;
use std::sync::Arc;

pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Resume point of a scan: the last group key already emitted
pub type ScanCursor = DuplicateKey;

#[derive(Clone)]
pub struct DuplicateScanner {
    store: Arc<dyn NumberingStore>,
    page_size: u32,
}

struct ScanState {
    store: Arc<dyn NumberingStore>,
    filter: ScopeFilter,
    cursor: Option<ScanCursor>,
    pending: VecDeque<DuplicateKey>,
    page_size: u32,
    exhausted: bool,
}

impl DuplicateScanner {
    pub fn new(store: Arc<dyn NumberingStore>, page_size: u32) -> Self {
        Self {
            store,
            page_size: page_size.max(1),
        }
    }

    /// Stream every duplicate group matching `filter`
    pub fn scan(&self, filter: ScopeFilter) -> BoxStream<'static, NumberingResult<DuplicateGroup>> {
        self.scan_from(filter, None)
    }

    /// Stream the groups strictly after `cursor`
    pub fn scan_from(
        &self,
        filter: ScopeFilter,
        cursor: Option<ScanCursor>,
    ) -> BoxStream<'static, NumberingResult<DuplicateGroup>> {
        let state = ScanState {
            store: Arc::clone(&self.store),
            filter,
            cursor,
            pending: VecDeque::new(),
            page_size: self.page_size,
            exhausted: false,
        };

        stream::try_unfold(state, next_group).boxed()
    }

    /// Gather a full scan into memory
    pub async fn collect(&self, filter: ScopeFilter) -> NumberingResult<Vec<DuplicateGroup>> {
        self.scan(filter).try_collect().await
    }

    /// `(groups, documents)` currently in duplicate groups
    pub async fn totals(&self, filter: &ScopeFilter) -> NumberingResult<(usize, usize)> {
        Ok(self.store.duplicate_totals(filter).await?)
    }
}

async fn next_group(
    mut state: ScanState,
) -> NumberingResult<Option<(DuplicateGroup, ScanState)>> {
    loop {
        if let Some(key) = state.pending.pop_front() {
            let members = state
                .store
                .group_members(&key.scope_key, &key.document_number)
                .await?;
            state.cursor = Some(key.clone());
            // Resolved between the page read and now
            if members.len() < 2 {
                continue;
            }
            let group = DuplicateGroup {
                scope_key: key.scope_key,
                document_number: key.document_number,
                members,
            };
            return Ok(Some((group, state)));
        }

        if state.exhausted {
            return Ok(None);
        }

        let page = state
            .store
            .duplicate_keys_page(&state.filter, state.cursor.as_ref(), state.page_size)
            .await?;
        if page.len() < state.page_size as usize {
            state.exhausted = true;
        }
        if page.is_empty() {
            return Ok(None);
        }
        state.pending.extend(page);
    }
}
