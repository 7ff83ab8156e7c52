//! Shared fixtures for the integration tests
//!
//! Every test gets its own SQLite file in a temp directory.

#![allow(dead_code)]

use async_trait::async_trait;
use numbering_server::core::{Config, ServerState};
use numbering_server::db::guard::GUARD_INDEXES;
use numbering_server::db::repository::document::NewDocument;
use numbering_server::db::repository::repair_log::NewRepairLog;
use numbering_server::db::{DbService, SqliteNumberingStore};
use numbering_server::numbering::store::StoreResult;
use numbering_server::numbering::{
    Allocator, AllocatorConfig, DocumentDraft, NumberFormat, NumberingStore, Overflow, PeriodKey,
    Scope, StoreError,
};
use shared::models::{
    Document, DocumentType, DuplicateKey, DuplicateMember, IndexStatus, ScopeFilter,
};
use sqlx::SqlitePool;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const PERIOD: &str = "202510";

pub struct TestDb {
    // Keeps the directory alive for the duration of the test
    pub dir: TempDir,
    pub path: String,
    pub state: ServerState,
}

impl TestDb {
    pub fn pool(&self) -> &SqlitePool {
        &self.state.pool
    }
}

pub fn test_config(database_path: &str) -> Config {
    let database_path = database_path.to_string();
    Config::from_lookup(move |key| match key {
        "DATABASE_PATH" => Some(database_path.clone()),
        "DUPLICATE_SCAN_INTERVAL_SECS" => Some("0".into()),
        "ALLOC_TIMEOUT_MS" => Some("30000".into()),
        "ALLOC_MAX_ATTEMPTS" => Some("10".into()),
        "SCAN_PAGE_SIZE" => Some("2".into()),
        _ => None,
    })
}

/// Fresh migrated database with the guard indexes in place
pub async fn open_db() -> TestDb {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("numbering.db").to_string_lossy().into_owned();
    let db = DbService::new(&path).await.unwrap();
    let state = ServerState::with_pool(test_config(&path), db.pool).unwrap();
    TestDb { dir, path, state }
}

pub fn scope(store_id: i64, partner_id: Option<i64>, document_type: DocumentType) -> Scope {
    Scope::new(
        store_id,
        partner_id,
        document_type,
        PeriodKey::parse(PERIOD).unwrap(),
    )
    .unwrap()
}

pub fn draft(scope: Scope) -> DocumentDraft {
    DocumentDraft {
        scope,
        lines: vec![],
        note: None,
    }
}

/// Drop the uniqueness guard, as on a database that predates it
pub async fn drop_guard(pool: &SqlitePool) {
    for index in &GUARD_INDEXES {
        sqlx::query(&format!("DROP INDEX IF EXISTS {}", index.name))
            .execute(pool)
            .await
            .unwrap();
    }
}

/// Insert a document bypassing every check, returns its id
pub async fn insert_raw(
    pool: &SqlitePool,
    id: i64,
    scope: &Scope,
    document_number: &str,
    created_at: i64,
) -> i64 {
    sqlx::query(
        "INSERT INTO document (id, document_type, store_id, partner_id, period_key, scope_key, document_number, lines, note, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, '[]', NULL, ?8, ?8)",
    )
    .bind(id)
    .bind(scope.document_type())
    .bind(scope.store_id())
    .bind(scope.partner_id())
    .bind(scope.period_key().as_str())
    .bind(scope.key())
    .bind(document_number)
    .bind(created_at)
    .execute(pool)
    .await
    .unwrap();
    id
}

/// Counter row as a legacy system would have left it
pub async fn set_counter(pool: &SqlitePool, scope: &Scope, last_sequence: i64) {
    sqlx::query(
        "INSERT INTO numbering_counter (scope_key, last_sequence, created_at, updated_at) VALUES (?1, ?2, 0, 0) \
         ON CONFLICT(scope_key) DO UPDATE SET last_sequence = excluded.last_sequence",
    )
    .bind(scope.key())
    .bind(last_sequence)
    .execute(pool)
    .await
    .unwrap();
}

pub async fn live_numbers(pool: &SqlitePool, scope: &Scope) -> Vec<String> {
    sqlx::query_scalar(
        "SELECT document_number FROM document WHERE scope_key = ? AND removed_at IS NULL ORDER BY document_number",
    )
    .bind(scope.key())
    .fetch_all(pool)
    .await
    .unwrap()
}

pub fn assert_distinct(numbers: &[String]) {
    let unique: HashSet<&String> = numbers.iter().collect();
    assert_eq!(unique.len(), numbers.len(), "duplicate numbers in {numbers:?}");
}

pub fn fast_allocator(store: Arc<dyn NumberingStore>, max_attempts: u32, timeout: Duration) -> Allocator {
    Allocator::new(
        store,
        NumberFormat::new(4, Overflow::Widen).unwrap(),
        AllocatorConfig {
            max_attempts,
            backoff_base: Duration::from_millis(1),
            backoff_max: Duration::from_millis(5),
            timeout,
        },
    )
}

/// How a [`ScriptedStore`] misbehaves
#[derive(Debug, Clone, Default)]
pub struct Faults {
    /// Counter never answers
    pub hang_counter: bool,
    /// Counter fails at once with `Unavailable`
    pub counter_unavailable: bool,
    /// Every insert / renumber reports the number as taken
    pub always_taken: bool,
    /// Renumbering these documents fails with `Unavailable`
    pub renumber_unavailable: HashSet<i64>,
    /// Audit writes fail
    pub audit_fails: bool,
}

/// Real SQLite store with injectable faults and call counting
pub struct ScriptedStore {
    pub inner: SqliteNumberingStore,
    pub faults: Mutex<Faults>,
    pub increments: AtomicUsize,
    pub writes: AtomicUsize,
}

impl ScriptedStore {
    pub fn new(pool: SqlitePool, faults: Faults) -> Arc<Self> {
        Arc::new(Self {
            inner: SqliteNumberingStore::new(pool),
            faults: Mutex::new(faults),
            increments: AtomicUsize::new(0),
            writes: AtomicUsize::new(0),
        })
    }

    fn faults(&self) -> Faults {
        self.faults.lock().unwrap().clone()
    }

    pub fn increments(&self) -> usize {
        self.increments.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NumberingStore for ScriptedStore {
    async fn increment_counter(&self, scope_key: &str) -> StoreResult<i64> {
        self.increments.fetch_add(1, Ordering::SeqCst);
        let faults = self.faults();
        if faults.hang_counter {
            std::future::pending::<()>().await;
        }
        if faults.counter_unavailable {
            return Err(StoreError::Unavailable("counter offline".into()));
        }
        self.inner.increment_counter(scope_key).await
    }

    async fn current_sequence(&self, scope_key: &str) -> StoreResult<Option<i64>> {
        self.inner.current_sequence(scope_key).await
    }

    async fn insert_document(&self, document: NewDocument) -> StoreResult<Document> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.faults().always_taken {
            return Err(StoreError::DuplicateKey(document.document_number));
        }
        self.inner.insert_document(document).await
    }

    async fn find_document(&self, id: i64) -> StoreResult<Option<Document>> {
        self.inner.find_document(id).await
    }

    async fn renumber_document(
        &self,
        id: i64,
        expected_number: &str,
        new_number: &str,
    ) -> StoreResult<Document> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let faults = self.faults();
        if faults.renumber_unavailable.contains(&id) {
            return Err(StoreError::Unavailable(format!("document {id} locked")));
        }
        if faults.always_taken {
            return Err(StoreError::DuplicateKey(new_number.to_string()));
        }
        self.inner
            .renumber_document(id, expected_number, new_number)
            .await
    }

    async fn remove_document(&self, id: i64, expected_number: &str) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.remove_document(id, expected_number).await
    }

    async fn duplicate_keys_page(
        &self,
        filter: &ScopeFilter,
        after: Option<&DuplicateKey>,
        limit: u32,
    ) -> StoreResult<Vec<DuplicateKey>> {
        self.inner.duplicate_keys_page(filter, after, limit).await
    }

    async fn group_members(
        &self,
        scope_key: &str,
        document_number: &str,
    ) -> StoreResult<Vec<DuplicateMember>> {
        self.inner.group_members(scope_key, document_number).await
    }

    async fn duplicate_totals(&self, filter: &ScopeFilter) -> StoreResult<(usize, usize)> {
        self.inner.duplicate_totals(filter).await
    }

    async fn record_repair(&self, entry: NewRepairLog) -> StoreResult<()> {
        if self.faults().audit_fails {
            return Err(StoreError::Unavailable("audit log offline".into()));
        }
        self.inner.record_repair(entry).await
    }

    async fn guard_status(&self) -> StoreResult<Vec<IndexStatus>> {
        self.inner.guard_status().await
    }

    async fn ensure_guard(&self) -> StoreResult<Vec<IndexStatus>> {
        self.inner.ensure_guard().await
    }
}
