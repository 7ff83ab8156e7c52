//! Database Module
//!
//! Handles SQLite connection pool, migrations and the uniqueness guard

pub mod guard;
pub mod repository;
pub mod store;

use crate::utils::AppError;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;

pub use store::SqliteNumberingStore;

/// 写冲突时的等待时间
const BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

/// Database service, owns a SQLite connection pool
#[derive(Clone)]
pub struct DbService {
    pub pool: SqlitePool,
}

impl DbService {
    /// Open (creating if needed) the database, apply migrations and ensure
    /// the guard indexes
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let pool = connect_pool(db_path, true).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to apply migrations: {e}")))?;
        tracing::info!("Database migrations applied");

        let indexes = guard::ensure(&pool)
            .await
            .map_err(|e| AppError::database(format!("Failed to ensure guard indexes: {e}")))?;
        for index in indexes.iter().filter(|i| !i.present || !i.correct) {
            tracing::warn!(
                index = %index.name,
                "Uniqueness guard incomplete, duplicate numbers are not prevented for this scope shape"
            );
        }

        Ok(Self { pool })
    }

    /// Open an existing database without migrating or touching indexes
    ///
    /// Used by the report-only tooling paths.
    pub async fn open_existing(db_path: &str) -> Result<Self, AppError> {
        let pool = connect_pool(db_path, false).await?;
        Ok(Self { pool })
    }
}

async fn connect_pool(db_path: &str, create: bool) -> Result<SqlitePool, AppError> {
    let mut options = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))
        .map_err(|e| AppError::database(format!("Invalid database path: {e}")))?
        .create_if_missing(create)
        .synchronous(SqliteSynchronous::Normal)
        .pragma("foreign_keys", "ON")
        .busy_timeout(BUSY_TIMEOUT);

    // journal_mode and optimize both persist to the file; report-only opens leave it as found
    if create {
        options = options
            .journal_mode(SqliteJournalMode::Wal)
            .optimize_on_close(true, None);
    }

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(5))
        .connect_with(options)
        .await
        .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

    tracing::info!(
        path = db_path,
        create,
        "Database connection established (busy_timeout={}ms)",
        BUSY_TIMEOUT.as_millis()
    );
    Ok(pool)
}
