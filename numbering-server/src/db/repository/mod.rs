//! Repository Module
//!
//! 无状态仓储函数，直接作用于 `&SqlitePool`。

pub mod counter;
pub mod document;
pub mod repair_log;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    /// A unique constraint rejected the write
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Pool exhausted / closed, I/O failure or a locked database
    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

// SQLITE_BUSY / SQLITE_LOCKED, primary result codes
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

fn is_lock_contention(db: &dyn sqlx::error::DatabaseError) -> bool {
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .map(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED))
        .unwrap_or(false)
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepoError::Duplicate(db.message().to_string())
            }
            sqlx::Error::Database(db) if is_lock_contention(db.as_ref()) => {
                RepoError::Unavailable(db.message().to_string())
            }
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed
            | sqlx::Error::Io(_) => RepoError::Unavailable(err.to_string()),
            sqlx::Error::RowNotFound => RepoError::NotFound(err.to_string()),
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
