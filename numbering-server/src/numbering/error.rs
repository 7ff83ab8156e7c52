//! Numbering error types

use crate::db::repository::RepoError;
use thiserror::Error;

/// Errors surfaced by the numbering subsystem
#[derive(Debug, Error)]
pub enum NumberingError {
    /// Scope fields missing or malformed
    #[error("Invalid scope: {0}")]
    InvalidScope(String),

    /// Counter or document store unreachable, or the deadline elapsed
    #[error("Numbering storage unavailable: {0}")]
    Unavailable(String),

    /// Every attempt collided with an existing number
    #[error("No free number for scope {scope_key} after {attempts} attempts")]
    AllocationExhausted { scope_key: String, attempts: u32 },

    /// Sequence does not fit the configured format
    #[error("Sequence {sequence} does not fit the number format (width {width})")]
    FormatOverflow { sequence: i64, width: usize },

    /// Text is not a canonical document number, or a format part is malformed
    #[error("Invalid document number: {0}")]
    InvalidFormat(String),

    /// A duplicate could not be reconciled
    #[error("Duplicate of document {document_id} left unresolved: {reason}")]
    UnresolvedDuplicate { document_id: i64, reason: String },

    #[error("Invalid repair policy: {0}")]
    InvalidPolicy(String),

    #[error("Document not found: {0}")]
    NotFound(i64),

    #[error("Storage error: {0}")]
    Storage(String),
}

pub type NumberingResult<T> = Result<T, NumberingError>;

/// Errors of the storage seam behind the numbering core
///
/// `DuplicateKey` is consumed by the allocator's retry loop and never
/// returned to its callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate key: {0}")]
    DuplicateKey(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Compare-and-set lost: the row no longer carries the expected number
    #[error("stale write: {0}")]
    Stale(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("database error: {0}")]
    Database(String),
}

impl From<RepoError> for StoreError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::Duplicate(msg) => StoreError::DuplicateKey(msg),
            RepoError::Unavailable(msg) => StoreError::Unavailable(msg),
            RepoError::NotFound(msg) => StoreError::NotFound(msg),
            RepoError::Database(msg) | RepoError::Validation(msg) => StoreError::Database(msg),
        }
    }
}

impl From<StoreError> for NumberingError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => NumberingError::Unavailable(msg),
            StoreError::DuplicateKey(msg) => {
                NumberingError::Storage(format!("unexpected duplicate key: {msg}"))
            }
            StoreError::Stale(msg) | StoreError::NotFound(msg) | StoreError::Database(msg) => {
                NumberingError::Storage(msg)
            }
        }
    }
}
