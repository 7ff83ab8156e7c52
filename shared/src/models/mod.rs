//! Data models
//!
//! Shared between the numbering server, the operator CLI and API clients.
//! DB row types use `#[cfg_attr(feature = "db", derive(sqlx::FromRow))]`.
//! All IDs are `i64` (snowflake, SQLite INTEGER PRIMARY KEY).

pub mod document;
pub mod numbering;

// Re-exports
pub use document::*;
pub use numbering::*;
