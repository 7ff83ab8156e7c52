//! Shared types for the document numbering services
//!
//! Common types used by the numbering server and its operator tooling:
//! error codes and response structures, persisted models and small
//! utilities.

pub mod error;
pub mod models;
pub mod util;

// Re-exports
pub use axum::{Json, body};
pub use http;
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
