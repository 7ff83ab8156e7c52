//! 统一错误处理
//!
//! 错误类型来自 `shared::error`，这里补充领域错误到 [`AppError`] 的转换。
//!
//! | 领域错误 | ErrorCode | HTTP |
//! |----------|-----------|------|
//! | `InvalidScope` | 4002 InvalidScope | 400 |
//! | `InvalidFormat` | 4003 InvalidDocumentNumber | 400 |
//! | `FormatOverflow` | 4004 NumberFormatOverflow | 500 |
//! | `Unavailable` | 4005 NumberUnavailable | 503 |
//! | `AllocationExhausted` | 4006 AllocationExhausted | 503 |
//! | `UnresolvedDuplicate` | 4007 UnresolvedDuplicate | 409 |
//!
//! 503 类错误只返回通用提示，细节写入日志。

pub use shared::error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

use crate::db::repository::RepoError;
use crate::numbering::NumberingError;

impl From<NumberingError> for AppError {
    fn from(err: NumberingError) -> Self {
        match err {
            NumberingError::InvalidScope(msg) => AppError::invalid_scope(msg),
            NumberingError::InvalidFormat(msg) => {
                AppError::with_message(ErrorCode::InvalidDocumentNumber, msg)
            }
            NumberingError::InvalidPolicy(msg) => AppError::validation(msg),
            NumberingError::Unavailable(detail) => {
                tracing::warn!(detail = %detail, "Document numbering unavailable");
                AppError::number_unavailable()
            }
            NumberingError::AllocationExhausted {
                scope_key,
                attempts,
            } => {
                tracing::error!(
                    scope_key = %scope_key,
                    attempts,
                    "Allocation exhausted, check the scope for duplicates"
                );
                AppError::new(ErrorCode::AllocationExhausted)
            }
            NumberingError::FormatOverflow { sequence, width } => {
                tracing::error!(sequence, width, "Document number format overflow");
                AppError::new(ErrorCode::NumberFormatOverflow)
            }
            NumberingError::UnresolvedDuplicate { document_id, reason } => {
                tracing::error!(document_id, reason = %reason, "Unresolved duplicate");
                AppError::new(ErrorCode::UnresolvedDuplicate).with_detail("document_id", document_id)
            }
            NumberingError::NotFound(id) => {
                AppError::new(ErrorCode::DocumentNotFound).with_detail("id", id)
            }
            NumberingError::Storage(msg) => AppError::database(msg),
        }
    }
}

impl From<RepoError> for AppError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(msg) => AppError::not_found(msg),
            RepoError::Duplicate(msg) => AppError::conflict(msg),
            RepoError::Unavailable(msg) => {
                tracing::warn!(detail = %msg, "Database unavailable");
                AppError::new(ErrorCode::SystemBusy)
            }
            RepoError::Database(msg) => AppError::database(msg),
            RepoError::Validation(msg) => AppError::validation(msg),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;

    #[test]
    fn test_unavailable_is_generic_503() {
        let err = AppError::from(NumberingError::Unavailable("pool timed out".into()));
        assert_eq!(err.code, ErrorCode::NumberUnavailable);
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(!err.message.contains("pool"));
    }

    #[test]
    fn test_exhausted_hides_scope() {
        let err = AppError::from(NumberingError::AllocationExhausted {
            scope_key: "1:7:PR:202510".into(),
            attempts: 5,
        });
        assert_eq!(err.http_status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(
            err.message,
            "Document number temporarily unavailable, please try again"
        );
    }

    #[test]
    fn test_invalid_scope_is_400() {
        let err = AppError::from(NumberingError::InvalidScope("store_id".into()));
        assert_eq!(err.code, ErrorCode::InvalidScope);
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
    }
}
