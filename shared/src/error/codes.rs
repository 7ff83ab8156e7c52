//! Unified error codes for the document numbering services
//!
//! This module defines all error codes used by the numbering server, the
//! operator CLI and API consumers. Error codes are organized by category:
//! - 0xxx: General errors
//! - 4xxx: Document / numbering errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility (Rust, TypeScript, etc.)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,
    /// Invalid request
    InvalidRequest = 5,
    /// Invalid format
    InvalidFormat = 6,
    /// Required field missing
    RequiredField = 7,
    /// Value out of range
    ValueOutOfRange = 8,

    // ==================== 4xxx: Document ====================
    /// Document not found
    DocumentNotFound = 4001,
    /// Numbering scope is malformed
    InvalidScope = 4002,
    /// Document number string is not canonical
    InvalidDocumentNumber = 4003,
    /// Sequence does not fit the configured number width
    NumberFormatOverflow = 4004,
    /// Number could not be issued right now (storage unreachable)
    NumberUnavailable = 4005,
    /// Retry bound exceeded while issuing a number
    AllocationExhausted = 4006,
    /// Duplicate member could not be repaired automatically
    UnresolvedDuplicate = 4007,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Operation timeout
    TimeoutError = 9004,
    /// Configuration error
    ConfigError = 9005,
    /// System busy (IO error, retry later)
    SystemBusy = 9404,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",
            ErrorCode::InvalidRequest => "Invalid request",
            ErrorCode::InvalidFormat => "Invalid format",
            ErrorCode::RequiredField => "Required field is missing",
            ErrorCode::ValueOutOfRange => "Value is out of range",

            // Document
            ErrorCode::DocumentNotFound => "Document not found",
            ErrorCode::InvalidScope => "Invalid numbering scope",
            ErrorCode::InvalidDocumentNumber => "Invalid document number",
            ErrorCode::NumberFormatOverflow => "Sequence exceeds the document number width",
            ErrorCode::NumberUnavailable => {
                "Document number temporarily unavailable, please try again"
            }
            ErrorCode::AllocationExhausted => {
                "Document number temporarily unavailable, please try again"
            }
            ErrorCode::UnresolvedDuplicate => "Duplicate document number requires manual follow-up",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::TimeoutError => "Operation timed out",
            ErrorCode::ConfigError => "Configuration error",
            ErrorCode::SystemBusy => "System busy, please retry later",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),
            5 => Ok(ErrorCode::InvalidRequest),
            6 => Ok(ErrorCode::InvalidFormat),
            7 => Ok(ErrorCode::RequiredField),
            8 => Ok(ErrorCode::ValueOutOfRange),

            // Document
            4001 => Ok(ErrorCode::DocumentNotFound),
            4002 => Ok(ErrorCode::InvalidScope),
            4003 => Ok(ErrorCode::InvalidDocumentNumber),
            4004 => Ok(ErrorCode::NumberFormatOverflow),
            4005 => Ok(ErrorCode::NumberUnavailable),
            4006 => Ok(ErrorCode::AllocationExhausted),
            4007 => Ok(ErrorCode::UnresolvedDuplicate),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9004 => Ok(ErrorCode::TimeoutError),
            9005 => Ok(ErrorCode::ConfigError),
            9404 => Ok(ErrorCode::SystemBusy),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::ValidationFailed.code(), 2);
        assert_eq!(ErrorCode::InvalidFormat.code(), 6);

        assert_eq!(ErrorCode::DocumentNotFound.code(), 4001);
        assert_eq!(ErrorCode::InvalidScope.code(), 4002);
        assert_eq!(ErrorCode::NumberUnavailable.code(), 4005);
        assert_eq!(ErrorCode::AllocationExhausted.code(), 4006);
        assert_eq!(ErrorCode::UnresolvedDuplicate.code(), 4007);

        assert_eq!(ErrorCode::InternalError.code(), 9001);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
    }

    #[test]
    fn test_try_from_round_trip() {
        for code in [
            ErrorCode::Success,
            ErrorCode::NotFound,
            ErrorCode::InvalidScope,
            ErrorCode::NumberFormatOverflow,
            ErrorCode::AllocationExhausted,
            ErrorCode::SystemBusy,
        ] {
            assert_eq!(ErrorCode::try_from(code.code()), Ok(code));
        }
        assert_eq!(ErrorCode::try_from(4999), Err(InvalidErrorCode(4999)));
    }

    #[test]
    fn test_exhaustion_hides_detail_from_end_users() {
        assert_eq!(
            ErrorCode::AllocationExhausted.message(),
            ErrorCode::NumberUnavailable.message()
        );
    }

    #[test]
    fn test_serde_as_number() {
        let json = serde_json::to_string(&ErrorCode::InvalidScope).unwrap();
        assert_eq!(json, "4002");
        let code: ErrorCode = serde_json::from_str("4005").unwrap();
        assert_eq!(code, ErrorCode::NumberUnavailable);
    }
}
