//! Application-wide error taxonomy.
//!
//! Every engine reports failures in one of five classes. Callers branch on
//! the class, never on message text: a duplicate submission is "already
//! applied", an infrastructure failure is "retry the whole call", everything
//! else needs the request itself to change.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// The five failure classes of the bookkeeping core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed, unbalanced or incomplete input. Nothing was written.
    Validation,
    /// Unknown or cross-company company/account/product/warehouse/document.
    Referential,
    /// Idempotency key already committed.
    Duplicate,
    /// Insufficient stock, already reversed, over-receipt, invalid transition.
    Conflict,
    /// Store or commit failure. Nothing partial persisted.
    Infrastructure,
}

impl ErrorKind {
    /// Returns the HTTP status code a presentation adapter should use.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::Referential => 404,
            Self::Duplicate | Self::Conflict => 409,
            Self::Infrastructure => 500,
        }
    }

    /// Returns the stable machine-readable class name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::Referential => "REFERENTIAL_ERROR",
            Self::Duplicate => "DUPLICATE_SUBMISSION",
            Self::Conflict => "CONFLICT",
            Self::Infrastructure => "INFRASTRUCTURE_ERROR",
        }
    }

    /// Returns true if repeating the identical call may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::Infrastructure)
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flattened error handed to presentation adapters.
///
/// Engine errors keep their typed variants; this is what they collapse to
/// once they cross the application-service boundary.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// Failure class.
    pub kind: ErrorKind,
    /// Stable per-variant code (e.g. `UNBALANCED_ENTRY`).
    pub code: &'static str,
    /// Human-readable message.
    pub message: String,
}

impl AppError {
    /// Creates a new application error.
    #[must_use]
    pub fn new(kind: ErrorKind, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind.status_code()
    }

    /// Returns true if the caller should treat the request as already applied.
    #[must_use]
    pub fn is_already_applied(&self) -> bool {
        self.kind == ErrorKind::Duplicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorKind::Validation, 400)]
    #[case(ErrorKind::Referential, 404)]
    #[case(ErrorKind::Duplicate, 409)]
    #[case(ErrorKind::Conflict, 409)]
    #[case(ErrorKind::Infrastructure, 500)]
    fn test_status_codes(#[case] kind: ErrorKind, #[case] status: u16) {
        assert_eq!(kind.status_code(), status);
    }

    #[test]
    fn test_only_infrastructure_is_retryable() {
        assert!(ErrorKind::Infrastructure.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::Referential.is_retryable());
        assert!(!ErrorKind::Duplicate.is_retryable());
        assert!(!ErrorKind::Conflict.is_retryable());
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::new(ErrorKind::Duplicate, "DUPLICATE_SUBMISSION", "key abc");
        assert_eq!(err.to_string(), "DUPLICATE_SUBMISSION: key abc");
        assert!(err.is_already_applied());
        assert_eq!(err.status_code(), 409);
    }
}
