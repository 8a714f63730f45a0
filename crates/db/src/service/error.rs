//! Error type of the service facade and the order engines.

use sea_orm::DbErr;
use tally_core::inventory::InventoryError;
use tally_core::ledger::LedgerError;
use tally_core::numbering::NumberingError;
use tally_core::orders::OrderError;
use tally_shared::{AppError, ErrorKind};

/// Any failure of a transactional operation.
///
/// Engine errors pass through unchanged; the transaction they ran in has
/// already been discarded when the caller sees one.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Ledger rejection.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Numbering failure.
    #[error(transparent)]
    Numbering(#[from] NumberingError),

    /// Stock rejection.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Order lifecycle rejection.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// Database error outside any engine.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl ServiceError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(e) => e.error_code(),
            Self::Numbering(e) => e.error_code(),
            Self::Inventory(e) => e.error_code(),
            Self::Order(e) => e.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Ledger(e) => e.kind(),
            Self::Numbering(e) => e.kind(),
            Self::Inventory(e) => e.kind(),
            Self::Order(e) => e.kind(),
            Self::Database(_) => ErrorKind::Infrastructure,
        }
    }

    /// Whether retrying the same call may succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        Self::new(err.kind(), err.error_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_engine_codes_pass_through() {
        let err = ServiceError::from(LedgerError::DuplicateSubmission("k".to_string()));
        assert_eq!(err.error_code(), "DUPLICATE_SUBMISSION");
        assert_eq!(err.kind(), ErrorKind::Duplicate);

        let err = ServiceError::from(OrderError::HasReceipts(Uuid::nil()));
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_database_errors_are_retryable() {
        let err = ServiceError::from(DbErr::Custom("connection reset".to_string()));
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert!(err.is_retryable());

        let app: AppError = err.into();
        assert_eq!(app.kind, ErrorKind::Infrastructure);
    }
}
