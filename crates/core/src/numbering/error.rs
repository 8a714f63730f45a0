//! Numbering error types.

use tally_shared::{AppError, ErrorKind};
use thiserror::Error;

use super::DocumentType;

/// Errors raised while assigning a document number.
#[derive(Debug, Error)]
pub enum NumberingError {
    /// A yearly-reset type was numbered without a fiscal year.
    #[error("Document type {0} resets yearly and needs a fiscal year")]
    MissingFiscalYear(DocumentType),

    /// Fiscal-year start month outside 1..=12.
    #[error("Invalid fiscal year start month: {0}")]
    InvalidFiscalYearStart(u32),

    /// The branch does not exist in the document's company.
    #[error("Branch not found: {0}")]
    BranchNotFound(uuid::Uuid),

    /// The counter cannot be incremented further.
    #[error("Sequence for {0} is exhausted")]
    SequenceExhausted(DocumentType),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl NumberingError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingFiscalYear(_) => "MISSING_FISCAL_YEAR",
            Self::InvalidFiscalYearStart(_) => "INVALID_FISCAL_YEAR_START",
            Self::BranchNotFound(_) => "BRANCH_NOT_FOUND",
            Self::SequenceExhausted(_) => "SEQUENCE_EXHAUSTED",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFiscalYear(_) | Self::InvalidFiscalYearStart(_) => ErrorKind::Validation,
            Self::BranchNotFound(_) => ErrorKind::Referential,
            Self::SequenceExhausted(_) | Self::Database(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<NumberingError> for AppError {
    fn from(err: NumberingError) -> Self {
        Self::new(err.kind(), err.error_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            NumberingError::MissingFiscalYear(DocumentType::JournalEntry).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            NumberingError::Database("boom".to_string()).kind(),
            ErrorKind::Infrastructure
        );
        let app: AppError = NumberingError::BranchNotFound(uuid::Uuid::nil()).into();
        assert_eq!(app.code, "BRANCH_NOT_FOUND");
        assert_eq!(app.status_code(), 404);
    }
}
