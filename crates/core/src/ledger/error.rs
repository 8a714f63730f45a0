//! Ledger error types.
//!
//! Every rejection the ledger can produce, grouped by failure class. The
//! class (`kind`) is what callers branch on; the code is stable for logs and
//! adapters; the message is for humans.

use rust_decimal::Decimal;
use tally_shared::{AppError, ErrorKind};
use thiserror::Error;
use uuid::Uuid;

use crate::numbering::NumberingError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// A required proposal field is blank.
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    /// Fewer than two lines.
    #[error("Journal entry must have at least 2 lines, got {0}")]
    InsufficientLines(usize),

    /// A line amount is not a decimal number.
    #[error("Line {line}: invalid amount '{value}'")]
    InvalidAmount {
        /// Zero-based line index.
        line: usize,
        /// The raw value.
        value: String,
    },

    /// A line amount is zero or negative.
    #[error("Line {line}: amount must be positive, got {amount}")]
    NonPositiveAmount {
        /// Zero-based line index.
        line: usize,
        /// The parsed amount.
        amount: Decimal,
    },

    /// A line amount, its base conversion or a running total exceeds the
    /// ledger's `NUMERIC(19, 4)` range.
    #[error("Line {line}: amount {amount} is outside the ledger range")]
    AmountOutOfRange {
        /// Zero-based line index.
        line: usize,
        /// The transaction-currency amount of the line.
        amount: Decimal,
    },

    /// A line does not say whether it is a debit or a credit.
    #[error("Line {0}: must be either a debit or a credit")]
    MissingSide(usize),

    /// A line has no account code.
    #[error("Line {0}: missing account code")]
    MissingAccount(usize),

    /// Debits and credits differ in the transaction currency.
    #[error("Journal entry is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debits.
        debit: Decimal,
        /// Total credits.
        credit: Decimal,
    },

    /// Rounding to the ledger scale left base debits and credits unequal.
    #[error("Base amounts do not balance after rounding. Debit: {debit}, Credit: {credit}")]
    UnbalancedBase {
        /// Total base debits.
        debit: Decimal,
        /// Total base credits.
        credit: Decimal,
    },

    /// A line converts to zero in the base currency.
    #[error("Line {0}: amount rounds to zero in base currency")]
    ZeroBaseAmount(usize),

    /// Currency is not three letters A-Z.
    #[error("Invalid currency code: '{0}'")]
    InvalidCurrency(String),

    /// Exchange rate is not a positive decimal.
    #[error("Invalid exchange rate: '{0}'")]
    InvalidExchangeRate(String),

    /// Posting in the base currency at a rate other than 1.
    #[error("Exchange rate for base currency {currency} must be 1, got {rate}")]
    BaseCurrencyRate {
        /// The base currency.
        currency: String,
        /// The supplied rate.
        rate: Decimal,
    },

    /// A date field does not parse as `YYYY-MM-DD`.
    #[error("Invalid {field}: '{value}'")]
    InvalidDate {
        /// Field name.
        field: &'static str,
        /// The raw value.
        value: String,
    },

    /// Unknown document type code.
    #[error("Unknown document type: '{0}'")]
    UnknownDocumentType(String),

    /// The document type cannot carry a journal entry.
    #[error("Document type {0} cannot be posted to the ledger")]
    NotPostable(&'static str),

    /// Account exists but is deactivated.
    #[error("Account {0} is inactive")]
    AccountInactive(String),

    // ========== Referential Errors ==========
    /// No company with this code.
    #[error("Company not found: {0}")]
    CompanyNotFound(String),

    /// No account with this code in the company.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// No branch with this code in the company.
    #[error("Branch not found: {0}")]
    BranchNotFound(String),

    /// No journal entry with this id in the company.
    #[error("Journal entry not found: {0}")]
    EntryNotFound(Uuid),

    // ========== Duplicate / Conflict ==========
    /// The idempotency key has already been committed.
    #[error("Duplicate submission: idempotency key '{0}' already committed")]
    DuplicateSubmission(String),

    /// The entry already has a reversal.
    #[error("Journal entry {0} has already been reversed")]
    AlreadyReversed(Uuid),

    // ========== Numbering ==========
    /// Document number assignment failed.
    #[error(transparent)]
    Numbering(#[from] NumberingError),

    // ========== Database Errors ==========
    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "MISSING_FIELD",
            Self::InsufficientLines(_) => "INSUFFICIENT_LINES",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::NonPositiveAmount { .. } => "NON_POSITIVE_AMOUNT",
            Self::AmountOutOfRange { .. } => "AMOUNT_OUT_OF_RANGE",
            Self::MissingSide(_) => "MISSING_SIDE",
            Self::MissingAccount(_) => "MISSING_ACCOUNT",
            Self::Unbalanced { .. } => "UNBALANCED_ENTRY",
            Self::UnbalancedBase { .. } => "UNBALANCED_BASE",
            Self::ZeroBaseAmount(_) => "ZERO_BASE_AMOUNT",
            Self::InvalidCurrency(_) => "INVALID_CURRENCY",
            Self::InvalidExchangeRate(_) => "INVALID_EXCHANGE_RATE",
            Self::BaseCurrencyRate { .. } => "BASE_CURRENCY_RATE",
            Self::InvalidDate { .. } => "INVALID_DATE",
            Self::UnknownDocumentType(_) => "UNKNOWN_DOCUMENT_TYPE",
            Self::NotPostable(_) => "NOT_POSTABLE",
            Self::AccountInactive(_) => "ACCOUNT_INACTIVE",
            Self::CompanyNotFound(_) => "COMPANY_NOT_FOUND",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::BranchNotFound(_) => "BRANCH_NOT_FOUND",
            Self::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            Self::DuplicateSubmission(_) => "DUPLICATE_SUBMISSION",
            Self::AlreadyReversed(_) => "ALREADY_REVERSED",
            Self::Numbering(err) => err.error_code(),
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingField(_)
            | Self::InsufficientLines(_)
            | Self::InvalidAmount { .. }
            | Self::NonPositiveAmount { .. }
            | Self::AmountOutOfRange { .. }
            | Self::MissingSide(_)
            | Self::MissingAccount(_)
            | Self::Unbalanced { .. }
            | Self::UnbalancedBase { .. }
            | Self::ZeroBaseAmount(_)
            | Self::InvalidCurrency(_)
            | Self::InvalidExchangeRate(_)
            | Self::BaseCurrencyRate { .. }
            | Self::InvalidDate { .. }
            | Self::UnknownDocumentType(_)
            | Self::NotPostable(_)
            | Self::AccountInactive(_) => ErrorKind::Validation,

            Self::CompanyNotFound(_)
            | Self::AccountNotFound(_)
            | Self::BranchNotFound(_)
            | Self::EntryNotFound(_) => ErrorKind::Referential,

            Self::DuplicateSubmission(_) => ErrorKind::Duplicate,

            Self::AlreadyReversed(_) => ErrorKind::Conflict,

            Self::Numbering(err) => err.kind(),

            Self::Database(_) => ErrorKind::Infrastructure,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::new(err.kind(), err.error_code(), err.to_string())
    }
}
