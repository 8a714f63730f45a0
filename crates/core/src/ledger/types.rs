//! Ledger domain types.
//!
//! These are the shapes a proposal moves through after normalization:
//! validated (parsed, still referring to accounts by code), resolved (account
//! ids and base amounts attached) and finally committed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, CurrencyCode, DocumentId, JournalEntryId};

use crate::numbering::DocumentType;

/// Which side of the entry a line sits on.
///
/// In double-entry bookkeeping:
/// - Debits increase asset/expense accounts, decrease liability/equity/revenue accounts
/// - Credits decrease asset/expense accounts, increase liability/equity/revenue accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntrySide {
    /// Debit leg.
    Debit,
    /// Credit leg.
    Credit,
}

impl EntrySide {
    /// Returns the opposite side.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Debit => Self::Credit,
            Self::Credit => Self::Debit,
        }
    }

    /// Applies the side's sign to a positive amount.
    #[must_use]
    pub fn signed(self, amount: Decimal) -> Decimal {
        match self {
            Self::Debit => amount,
            Self::Credit => -amount,
        }
    }
}

/// Account classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// Asset (debit normal).
    Asset,
    /// Liability (credit normal).
    Liability,
    /// Equity (credit normal).
    Equity,
    /// Revenue (credit normal).
    Revenue,
    /// Expense (debit normal).
    Expense,
}

impl AccountType {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Asset => "asset",
            Self::Liability => "liability",
            Self::Equity => "equity",
            Self::Revenue => "revenue",
            Self::Expense => "expense",
        }
    }

    /// Parses the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asset" => Some(Self::Asset),
            "liability" => Some(Self::Liability),
            "equity" => Some(Self::Equity),
            "revenue" => Some(Self::Revenue),
            "expense" => Some(Self::Expense),
            _ => None,
        }
    }

    /// Returns the side on which a balance of this type is positive.
    #[must_use]
    pub const fn normal_side(self) -> EntrySide {
        match self {
            Self::Asset | Self::Expense => EntrySide::Debit,
            Self::Liability | Self::Equity | Self::Revenue => EntrySide::Credit,
        }
    }

    /// Balance movement for a debit/credit pair, positive on the normal side.
    #[must_use]
    pub fn balance_change(self, debit: Decimal, credit: Decimal) -> Decimal {
        match self.normal_side() {
            EntrySide::Debit => debit - credit,
            EntrySide::Credit => credit - debit,
        }
    }
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Account facts needed to resolve a line.
#[derive(Debug, Clone)]
pub struct AccountInfo {
    /// The account ID.
    pub id: AccountId,
    /// Code unique within the company.
    pub code: String,
    /// Classification.
    pub account_type: AccountType,
    /// Whether the account accepts postings.
    pub is_active: bool,
}

/// A parsed proposal line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedLine {
    /// Account code, not yet resolved.
    pub account_code: String,
    /// Debit or credit.
    pub side: EntrySide,
    /// Positive amount in the transaction currency.
    pub amount: Decimal,
}

/// A proposal that passed every check that needs no database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProposal {
    /// Document type the entry is numbered under.
    pub document_type: DocumentType,
    /// Company code, not yet resolved.
    pub company_code: String,
    /// Optional branch code, used for branch-scoped numbering.
    pub branch_code: Option<String>,
    /// Idempotency key.
    pub idempotency_key: String,
    /// Transaction currency.
    pub currency: CurrencyCode,
    /// Transaction currency to base currency rate.
    pub exchange_rate: Decimal,
    /// Ledger date.
    pub posting_date: NaiveDate,
    /// Date printed on the source document.
    pub document_date: NaiveDate,
    /// Entry narration.
    pub narration: String,
    /// Free-form explanation from the proposer.
    pub reasoning: Option<String>,
    /// At least two lines, debits equal to credits.
    pub lines: Vec<ValidatedLine>,
}

/// A line with its account and base amounts resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    /// Resolved account.
    pub account_id: AccountId,
    /// Account code as proposed.
    pub account_code: String,
    /// Debit or credit.
    pub side: EntrySide,
    /// Positive amount in the transaction currency.
    pub amount: Decimal,
    /// Base-currency debit, zero on credit lines.
    pub debit_base: Decimal,
    /// Base-currency credit, zero on debit lines.
    pub credit_base: Decimal,
}

impl ResolvedLine {
    /// Signed amount as stored: positive for debits, negative for credits.
    #[must_use]
    pub fn signed_amount(&self) -> Decimal {
        self.side.signed(self.amount)
    }
}

/// Base-currency totals of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryTotals {
    /// Sum of base debits.
    pub debit_base: Decimal,
    /// Sum of base credits.
    pub credit_base: Decimal,
    /// Whether the two sums are exactly equal.
    pub is_balanced: bool,
}

impl EntryTotals {
    /// Creates totals from the two sums.
    #[must_use]
    pub fn new(debit_base: Decimal, credit_base: Decimal) -> Self {
        Self {
            debit_base,
            credit_base,
            is_balanced: debit_base == credit_base,
        }
    }
}

/// A fully resolved entry ready to be written.
#[derive(Debug, Clone)]
pub struct ResolvedEntry {
    /// The validated proposal the entry came from.
    pub proposal: ValidatedProposal,
    /// Resolved lines, in proposal order.
    pub lines: Vec<ResolvedLine>,
    /// Base totals.
    pub totals: EntryTotals,
}

/// Result of a successful commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitOutcome {
    /// The new journal entry.
    pub entry_id: JournalEntryId,
    /// The numbered document envelope.
    pub document_id: DocumentId,
    /// Formatted document number.
    pub document_number: String,
    /// Sum of base debits (equal to base credits).
    pub total_base: Decimal,
}

/// A stored line, as read back for reversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostedLine {
    /// Account.
    pub account_id: AccountId,
    /// Signed transaction-currency amount.
    pub amount: Decimal,
    /// Base debit.
    pub debit_base: Decimal,
    /// Base credit.
    pub credit_base: Decimal,
}
