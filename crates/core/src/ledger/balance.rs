//! Account balance calculations.
//!
//! Balances are always derived from posted lines, never stored:
//! - Asset/Expense: balance += debit - credit (debit-normal)
//! - Liability/Equity/Revenue: balance += credit - debit (credit-normal)

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, JournalEntryId};

use super::types::AccountType;

/// Base-currency totals of one account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    /// The account ID.
    pub account_id: AccountId,
    /// Account code.
    pub code: String,
    /// Account name.
    pub name: String,
    /// Classification.
    pub account_type: AccountType,
    /// Total base debits.
    pub debit_total: Decimal,
    /// Total base credits.
    pub credit_total: Decimal,
    /// Net balance, positive on the account's normal side.
    pub balance: Decimal,
}

impl AccountBalance {
    /// Creates a balance from aggregated totals.
    #[must_use]
    pub fn from_totals(
        account_id: AccountId,
        code: String,
        name: String,
        account_type: AccountType,
        debit_total: Decimal,
        credit_total: Decimal,
    ) -> Self {
        Self {
            account_id,
            code,
            name,
            account_type,
            debit_total,
            credit_total,
            balance: account_type.balance_change(debit_total, credit_total),
        }
    }
}

/// Trial balance of a company.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalance {
    /// Cut-off date, inclusive; `None` means everything posted.
    pub as_of: Option<NaiveDate>,
    /// One row per account with postings, ordered by code.
    pub rows: Vec<AccountBalance>,
    /// Sum of all base debits.
    pub total_debit: Decimal,
    /// Sum of all base credits.
    pub total_credit: Decimal,
    /// Whether total debits equal total credits.
    pub is_balanced: bool,
}

impl TrialBalance {
    /// Builds a trial balance from per-account rows.
    #[must_use]
    pub fn new(as_of: Option<NaiveDate>, mut rows: Vec<AccountBalance>) -> Self {
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        let total_debit: Decimal = rows.iter().map(|r| r.debit_total).sum();
        let total_credit: Decimal = rows.iter().map(|r| r.credit_total).sum();
        Self {
            as_of,
            rows,
            total_debit,
            total_credit,
            is_balanced: total_debit == total_credit,
        }
    }

    /// Looks up a row by account code.
    #[must_use]
    pub fn row(&self, code: &str) -> Option<&AccountBalance> {
        self.rows.iter().find(|r| r.code == code)
    }
}

/// A posted line as it enters a statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementEntry {
    /// Journal entry.
    pub entry_id: JournalEntryId,
    /// Document number of the entry.
    pub document_number: String,
    /// Posting date.
    pub posting_date: NaiveDate,
    /// Entry narration.
    pub narration: String,
    /// Base debit.
    pub debit: Decimal,
    /// Base credit.
    pub credit: Decimal,
}

/// A statement line with its running balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementLine {
    /// The underlying posted line.
    #[serde(flatten)]
    pub entry: StatementEntry,
    /// Balance after this line, positive on the normal side.
    pub running_balance: Decimal,
}

/// Ledger of one account over a date range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountStatement {
    /// Account code.
    pub code: String,
    /// Classification.
    pub account_type: AccountType,
    /// Balance before the first line of the range.
    pub opening_balance: Decimal,
    /// Lines in posting order.
    pub lines: Vec<StatementLine>,
    /// Balance after the last line.
    pub closing_balance: Decimal,
}

impl AccountStatement {
    /// Accumulates running balances.
    ///
    /// `entries` must already be in posting order.
    #[must_use]
    pub fn build(
        code: String,
        account_type: AccountType,
        opening_balance: Decimal,
        entries: Vec<StatementEntry>,
    ) -> Self {
        let mut running = opening_balance;
        let lines = entries
            .into_iter()
            .map(|entry| {
                running += account_type.balance_change(entry.debit, entry.credit);
                StatementLine {
                    entry,
                    running_balance: running,
                }
            })
            .collect();

        Self {
            code,
            account_type,
            opening_balance,
            lines,
            closing_balance: running,
        }
    }
}
