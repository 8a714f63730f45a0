//! Untrusted posting proposals and their normalization.
//!
//! A `Proposal` is plain data from outside the core: a language-model
//! adapter, a CLI, or one of the order state machines. Every field is
//! optional and stringly typed. `normalize` cleans it up without judging it;
//! `validation::validate` then decides whether it is acceptable.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::numbering::DocumentType;

/// A proposed journal entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Proposal {
    /// Document type code (`JE`, `INV`, ...).
    pub document_type: Option<String>,
    /// Company code.
    pub company_code: Option<String>,
    /// Branch code for branch-scoped numbering.
    pub branch_code: Option<String>,
    /// Caller-chosen key; the same key never commits twice.
    pub idempotency_key: Option<String>,
    /// Transaction currency.
    pub currency: Option<String>,
    /// Transaction-to-base exchange rate.
    pub exchange_rate: Option<String>,
    /// Ledger date, `YYYY-MM-DD`.
    pub posting_date: Option<String>,
    /// Source document date, `YYYY-MM-DD`.
    pub document_date: Option<String>,
    /// Entry narration.
    pub narration: Option<String>,
    /// Why the proposer chose these lines.
    pub reasoning: Option<String>,
    /// Entry lines.
    pub lines: Vec<ProposalLine>,
}

/// One proposed line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProposalLine {
    /// Account code within the company.
    pub account_code: Option<String>,
    /// `true` for a debit, `false` for a credit.
    pub is_debit: Option<bool>,
    /// Positive decimal string in the transaction currency.
    pub amount: Option<String>,
}

/// A proposal with whitespace and defaults sorted out.
///
/// Blank means absent: an empty string here is a missing value that
/// validation will reject where it matters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedProposal {
    /// Document type code, defaulted to `JE`.
    pub document_type: String,
    /// Company code.
    pub company_code: String,
    /// Branch code, if any.
    pub branch_code: Option<String>,
    /// Idempotency key.
    pub idempotency_key: String,
    /// Uppercased currency code.
    pub currency: String,
    /// Exchange rate, defaulted to `1.0`.
    pub exchange_rate: String,
    /// Posting date, defaulted to today.
    pub posting_date: String,
    /// Document date, defaulted to the posting date.
    pub document_date: String,
    /// Narration.
    pub narration: String,
    /// Reasoning, if any.
    pub reasoning: Option<String>,
    /// Normalized lines.
    pub lines: Vec<NormalizedLine>,
}

/// A proposal line after normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    /// Account code.
    pub account_code: String,
    /// Debit flag, still possibly missing.
    pub is_debit: Option<bool>,
    /// Amount string, `0.00` when blank.
    pub amount: String,
}

fn clean(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_string()
}

fn clean_optional(value: Option<&str>) -> Option<String> {
    let cleaned = clean(value);
    (!cleaned.is_empty()).then_some(cleaned)
}

/// Blank and `null` numbers become `0.00`.
fn clean_number(value: Option<&str>) -> String {
    let cleaned = clean(value);
    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("null") {
        "0.00".to_string()
    } else {
        cleaned
    }
}

impl Proposal {
    /// Starts a proposal the way the order state machines build them.
    #[must_use]
    pub fn new(
        document_type: DocumentType,
        company_code: &str,
        idempotency_key: impl Into<String>,
        currency: &str,
    ) -> Self {
        Self {
            document_type: Some(document_type.prefix().to_string()),
            company_code: Some(company_code.to_string()),
            idempotency_key: Some(idempotency_key.into()),
            currency: Some(currency.to_string()),
            ..Self::default()
        }
    }

    /// Sets the exchange rate.
    #[must_use]
    pub fn with_rate(mut self, rate: Decimal) -> Self {
        self.exchange_rate = Some(rate.to_string());
        self
    }

    /// Sets posting and document date.
    #[must_use]
    pub fn on(mut self, date: NaiveDate) -> Self {
        self.posting_date = Some(date.to_string());
        self.document_date = Some(date.to_string());
        self
    }

    /// Sets the branch used for numbering.
    #[must_use]
    pub fn in_branch(mut self, branch_code: Option<&str>) -> Self {
        self.branch_code = branch_code.map(str::to_string);
        self
    }

    /// Sets the narration.
    #[must_use]
    pub fn narrated(mut self, narration: impl Into<String>) -> Self {
        self.narration = Some(narration.into());
        self
    }

    /// Appends a debit line.
    #[must_use]
    pub fn debit(self, account_code: &str, amount: Decimal) -> Self {
        self.line(account_code, true, amount)
    }

    /// Appends a credit line.
    #[must_use]
    pub fn credit(self, account_code: &str, amount: Decimal) -> Self {
        self.line(account_code, false, amount)
    }

    fn line(mut self, account_code: &str, is_debit: bool, amount: Decimal) -> Self {
        self.lines.push(ProposalLine {
            account_code: Some(account_code.to_string()),
            is_debit: Some(is_debit),
            amount: Some(amount.to_string()),
        });
        self
    }

    /// Normalizes the proposal. Never fails.
    ///
    /// - strings are trimmed
    /// - blank or `null` amounts become `0.00`, a blank rate becomes `1.0`
    /// - the currency is uppercased
    /// - a blank document type becomes `JE`
    /// - a blank posting date becomes `today`, a blank document date the posting date
    #[must_use]
    pub fn normalize(&self, today: NaiveDate) -> NormalizedProposal {
        let document_type = clean(self.document_type.as_deref());
        let document_type = if document_type.is_empty() {
            DocumentType::JournalEntry.prefix().to_string()
        } else {
            document_type.to_ascii_uppercase()
        };

        let exchange_rate = clean(self.exchange_rate.as_deref());
        let exchange_rate = if exchange_rate.is_empty() || exchange_rate.eq_ignore_ascii_case("null") {
            "1.0".to_string()
        } else {
            exchange_rate
        };

        let posting_date = clean(self.posting_date.as_deref());
        let posting_date = if posting_date.is_empty() {
            today.to_string()
        } else {
            posting_date
        };

        let document_date = clean(self.document_date.as_deref());
        let document_date = if document_date.is_empty() {
            posting_date.clone()
        } else {
            document_date
        };

        NormalizedProposal {
            document_type,
            company_code: clean(self.company_code.as_deref()),
            branch_code: clean_optional(self.branch_code.as_deref()),
            idempotency_key: clean(self.idempotency_key.as_deref()),
            currency: clean(self.currency.as_deref()).to_ascii_uppercase(),
            exchange_rate,
            posting_date,
            document_date,
            narration: clean(self.narration.as_deref()),
            reasoning: clean_optional(self.reasoning.as_deref()),
            lines: self
                .lines
                .iter()
                .map(|line| NormalizedLine {
                    account_code: clean(line.account_code.as_deref()),
                    is_debit: line.is_debit,
                    amount: clean_number(line.amount.as_deref()),
                })
                .collect(),
        }
    }
}
