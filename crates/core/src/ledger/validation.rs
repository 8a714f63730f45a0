//! Business rule validation for proposals.
//!
//! Everything here runs without a database: the proposal is checked for
//! shape, parseability and balance in the transaction currency. Account and
//! company existence is the resolver's job.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;
use tally_shared::types::CurrencyCode;

use super::error::LedgerError;
use super::proposal::NormalizedProposal;
use super::types::{EntrySide, ValidatedLine, ValidatedProposal};
use crate::currency::fits_ledger;
use crate::numbering::DocumentType;

/// Validates a normalized proposal.
///
/// Checks, in order: company code, idempotency key, currency, document type
/// (known and ledger postable), exchange rate, dates, at least two lines,
/// each line (account code, side, positive amount), that the running totals
/// stay inside the `NUMERIC(19, 4)` range, and finally that debits equal
/// credits in the transaction currency.
///
/// # Errors
///
/// Returns the first violated rule as a validation-class `LedgerError`.
pub fn validate(proposal: &NormalizedProposal) -> Result<ValidatedProposal, LedgerError> {
    if proposal.company_code.is_empty() {
        return Err(LedgerError::MissingField("company_code"));
    }
    if proposal.idempotency_key.is_empty() {
        return Err(LedgerError::MissingField("idempotency_key"));
    }
    if proposal.currency.is_empty() {
        return Err(LedgerError::MissingField("currency"));
    }
    let currency = CurrencyCode::parse(&proposal.currency)
        .map_err(|_| LedgerError::InvalidCurrency(proposal.currency.clone()))?;

    let document_type = DocumentType::parse(&proposal.document_type)
        .ok_or_else(|| LedgerError::UnknownDocumentType(proposal.document_type.clone()))?;
    if !document_type.is_ledger_postable() {
        return Err(LedgerError::NotPostable(document_type.prefix()));
    }

    let exchange_rate = Decimal::from_str(&proposal.exchange_rate)
        .ok()
        .filter(|rate| *rate > Decimal::ZERO)
        .ok_or_else(|| LedgerError::InvalidExchangeRate(proposal.exchange_rate.clone()))?;

    let posting_date = parse_date("posting_date", &proposal.posting_date)?;
    let document_date = parse_date("document_date", &proposal.document_date)?;

    if proposal.lines.len() < 2 {
        return Err(LedgerError::InsufficientLines(proposal.lines.len()));
    }

    let mut lines = Vec::with_capacity(proposal.lines.len());
    let mut total_debit = Decimal::ZERO;
    let mut total_credit = Decimal::ZERO;

    for (index, line) in proposal.lines.iter().enumerate() {
        if line.account_code.is_empty() {
            return Err(LedgerError::MissingAccount(index));
        }
        let side = match line.is_debit {
            Some(true) => EntrySide::Debit,
            Some(false) => EntrySide::Credit,
            None => return Err(LedgerError::MissingSide(index)),
        };
        let amount = Decimal::from_str(&line.amount).map_err(|_| LedgerError::InvalidAmount {
            line: index,
            value: line.amount.clone(),
        })?;
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount { line: index, amount });
        }

        let total = match side {
            EntrySide::Debit => &mut total_debit,
            EntrySide::Credit => &mut total_credit,
        };
        *total = total
            .checked_add(amount)
            .filter(|sum| fits_ledger(*sum))
            .ok_or(LedgerError::AmountOutOfRange { line: index, amount })?;

        lines.push(ValidatedLine {
            account_code: line.account_code.clone(),
            side,
            amount,
        });
    }

    if total_debit != total_credit {
        return Err(LedgerError::Unbalanced {
            debit: total_debit,
            credit: total_credit,
        });
    }

    Ok(ValidatedProposal {
        document_type,
        company_code: proposal.company_code.clone(),
        branch_code: proposal.branch_code.clone(),
        idempotency_key: proposal.idempotency_key.clone(),
        currency,
        exchange_rate,
        posting_date,
        document_date,
        narration: proposal.narration.clone(),
        reasoning: proposal.reasoning.clone(),
        lines,
    })
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, LedgerError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| LedgerError::InvalidDate {
        field,
        value: value.to_string(),
    })
}
