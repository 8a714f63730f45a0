//! Ledger service for proposal resolution.
//!
//! Pure business logic: the database layer loads the company's accounts and
//! hands them in through a lookup closure.

use rust_decimal::Decimal;
use tally_shared::types::CurrencyCode;

use super::error::LedgerError;
use super::proposal::Proposal;
use super::types::{AccountInfo, EntrySide, EntryTotals, ResolvedEntry, ResolvedLine, ValidatedProposal};
use super::validation::validate;
use crate::currency::{LEDGER_SCALE, convert_amount, fits_ledger};

/// Ledger service for proposal validation and resolution.
///
/// This service contains pure business logic with no database dependencies.
pub struct LedgerService;

impl LedgerService {
    /// Normalizes and validates an untrusted proposal.
    ///
    /// # Errors
    ///
    /// Returns a validation-class `LedgerError` on the first violated rule.
    pub fn prepare(
        proposal: &Proposal,
        today: chrono::NaiveDate,
    ) -> Result<ValidatedProposal, LedgerError> {
        validate(&proposal.normalize(today))
    }

    /// Resolves accounts and base amounts for a validated proposal.
    ///
    /// 1. Rejects a base-currency posting at a rate other than 1
    /// 2. Resolves every account code through `account_lookup`
    /// 3. Rejects inactive accounts
    /// 4. Converts each amount with Banker's Rounding (4 decimal places),
    ///    rejecting lines that round to zero or leave the ledger range
    /// 5. Rejects the entry if rounding left base debits and credits unequal
    ///
    /// # Errors
    ///
    /// Returns `LedgerError` if resolution fails.
    pub fn resolve<A>(
        proposal: ValidatedProposal,
        base_currency: &CurrencyCode,
        account_lookup: A,
    ) -> Result<ResolvedEntry, LedgerError>
    where
        A: Fn(&str) -> Option<AccountInfo>,
    {
        if proposal.currency == *base_currency && proposal.exchange_rate != Decimal::ONE {
            return Err(LedgerError::BaseCurrencyRate {
                currency: base_currency.to_string(),
                rate: proposal.exchange_rate,
            });
        }

        let mut lines = Vec::with_capacity(proposal.lines.len());
        for (index, line) in proposal.lines.iter().enumerate() {
            let account = account_lookup(&line.account_code)
                .ok_or_else(|| LedgerError::AccountNotFound(line.account_code.clone()))?;
            if !account.is_active {
                return Err(LedgerError::AccountInactive(account.code));
            }

            let base = convert_amount(line.amount, proposal.exchange_rate, LEDGER_SCALE)
                .filter(|base| fits_ledger(*base))
                .ok_or(LedgerError::AmountOutOfRange {
                    line: index,
                    amount: line.amount,
                })?;
            if base.is_zero() {
                return Err(LedgerError::ZeroBaseAmount(index));
            }
            let (debit_base, credit_base) = match line.side {
                EntrySide::Debit => (base, Decimal::ZERO),
                EntrySide::Credit => (Decimal::ZERO, base),
            };

            lines.push(ResolvedLine {
                account_id: account.id,
                account_code: line.account_code.clone(),
                side: line.side,
                amount: line.amount,
                debit_base,
                credit_base,
            });
        }

        let totals = Self::calculate_totals(&lines);
        if !fits_ledger(totals.debit_base) || !fits_ledger(totals.credit_base) {
            return Err(LedgerError::AmountOutOfRange {
                line: lines.len() - 1,
                amount: totals.debit_base.max(totals.credit_base),
            });
        }
        if !totals.is_balanced {
            return Err(LedgerError::UnbalancedBase {
                debit: totals.debit_base,
                credit: totals.credit_base,
            });
        }

        Ok(ResolvedEntry {
            proposal,
            lines,
            totals,
        })
    }

    /// Calculates base totals from resolved lines.
    #[must_use]
    pub fn calculate_totals(lines: &[ResolvedLine]) -> EntryTotals {
        let debit_base: Decimal = lines.iter().map(|l| l.debit_base).sum();
        let credit_base: Decimal = lines.iter().map(|l| l.credit_base).sum();

        EntryTotals::new(debit_base, credit_base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::AccountType;
    use chrono::NaiveDate;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use std::collections::HashMap;
    use tally_shared::types::AccountId;

    fn chart() -> HashMap<String, AccountInfo> {
        [
            ("1000", AccountType::Asset, true),
            ("1100", AccountType::Asset, true),
            ("4000", AccountType::Revenue, true),
            ("4900", AccountType::Revenue, false),
        ]
        .into_iter()
        .map(|(code, account_type, is_active)| {
            (
                code.to_string(),
                AccountInfo {
                    id: AccountId::new(),
                    code: code.to_string(),
                    account_type,
                    is_active,
                },
            )
        })
        .collect()
    }

    fn prepared(proposal: Proposal) -> ValidatedProposal {
        LedgerService::prepare(&proposal, NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()).unwrap()
    }

    fn inr() -> CurrencyCode {
        CurrencyCode::parse("INR").unwrap()
    }

    #[test]
    fn test_resolve_base_currency() {
        let accounts = chart();
        let proposal = prepared(
            Proposal::new(crate::numbering::DocumentType::JournalEntry, "ACME", "k", "INR")
                .debit("1000", dec!(1000))
                .credit("4000", dec!(1000)),
        );

        let entry = LedgerService::resolve(proposal, &inr(), |code| accounts.get(code).cloned()).unwrap();

        assert!(entry.totals.is_balanced);
        assert_eq!(entry.totals.debit_base, dec!(1000));
        assert_eq!(entry.lines[0].account_id, accounts["1000"].id);
        assert_eq!(entry.lines[1].signed_amount(), dec!(-1000));
        assert_eq!(entry.lines[1].credit_base, dec!(1000));
    }

    #[test]
    fn test_resolve_foreign_currency() {
        let accounts = chart();
        let proposal = prepared(
            Proposal::new(crate::numbering::DocumentType::JournalEntry, "ACME", "k", "USD")
                .with_rate(dec!(83.2512))
                .debit("1100", dec!(12.50))
                .credit("4000", dec!(12.50)),
        );

        let entry = LedgerService::resolve(proposal, &inr(), |code| accounts.get(code).cloned()).unwrap();

        assert_eq!(entry.lines[0].debit_base, dec!(1040.6400));
        assert_eq!(entry.totals.credit_base, dec!(1040.64));
    }

    #[test]
    fn test_unknown_account_is_not_found() {
        let accounts = chart();
        let proposal = prepared(
            Proposal::new(crate::numbering::DocumentType::JournalEntry, "ACME", "k", "INR")
                .debit("1000", dec!(5))
                .credit("9999", dec!(5)),
        );

        let result = LedgerService::resolve(proposal, &inr(), |code| accounts.get(code).cloned());
        assert!(matches!(result, Err(LedgerError::AccountNotFound(code)) if code == "9999"));
    }

    #[test]
    fn test_inactive_account_rejected() {
        let accounts = chart();
        let proposal = prepared(
            Proposal::new(crate::numbering::DocumentType::JournalEntry, "ACME", "k", "INR")
                .debit("1000", dec!(5))
                .credit("4900", dec!(5)),
        );

        let result = LedgerService::resolve(proposal, &inr(), |code| accounts.get(code).cloned());
        assert!(matches!(result, Err(LedgerError::AccountInactive(_))));
    }

    #[test]
    fn test_base_currency_requires_unit_rate() {
        let accounts = chart();
        let proposal = prepared(
            Proposal::new(crate::numbering::DocumentType::JournalEntry, "ACME", "k", "INR")
                .with_rate(dec!(1.5))
                .debit("1000", dec!(5))
                .credit("4000", dec!(5)),
        );

        let result = LedgerService::resolve(proposal, &inr(), |code| accounts.get(code).cloned());
        assert!(matches!(result, Err(LedgerError::BaseCurrencyRate { .. })));
    }

    #[rstest]
    #[case::beyond_column(dec!(100000000000000), dec!(1000000000))]
    #[case::decimal_overflow(dec!(100000000000000), dec!(1000000000000000))]
    fn test_base_amount_out_of_range_rejected(#[case] amount: Decimal, #[case] rate: Decimal) {
        let accounts = chart();
        let proposal = prepared(
            Proposal::new(crate::numbering::DocumentType::JournalEntry, "ACME", "k", "USD")
                .with_rate(rate)
                .debit("1100", amount)
                .credit("4000", amount),
        );

        let result = LedgerService::resolve(proposal, &inr(), |code| accounts.get(code).cloned());
        assert!(matches!(
            result,
            Err(LedgerError::AmountOutOfRange { line: 0, amount: a }) if a == amount
        ));
    }

    #[test]
    fn test_rounding_imbalance_rejected() {
        let accounts = chart();
        // 0.5 * 1.00009 = 0.500045 -> 0.5000 twice on the debit side,
        // but 1.0 * 1.00009 = 1.00009 -> 1.0001 on the credit side.
        let proposal = prepared(
            Proposal::new(crate::numbering::DocumentType::JournalEntry, "ACME", "k", "USD")
                .with_rate(dec!(1.00009))
                .debit("1000", dec!(0.5))
                .debit("1100", dec!(0.5))
                .credit("4000", dec!(1.0)),
        );

        let result = LedgerService::resolve(proposal, &inr(), |code| accounts.get(code).cloned());
        assert!(matches!(
            result,
            Err(LedgerError::UnbalancedBase { debit, credit })
                if debit == dec!(1.0000) && credit == dec!(1.0001)
        ));
    }

    #[test]
    fn test_zero_base_amount_rejected() {
        let accounts = chart();
        let proposal = prepared(
            Proposal::new(crate::numbering::DocumentType::JournalEntry, "ACME", "k", "JPY")
                .with_rate(dec!(0.0001))
                .debit("1000", dec!(0.01))
                .credit("4000", dec!(0.01)),
        );

        let result = LedgerService::resolve(proposal, &inr(), |code| accounts.get(code).cloned());
        assert!(matches!(result, Err(LedgerError::ZeroBaseAmount(0))));
    }
}
