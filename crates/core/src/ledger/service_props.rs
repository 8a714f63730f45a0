//! Property-based tests for LedgerService resolution.
//!
//! - Base balance integrity: an accepted entry always balances in base currency
//! - Conversion correctness: each base amount is round(amount x rate, 4)
//! - Reversal: mirrored lines balance and cancel the original

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tally_shared::types::{AccountId, CurrencyCode};

use super::error::LedgerError;
use super::proposal::Proposal;
use super::reversal::ReversalService;
use super::service::LedgerService;
use super::types::{AccountInfo, AccountType, EntrySide, PostedLine};
use crate::currency::{LEDGER_SCALE, convert_amount};
use crate::numbering::DocumentType;

/// Strategy to generate positive decimal amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate exchange rates from 0.01 to 200 with up to 6 decimals.
fn positive_rate() -> impl Strategy<Value = Decimal> {
    (10_000i64..200_000_000i64).prop_map(|v| Decimal::new(v, 6))
}

fn chart() -> HashMap<String, AccountInfo> {
    ["1000", "1100", "4000", "5000"]
        .into_iter()
        .map(|code| {
            (
                code.to_string(),
                AccountInfo {
                    id: AccountId::new(),
                    code: code.to_string(),
                    account_type: AccountType::Asset,
                    is_active: true,
                },
            )
        })
        .collect()
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

fn base() -> CurrencyCode {
    CurrencyCode::parse("INR").unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// A two-line entry in a foreign currency always resolves: both legs
    /// round the same product the same way.
    #[test]
    fn prop_two_line_entry_balances_in_base(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let accounts = chart();
        let proposal = Proposal::new(DocumentType::JournalEntry, "ACME", "k", "USD")
            .with_rate(rate)
            .debit("1000", amount)
            .credit("4000", amount);
        let validated = LedgerService::prepare(&proposal, today()).unwrap();

        let entry = LedgerService::resolve(validated, &base(), |c| accounts.get(c).cloned()).unwrap();

        prop_assert!(entry.totals.is_balanced);
        prop_assert_eq!(Some(entry.totals.debit_base), convert_amount(amount, rate, LEDGER_SCALE));
    }

    /// Split entries either balance in base or are rejected; an unbalanced
    /// base entry is never returned.
    #[test]
    fn prop_split_entry_never_unbalanced(
        first in positive_amount(),
        second in positive_amount(),
        rate in positive_rate(),
    ) {
        let accounts = chart();
        let proposal = Proposal::new(DocumentType::JournalEntry, "ACME", "k", "USD")
            .with_rate(rate)
            .debit("1000", first)
            .debit("1100", second)
            .credit("4000", first + second);
        let validated = LedgerService::prepare(&proposal, today()).unwrap();

        match LedgerService::resolve(validated, &base(), |c| accounts.get(c).cloned()) {
            Ok(entry) => {
                prop_assert!(entry.totals.is_balanced);
                prop_assert_eq!(entry.totals.debit_base, entry.totals.credit_base);
            }
            Err(err) => prop_assert!(matches!(err, LedgerError::UnbalancedBase { .. })),
        }
    }

    /// Every resolved line carries exactly one positive base side, equal to
    /// the rounded conversion of its amount.
    #[test]
    fn prop_line_conversion(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let accounts = chart();
        let proposal = Proposal::new(DocumentType::JournalEntry, "ACME", "k", "EUR")
            .with_rate(rate)
            .debit("5000", amount)
            .credit("1000", amount);
        let validated = LedgerService::prepare(&proposal, today()).unwrap();
        let entry = LedgerService::resolve(validated, &base(), |c| accounts.get(c).cloned()).unwrap();

        let expected = convert_amount(amount, rate, LEDGER_SCALE).unwrap();
        for line in &entry.lines {
            match line.side {
                EntrySide::Debit => {
                    prop_assert_eq!(line.debit_base, expected);
                    prop_assert_eq!(line.credit_base, Decimal::ZERO);
                }
                EntrySide::Credit => {
                    prop_assert_eq!(line.credit_base, expected);
                    prop_assert_eq!(line.debit_base, Decimal::ZERO);
                }
            }
        }
    }

    /// Original plus reversal nets every account to zero.
    #[test]
    fn prop_reversal_cancels_original(
        amount in positive_amount(),
        rate in positive_rate(),
    ) {
        let accounts = chart();
        let proposal = Proposal::new(DocumentType::JournalEntry, "ACME", "k", "USD")
            .with_rate(rate)
            .debit("1000", amount)
            .credit("4000", amount);
        let validated = LedgerService::prepare(&proposal, today()).unwrap();
        let entry = LedgerService::resolve(validated, &base(), |c| accounts.get(c).cloned()).unwrap();

        let posted: Vec<PostedLine> = entry
            .lines
            .iter()
            .map(|l| PostedLine {
                account_id: l.account_id,
                amount: l.signed_amount(),
                debit_base: l.debit_base,
                credit_base: l.credit_base,
            })
            .collect();
        let reversed = ReversalService::mirror_lines(&posted);

        prop_assert!(ReversalService::is_balanced(&reversed));
        for (orig, rev) in posted.iter().zip(&reversed) {
            prop_assert_eq!(orig.amount + rev.amount, Decimal::ZERO);
            prop_assert_eq!(
                (orig.debit_base - orig.credit_base) + (rev.debit_base - rev.credit_base),
                Decimal::ZERO
            );
        }
    }
}
