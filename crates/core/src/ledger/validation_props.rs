//! Property-based tests for proposal validation rules.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::LedgerError;
use super::proposal::{Proposal, ProposalLine};
use super::validation::validate;

/// Strategy to generate a valid positive amount (> 0).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    // Generate amounts from 0.01 to 1,000,000.00
    (1i64..100_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy to generate a zero or negative amount.
fn non_positive_amount() -> impl Strategy<Value = Decimal> {
    (0i64..100_000_000i64).prop_map(|cents| Decimal::new(-cents, 2))
}

/// Strategy to generate surrounding whitespace.
fn padding() -> impl Strategy<Value = String> {
    prop_oneof![Just(String::new()), Just(" ".to_string()), Just("\t ".to_string())]
}

fn line(code: &str, is_debit: bool, amount: Decimal) -> ProposalLine {
    ProposalLine {
        account_code: Some(code.to_string()),
        is_debit: Some(is_debit),
        amount: Some(amount.to_string()),
    }
}

fn proposal(lines: Vec<ProposalLine>) -> Proposal {
    Proposal {
        company_code: Some("ACME".to_string()),
        idempotency_key: Some("prop".to_string()),
        currency: Some("INR".to_string()),
        lines,
        ..Proposal::default()
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 1, 15).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Any split of a total into debit lines balanced by one credit line is accepted.
    #[test]
    fn prop_balanced_accepted(amounts in prop::collection::vec(positive_amount(), 1..8)) {
        let total: Decimal = amounts.iter().copied().sum();
        let mut lines: Vec<_> = amounts.iter().map(|a| line("5000", true, *a)).collect();
        lines.push(line("1000", false, total));

        let validated = validate(&proposal(lines).normalize(today()));
        prop_assert!(validated.is_ok());
        prop_assert_eq!(validated.unwrap().lines.len(), amounts.len() + 1);
    }

    /// Debits different from credits are always rejected as unbalanced.
    #[test]
    fn prop_unbalanced_rejected(debit in positive_amount(), credit in positive_amount()) {
        prop_assume!(debit != credit);
        let lines = vec![line("1000", true, debit), line("4000", false, credit)];

        let result = validate(&proposal(lines).normalize(today()));
        prop_assert!(
            matches!(result, Err(LedgerError::Unbalanced { .. })),
            "unbalanced proposal should be rejected"
        );
    }

    /// A zero or negative amount is rejected even if the entry balances.
    #[test]
    fn prop_non_positive_rejected(amount in non_positive_amount()) {
        let lines = vec![line("1000", true, amount), line("4000", false, amount)];

        let result = validate(&proposal(lines).normalize(today()));
        prop_assert!(
            matches!(result, Err(LedgerError::NonPositiveAmount { line: 0, .. })),
            "non-positive amount should be rejected"
        );
    }

    /// Surrounding whitespace never changes the outcome.
    #[test]
    fn prop_whitespace_insensitive(amount in positive_amount(), pad in padding()) {
        let clean = proposal(vec![line("1000", true, amount), line("4000", false, amount)]);
        let mut padded = clean.clone();
        padded.company_code = Some(format!("{pad}ACME{pad}"));
        padded.currency = Some(format!("{pad}inr{pad}"));
        for l in &mut padded.lines {
            l.account_code = l.account_code.as_ref().map(|c| format!("{pad}{c}{pad}"));
            l.amount = l.amount.as_ref().map(|a| format!("{pad}{a}{pad}"));
        }

        let a = validate(&clean.normalize(today())).unwrap();
        let b = validate(&padded.normalize(today())).unwrap();
        prop_assert_eq!(a, b);
    }
}
