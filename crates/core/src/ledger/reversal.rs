//! Compensating entries.
//!
//! A posted entry is never changed. Undoing it means committing a second
//! entry whose lines mirror the first with debit and credit swapped.

use rust_decimal::Decimal;
use uuid::Uuid;

use super::types::PostedLine;

/// Stateless service for building reversal lines.
pub struct ReversalService;

impl ReversalService {
    /// Mirrors posted lines.
    ///
    /// For each original line:
    /// - The signed amount is negated
    /// - Base debit and base credit swap places exactly, with no re-rounding
    /// - Account, currency and rate are preserved by the caller
    #[must_use]
    pub fn mirror_lines(original: &[PostedLine]) -> Vec<PostedLine> {
        original
            .iter()
            .map(|line| PostedLine {
                account_id: line.account_id,
                amount: -line.amount,
                debit_base: line.credit_base,
                credit_base: line.debit_base,
            })
            .collect()
    }

    /// Default idempotency key for reversing an entry.
    #[must_use]
    pub fn default_idempotency_key(entry_id: Uuid) -> String {
        format!("reversal:{entry_id}")
    }

    /// Narration of the compensating entry.
    #[must_use]
    pub fn narration(original_number: &str, original_narration: &str) -> String {
        if original_narration.is_empty() {
            format!("Reversal of {original_number}")
        } else {
            format!("Reversal of {original_number}: {original_narration}")
        }
    }

    /// Checks that stored lines balance in base currency.
    ///
    /// Always true for entries the ledger wrote.
    #[must_use]
    pub fn is_balanced(lines: &[PostedLine]) -> bool {
        let total_debit: Decimal = lines.iter().map(|l| l.debit_base).sum();
        let total_credit: Decimal = lines.iter().map(|l| l.credit_base).sum();

        total_debit == total_credit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use tally_shared::types::AccountId;

    fn create_balanced_lines() -> Vec<PostedLine> {
        vec![
            PostedLine {
                account_id: AccountId::new(),
                amount: dec!(12.50),
                debit_base: dec!(1040.6400),
                credit_base: Decimal::ZERO,
            },
            PostedLine {
                account_id: AccountId::new(),
                amount: dec!(-12.50),
                debit_base: Decimal::ZERO,
                credit_base: dec!(1040.6400),
            },
        ]
    }

    #[test]
    fn test_mirror_swaps_sides_exactly() {
        let original = create_balanced_lines();
        let mirrored = ReversalService::mirror_lines(&original);

        assert_eq!(mirrored.len(), 2);
        for (orig, rev) in original.iter().zip(&mirrored) {
            assert_eq!(rev.account_id, orig.account_id);
            assert_eq!(rev.amount, -orig.amount);
            assert_eq!(rev.debit_base, orig.credit_base);
            assert_eq!(rev.credit_base, orig.debit_base);
        }
        assert!(ReversalService::is_balanced(&mirrored));
    }

    #[test]
    fn test_mirror_twice_is_identity() {
        let original = create_balanced_lines();
        let twice = ReversalService::mirror_lines(&ReversalService::mirror_lines(&original));
        assert_eq!(twice, original);
    }

    #[test]
    fn test_default_idempotency_key() {
        let id = Uuid::nil();
        assert_eq!(
            ReversalService::default_idempotency_key(id),
            "reversal:00000000-0000-0000-0000-000000000000"
        );
    }

    #[test]
    fn test_narration() {
        assert_eq!(
            ReversalService::narration("JE-2026-000001", "Office rent"),
            "Reversal of JE-2026-000001: Office rent"
        );
        assert_eq!(ReversalService::narration("JE-2026-000002", ""), "Reversal of JE-2026-000002");
    }

    #[test]
    fn test_unbalanced_detected() {
        let mut lines = create_balanced_lines();
        lines[0].debit_base = dec!(1040.6500);
        assert!(!ReversalService::is_balanced(&lines));
    }
}
