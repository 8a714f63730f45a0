//! Property-based tests for stock valuation.
//!
//! - Weighted average: q1@c1 then q2@c2 gives (q1c1 + q2c2) / (q1 + q2)
//! - Invariants: on hand and reserved never negative, reserved <= on hand
//! - Rejected mutations leave nothing to write

use proptest::prelude::*;
use rust_decimal::Decimal;

use super::error::InventoryError;
use super::valuation::StockLevel;
use crate::currency::round_cost;

/// Whole quantities from 1 to 1000.
fn quantity() -> impl Strategy<Value = Decimal> {
    (1i64..=1000i64).prop_map(Decimal::from)
}

/// Unit costs from 0.01 to 10,000.00.
fn unit_cost() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

#[derive(Debug, Clone)]
enum Op {
    Receive(Decimal, Decimal),
    Reserve(Decimal),
    Cancel(Decimal),
    Ship(Decimal, bool),
    Adjust(Decimal),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (quantity(), unit_cost()).prop_map(|(q, c)| Op::Receive(q, c)),
        quantity().prop_map(Op::Reserve),
        quantity().prop_map(Op::Cancel),
        (quantity(), any::<bool>()).prop_map(|(q, r)| Op::Ship(q, r)),
        (-1000i64..=1000i64).prop_map(|q| Op::Adjust(Decimal::from(q))),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Two receipts into an empty row average exactly as the formula says.
    #[test]
    fn prop_two_receipts_weighted_average(
        q1 in quantity(), c1 in unit_cost(),
        q2 in quantity(), c2 in unit_cost(),
    ) {
        let first = StockLevel::default().receive(q1, c1).unwrap();
        let second = first.level.receive(q2, c2).unwrap();

        let expected = round_cost((q1 * c1 + q2 * c2) / (q1 + q2));
        prop_assert_eq!(first.level.unit_cost, c1);
        prop_assert_eq!(second.level.unit_cost, expected);
        prop_assert_eq!(second.level.qty_on_hand, q1 + q2);
    }

    /// Any sequence of operations, applying only the accepted ones, keeps
    /// the row invariants and keeps on-hand equal to the sum of movements.
    #[test]
    fn prop_invariants_hold_under_any_sequence(ops in prop::collection::vec(op(), 1..40)) {
        let mut level = StockLevel::default();
        let mut on_hand_from_movements = Decimal::ZERO;

        for op in ops {
            let result = match &op {
                Op::Receive(q, c) => level.receive(*q, *c),
                Op::Reserve(q) => level.reserve(*q),
                Op::Cancel(q) => level.cancel_reservation(*q),
                Op::Ship(q, r) => level.ship(*q, *r),
                Op::Adjust(q) => level.adjust(*q),
            };

            match result {
                Ok(change) => {
                    if matches!(op, Op::Receive(..) | Op::Ship(..) | Op::Adjust(..)) {
                        on_hand_from_movements += change.quantity;
                    }
                    level = change.level;
                }
                Err(err) => prop_assert!(!matches!(err, InventoryError::Database(_))),
            }

            prop_assert!(level.qty_on_hand >= Decimal::ZERO);
            prop_assert!(level.qty_reserved >= Decimal::ZERO);
            prop_assert!(level.qty_reserved <= level.qty_on_hand);
            prop_assert_eq!(level.qty_on_hand, on_hand_from_movements);
        }
    }

    /// Shipping more than is available always fails.
    #[test]
    fn prop_over_shipment_rejected(on_hand in quantity(), extra in quantity(), cost in unit_cost()) {
        let level = StockLevel::default().receive(on_hand, cost).unwrap().level;
        let result = level.ship(on_hand + extra, false);
        let is_insufficient = matches!(result, Err(InventoryError::InsufficientStock { .. }));
        prop_assert!(is_insufficient);
    }
}
