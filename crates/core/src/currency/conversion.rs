//! Currency conversion and rounding.
//!
//! CRITICAL: rounding rules for every stored amount:
//! - Always round with banker's rounding (round half to even)
//! - Ledger base amounts carry `LEDGER_SCALE` decimal places
//! - Unit costs carry `COST_SCALE` decimal places

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

/// Decimal places of every ledger amount (transaction and base currency).
pub const LEDGER_SCALE: u32 = 4;

/// Decimal places of a weighted-average unit cost.
pub const COST_SCALE: u32 = 6;

/// Integer digits of a `NUMERIC(19, 4)` ledger column.
pub const LEDGER_INTEGER_DIGITS: u32 = 15;

/// Returns true if the amount fits a `NUMERIC(19, 4)` column.
#[must_use]
pub fn fits_ledger(amount: Decimal) -> bool {
    amount.abs() < Decimal::from(10_i64.pow(LEDGER_INTEGER_DIGITS))
}

/// Converts an amount using the given exchange rate.
///
/// Uses banker's rounding (round half to even) to minimize cumulative errors.
/// Returns `None` if the product overflows `Decimal`.
#[must_use]
pub fn convert_amount(amount: Decimal, rate: Decimal, decimal_places: u32) -> Option<Decimal> {
    amount
        .checked_mul(rate)
        .map(|converted| converted.round_dp_with_strategy(decimal_places, RoundingStrategy::MidpointNearestEven))
}

/// Rounds to the ledger scale.
#[must_use]
pub fn round_ledger(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(LEDGER_SCALE, RoundingStrategy::MidpointNearestEven)
}

/// Rounds to the unit-cost scale.
#[must_use]
pub fn round_cost(cost: Decimal) -> Decimal {
    cost.round_dp_with_strategy(COST_SCALE, RoundingStrategy::MidpointNearestEven)
}
