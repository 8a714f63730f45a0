//! Fixed-point money arithmetic.
//!
//! Amounts and rates are `rust_decimal::Decimal` end to end. Rounding happens
//! in exactly two places: base-currency ledger amounts (4 dp) and weighted
//! average unit costs (6 dp), both with banker's rounding.

pub mod conversion;

pub use conversion::{
    COST_SCALE, LEDGER_INTEGER_DIGITS, LEDGER_SCALE, convert_amount, fits_ledger, round_cost, round_ledger,
};
