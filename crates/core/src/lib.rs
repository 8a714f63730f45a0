//! Core bookkeeping logic for Tally.
//!
//! This crate contains pure business logic with no web or database dependencies.
//! Everything that decides whether a posting, a number or a stock movement is
//! acceptable lives here; `tally-db` only loads rows, calls into these
//! functions and writes the results inside one transaction.
//!
//! # Modules
//!
//! - `currency` - Fixed-point rounding and conversion
//! - `ledger` - Proposal normalization, validation, base resolution, reversal, balances
//! - `numbering` - Document types, numbering policy and number formatting
//! - `inventory` - Weighted-average stock valuation
//! - `orders` - Sales and purchase order state machines and posting templates

pub mod currency;
pub mod inventory;
pub mod ledger;
pub mod numbering;
pub mod orders;
