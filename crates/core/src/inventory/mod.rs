//! Weighted-average inventory valuation.
//!
//! The database layer locks one inventory row, hands its current `StockLevel`
//! to these functions and writes back whatever they return. Nothing here
//! looks at more than one row at a time.

pub mod error;
pub mod posting;
pub mod types;
pub mod valuation;

#[cfg(test)]
mod valuation_props;

pub use error::InventoryError;
pub use posting::StockPostings;
pub use types::{InventoryKey, MovementSource, MovementType};
pub use valuation::{StockChange, StockLevel};
