//! Inventory error types.

use rust_decimal::Decimal;
use tally_shared::types::{ProductId, WarehouseId};
use tally_shared::{AppError, ErrorKind};
use thiserror::Error;

/// Errors that can occur during stock mutations.
#[derive(Debug, Error)]
pub enum InventoryError {
    /// Quantity is zero or negative.
    #[error("Quantity must be positive, got {0}")]
    InvalidQuantity(Decimal),

    /// Unit cost is negative.
    #[error("Unit cost cannot be negative, got {0}")]
    NegativeCost(Decimal),

    /// Not enough available stock.
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        /// Quantity asked for.
        requested: Decimal,
        /// On hand minus reserved (plus own reservation when shipping from it).
        available: Decimal,
    },

    /// Releasing or consuming more reservation than exists.
    #[error("Reservation underflow: requested {requested}, reserved {reserved}")]
    ReservationUnderflow {
        /// Quantity asked for.
        requested: Decimal,
        /// Currently reserved.
        reserved: Decimal,
    },

    /// An adjustment would leave less on hand than is reserved.
    #[error("Adjustment would leave {on_hand} on hand with {reserved} reserved")]
    AdjustmentBelowReserved {
        /// Resulting on-hand quantity.
        on_hand: Decimal,
        /// Currently reserved.
        reserved: Decimal,
    },

    /// Stock product without an inventory row at that warehouse.
    #[error("No inventory for product {product_id} at warehouse {warehouse_id}")]
    UnknownItem {
        /// Product.
        product_id: ProductId,
        /// Warehouse.
        warehouse_id: WarehouseId,
    },

    /// Product not found in the company.
    #[error("Product not found: {0}")]
    ProductNotFound(ProductId),

    /// Warehouse not found in the company.
    #[error("Warehouse not found: {0}")]
    WarehouseNotFound(WarehouseId),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl InventoryError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidQuantity(_) => "INVALID_QUANTITY",
            Self::NegativeCost(_) => "NEGATIVE_COST",
            Self::InsufficientStock { .. } => "INSUFFICIENT_STOCK",
            Self::ReservationUnderflow { .. } => "RESERVATION_UNDERFLOW",
            Self::AdjustmentBelowReserved { .. } => "ADJUSTMENT_BELOW_RESERVED",
            Self::UnknownItem { .. } => "UNKNOWN_ITEM",
            Self::ProductNotFound(_) => "PRODUCT_NOT_FOUND",
            Self::WarehouseNotFound(_) => "WAREHOUSE_NOT_FOUND",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidQuantity(_) | Self::NegativeCost(_) => ErrorKind::Validation,
            Self::UnknownItem { .. } | Self::ProductNotFound(_) | Self::WarehouseNotFound(_) => {
                ErrorKind::Referential
            }
            Self::InsufficientStock { .. }
            | Self::ReservationUnderflow { .. }
            | Self::AdjustmentBelowReserved { .. } => ErrorKind::Conflict,
            Self::Database(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        Self::new(err.kind(), err.error_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(InventoryError::InvalidQuantity(Decimal::ZERO).kind(), ErrorKind::Validation);
        assert_eq!(
            InventoryError::InsufficientStock {
                requested: Decimal::TEN,
                available: Decimal::ONE,
            }
            .kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            InventoryError::UnknownItem {
                product_id: ProductId::new(),
                warehouse_id: WarehouseId::new(),
            }
            .error_code(),
            "UNKNOWN_ITEM"
        );
    }
}
