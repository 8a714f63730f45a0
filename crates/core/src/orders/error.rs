//! Order error types.

use rust_decimal::Decimal;
use tally_shared::{AppError, ErrorKind};
use thiserror::Error;
use uuid::Uuid;

use super::types::OrderKind;

/// Errors that can occur during order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The order is not in a state that allows the action.
    #[error("Cannot {action} {kind} in status {from}")]
    InvalidTransition {
        /// Sales or purchase.
        kind: OrderKind,
        /// Current status.
        from: &'static str,
        /// Attempted action.
        action: &'static str,
    },

    /// A stored status string is not a known status.
    #[error("Unknown {kind} status '{status}'")]
    UnknownStatus {
        /// Sales or purchase.
        kind: OrderKind,
        /// The stored value.
        status: String,
    },

    /// No order with this id in the company.
    #[error("{kind} not found: {id}")]
    OrderNotFound {
        /// Sales or purchase.
        kind: OrderKind,
        /// Document id.
        id: Uuid,
    },

    /// An order needs at least one line.
    #[error("Order must have at least one line")]
    EmptyOrder,

    /// A line quantity is zero or negative.
    #[error("Line {line}: quantity must be positive, got {quantity}")]
    InvalidLineQuantity {
        /// Zero-based line index.
        line: usize,
        /// The quantity.
        quantity: Decimal,
    },

    /// A line price or cost is negative.
    #[error("Line {line}: price cannot be negative, got {price}")]
    NegativeLinePrice {
        /// Zero-based line index.
        line: usize,
        /// The price.
        price: Decimal,
    },

    /// A line price or cost has more decimal places than the ledger keeps.
    #[error("Line {line}: price {price} has more than 4 decimal places")]
    LinePricePrecision {
        /// Zero-based line index.
        line: usize,
        /// The price.
        price: Decimal,
    },

    /// A line value, its base conversion or the running order total exceeds
    /// the ledger range.
    #[error("Line {0}: value is outside the ledger range")]
    LineValueOutOfRange(usize),

    /// Order exchange rate is not positive.
    #[error("Exchange rate must be positive, got {0}")]
    InvalidExchangeRate(Decimal),

    /// Customer not found in the company.
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Vendor not found in the company.
    #[error("Vendor not found: {0}")]
    VendorNotFound(String),

    /// A receipt names a line that is not on the order.
    #[error("Order line not found: {0}")]
    LineNotFound(Uuid),

    /// A goods receipt with nothing to receive.
    #[error("Goods receipt must receive at least one line")]
    EmptyReceipt,

    /// Cumulative receipts would exceed the ordered quantity.
    #[error("Over-receipt on line {line_id}: ordered {ordered}, received {received}, requested {requested}")]
    OverReceipt {
        /// Order line.
        line_id: Uuid,
        /// Ordered quantity.
        ordered: Decimal,
        /// Already received.
        received: Decimal,
        /// Quantity in this receipt.
        requested: Decimal,
    },

    /// A purchase order with receipts cannot be cancelled.
    #[error("Purchase order {0} has receipts and cannot be cancelled")]
    HasReceipts(Uuid),

    /// Vendor invoice amount is not positive.
    #[error("Invoice amount must be positive, got {0}")]
    InvalidInvoiceAmount(Decimal),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),
}

impl OrderError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::UnknownStatus { .. } => "UNKNOWN_STATUS",
            Self::OrderNotFound { .. } => "ORDER_NOT_FOUND",
            Self::EmptyOrder => "EMPTY_ORDER",
            Self::InvalidLineQuantity { .. } => "INVALID_LINE_QUANTITY",
            Self::NegativeLinePrice { .. } => "NEGATIVE_LINE_PRICE",
            Self::LinePricePrecision { .. } => "LINE_PRICE_PRECISION",
            Self::LineValueOutOfRange(_) => "LINE_VALUE_OUT_OF_RANGE",
            Self::InvalidExchangeRate(_) => "INVALID_EXCHANGE_RATE",
            Self::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            Self::VendorNotFound(_) => "VENDOR_NOT_FOUND",
            Self::LineNotFound(_) => "LINE_NOT_FOUND",
            Self::EmptyReceipt => "EMPTY_RECEIPT",
            Self::OverReceipt { .. } => "OVER_RECEIPT",
            Self::HasReceipts(_) => "HAS_RECEIPTS",
            Self::InvalidInvoiceAmount(_) => "INVALID_INVOICE_AMOUNT",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the failure class.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyOrder
            | Self::InvalidLineQuantity { .. }
            | Self::NegativeLinePrice { .. }
            | Self::LinePricePrecision { .. }
            | Self::LineValueOutOfRange(_)
            | Self::InvalidExchangeRate(_)
            | Self::EmptyReceipt
            | Self::InvalidInvoiceAmount(_) => ErrorKind::Validation,

            Self::OrderNotFound { .. }
            | Self::CustomerNotFound(_)
            | Self::VendorNotFound(_)
            | Self::LineNotFound(_) => ErrorKind::Referential,

            Self::InvalidTransition { .. } | Self::OverReceipt { .. } | Self::HasReceipts(_) => {
                ErrorKind::Conflict
            }

            Self::UnknownStatus { .. } | Self::Database(_) => ErrorKind::Infrastructure,
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        Self::new(err.kind(), err.error_code(), err.to_string())
    }
}
