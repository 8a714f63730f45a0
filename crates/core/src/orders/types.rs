//! Order line inputs and receipt bookkeeping.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_shared::types::{ProductId, WarehouseId};
use uuid::Uuid;

use super::error::OrderError;
use crate::currency::{COST_SCALE, LEDGER_SCALE, convert_amount, fits_ledger, round_ledger};

/// Which order family an error or key refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    /// Sales order.
    Sales,
    /// Purchase order.
    Purchase,
}

impl OrderKind {
    /// Prefix of the deterministic idempotency keys of this kind.
    #[must_use]
    pub const fn key_prefix(self) -> &'static str {
        match self {
            Self::Sales => "so",
            Self::Purchase => "po",
        }
    }

    /// Idempotency key of one transition, e.g. `so:<id>:ship`.
    #[must_use]
    pub fn idempotency_key(self, order_id: Uuid, step: &str) -> String {
        format!("{}:{order_id}:{step}", self.key_prefix())
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sales => f.write_str("sales order"),
            Self::Purchase => f.write_str("purchase order"),
        }
    }
}

/// One line of a new order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLineInput {
    /// Product.
    pub product_id: ProductId,
    /// Warehouse the goods leave from or arrive at.
    pub warehouse_id: WarehouseId,
    /// Ordered quantity.
    pub quantity: Decimal,
    /// Unit price (sales) or unit cost (purchase), in the order currency.
    pub unit_price: Decimal,
}

impl OrderLineInput {
    /// Line amount in the order currency, ledger scale.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        round_ledger(self.quantity * self.unit_price)
    }
}

/// Validates the lines of a new order.
///
/// Prices are kept at ledger scale, and every line value must fit the ledger
/// both in the order currency and converted at `exchange_rate`, as must the
/// unit price in base currency and the order total.
///
/// # Errors
///
/// `EmptyOrder`, `InvalidLineQuantity`, `NegativeLinePrice`,
/// `LinePricePrecision` or `LineValueOutOfRange`.
pub fn validate_lines(
    lines: &[OrderLineInput],
    exchange_rate: Decimal,
) -> Result<(), OrderError> {
    if lines.is_empty() {
        return Err(OrderError::EmptyOrder);
    }
    let mut total_base = Decimal::ZERO;
    for (index, line) in lines.iter().enumerate() {
        if line.quantity <= Decimal::ZERO {
            return Err(OrderError::InvalidLineQuantity {
                line: index,
                quantity: line.quantity,
            });
        }
        if line.unit_price < Decimal::ZERO {
            return Err(OrderError::NegativeLinePrice {
                line: index,
                price: line.unit_price,
            });
        }
        if line.unit_price.normalize().scale() > LEDGER_SCALE {
            return Err(OrderError::LinePricePrecision {
                line: index,
                price: line.unit_price,
            });
        }

        let in_range = |value: Option<Decimal>| value.filter(|v| fits_ledger(*v));
        let value = in_range(line.quantity.checked_mul(line.unit_price));
        let value_base =
            value.and_then(|v| in_range(convert_amount(v, exchange_rate, LEDGER_SCALE)));
        let price_base = in_range(convert_amount(line.unit_price, exchange_rate, COST_SCALE));
        total_base = price_base
            .and(value_base)
            .and_then(|v| in_range(total_base.checked_add(v)))
            .ok_or(OrderError::LineValueOutOfRange(index))?;
    }
    Ok(())
}

/// Sum of line amounts.
#[must_use]
pub fn order_total(lines: &[OrderLineInput]) -> Decimal {
    lines.iter().map(OrderLineInput::amount).sum()
}

/// Quantity to receive against one purchase order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptLineInput {
    /// Purchase order line.
    pub line_id: Uuid,
    /// Quantity arriving now.
    pub quantity: Decimal,
}

/// Receipt progress of one purchase order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedLine {
    /// Purchase order line.
    pub line_id: Uuid,
    /// Ordered quantity.
    pub ordered: Decimal,
    /// Sum of earlier receipts.
    pub received: Decimal,
}

impl ReceivedLine {
    /// Checks that receiving `quantity` more stays within the order.
    ///
    /// # Errors
    ///
    /// `InvalidLineQuantity` for a non-positive quantity, `OverReceipt` if
    /// the cumulative quantity would exceed the ordered one.
    pub fn check(&self, quantity: Decimal) -> Result<(), OrderError> {
        if quantity <= Decimal::ZERO {
            return Err(OrderError::InvalidLineQuantity { line: 0, quantity });
        }
        if self
            .received
            .checked_add(quantity)
            .is_none_or(|total| total > self.ordered)
        {
            return Err(OrderError::OverReceipt {
                line_id: self.line_id,
                ordered: self.ordered,
                received: self.received,
                requested: quantity,
            });
        }
        Ok(())
    }

    /// Whether the line has been received in full.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.received >= self.ordered
    }
}
