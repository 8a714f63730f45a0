//! Stock arithmetic on a single locked inventory row.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::InventoryError;
use super::types::MovementType;
use crate::currency::{round_cost, round_ledger};

/// Quantities and cost of one inventory row.
///
/// Invariants: `qty_on_hand >= 0`, `0 <= qty_reserved <= qty_on_hand`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockLevel {
    /// Physical quantity.
    pub qty_on_hand: Decimal,
    /// Quantity earmarked for confirmed orders.
    pub qty_reserved: Decimal,
    /// Weighted-average unit cost in base currency, 6 dp.
    pub unit_cost: Decimal,
}

/// The outcome of one stock mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockChange {
    /// Row state to write back.
    pub level: StockLevel,
    /// Movement kind to append.
    pub movement_type: MovementType,
    /// Signed movement quantity.
    pub quantity: Decimal,
    /// Unit cost recorded on the movement.
    pub unit_cost: Decimal,
    /// Signed valuation delta in base currency, 4 dp. Zero for reservations.
    pub value: Decimal,
}

fn positive(qty: Decimal) -> Result<Decimal, InventoryError> {
    if qty > Decimal::ZERO {
        Ok(qty)
    } else {
        Err(InventoryError::InvalidQuantity(qty))
    }
}

impl StockLevel {
    /// Creates a level.
    #[must_use]
    pub const fn new(qty_on_hand: Decimal, qty_reserved: Decimal, unit_cost: Decimal) -> Self {
        Self {
            qty_on_hand,
            qty_reserved,
            unit_cost,
        }
    }

    /// On hand minus reserved.
    #[must_use]
    pub fn available(&self) -> Decimal {
        self.qty_on_hand - self.qty_reserved
    }

    /// Goods in at `unit_cost`.
    ///
    /// New average = (on_hand x average + qty x cost) / (on_hand + qty),
    /// rounded to 6 dp.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for a non-positive quantity, `NegativeCost` for a
    /// negative cost.
    pub fn receive(&self, qty: Decimal, unit_cost: Decimal) -> Result<StockChange, InventoryError> {
        let qty = positive(qty)?;
        if unit_cost < Decimal::ZERO {
            return Err(InventoryError::NegativeCost(unit_cost));
        }

        let new_on_hand = self.qty_on_hand + qty;
        let average = round_cost(
            (self.qty_on_hand * self.unit_cost + qty * unit_cost) / new_on_hand,
        );

        Ok(StockChange {
            level: Self::new(new_on_hand, self.qty_reserved, average),
            movement_type: MovementType::Receipt,
            quantity: qty,
            unit_cost,
            value: round_ledger(qty * unit_cost),
        })
    }

    /// Earmarks `qty` of the available stock.
    ///
    /// # Errors
    ///
    /// `InsufficientStock` if `qty` exceeds what is available.
    pub fn reserve(&self, qty: Decimal) -> Result<StockChange, InventoryError> {
        let qty = positive(qty)?;
        if qty > self.available() {
            return Err(InventoryError::InsufficientStock {
                requested: qty,
                available: self.available(),
            });
        }

        Ok(StockChange {
            level: Self::new(self.qty_on_hand, self.qty_reserved + qty, self.unit_cost),
            movement_type: MovementType::Reservation,
            quantity: qty,
            unit_cost: self.unit_cost,
            value: Decimal::ZERO,
        })
    }

    /// Releases `qty` of reserved stock.
    ///
    /// # Errors
    ///
    /// `ReservationUnderflow` if less than `qty` is reserved.
    pub fn cancel_reservation(&self, qty: Decimal) -> Result<StockChange, InventoryError> {
        let qty = positive(qty)?;
        if qty > self.qty_reserved {
            return Err(InventoryError::ReservationUnderflow {
                requested: qty,
                reserved: self.qty_reserved,
            });
        }

        Ok(StockChange {
            level: Self::new(self.qty_on_hand, self.qty_reserved - qty, self.unit_cost),
            movement_type: MovementType::ReservationCancel,
            quantity: -qty,
            unit_cost: self.unit_cost,
            value: Decimal::ZERO,
        })
    }

    /// Goods out at the current average cost.
    ///
    /// With `from_reservation` the quantity is consumed from the reservation
    /// the caller made earlier; otherwise it must fit in unreserved stock.
    /// The returned `value` is the cost of goods sold, positive.
    ///
    /// # Errors
    ///
    /// `InsufficientStock` if the quantity is not covered.
    pub fn ship(&self, qty: Decimal, from_reservation: bool) -> Result<StockChange, InventoryError> {
        let qty = positive(qty)?;

        let (covered, new_reserved) = if from_reservation {
            (self.qty_reserved.min(self.qty_on_hand), self.qty_reserved - qty)
        } else {
            (self.available(), self.qty_reserved)
        };
        if qty > covered {
            return Err(InventoryError::InsufficientStock {
                requested: qty,
                available: covered,
            });
        }

        Ok(StockChange {
            level: Self::new(self.qty_on_hand - qty, new_reserved, self.unit_cost),
            movement_type: MovementType::Shipment,
            quantity: -qty,
            unit_cost: self.unit_cost,
            value: round_ledger(qty * self.unit_cost),
        })
    }

    /// Stock count correction at the current average cost.
    ///
    /// The returned `value` carries the sign of `signed_qty`.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for zero, `InsufficientStock` if on hand would go
    /// negative, `AdjustmentBelowReserved` if it would drop below reserved.
    pub fn adjust(&self, signed_qty: Decimal) -> Result<StockChange, InventoryError> {
        if signed_qty.is_zero() {
            return Err(InventoryError::InvalidQuantity(signed_qty));
        }

        let new_on_hand = self.qty_on_hand + signed_qty;
        if new_on_hand < Decimal::ZERO {
            return Err(InventoryError::InsufficientStock {
                requested: -signed_qty,
                available: self.qty_on_hand,
            });
        }
        if new_on_hand < self.qty_reserved {
            return Err(InventoryError::AdjustmentBelowReserved {
                on_hand: new_on_hand,
                reserved: self.qty_reserved,
            });
        }

        Ok(StockChange {
            level: Self::new(new_on_hand, self.qty_reserved, self.unit_cost),
            movement_type: MovementType::Adjustment,
            quantity: signed_qty,
            unit_cost: self.unit_cost,
            value: round_ledger(signed_qty * self.unit_cost),
        })
    }
}
