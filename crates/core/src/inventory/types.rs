//! Inventory domain types.

use serde::{Deserialize, Serialize};
use std::fmt;
use tally_shared::types::{CompanyId, DocumentId, ProductId, WarehouseId};
use uuid::Uuid;

/// Identity of one stock row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InventoryKey {
    /// Owning company.
    pub company_id: CompanyId,
    /// Product.
    pub product_id: ProductId,
    /// Warehouse.
    pub warehouse_id: WarehouseId,
}

impl InventoryKey {
    /// Creates a key.
    #[must_use]
    pub const fn new(company_id: CompanyId, product_id: ProductId, warehouse_id: WarehouseId) -> Self {
        Self {
            company_id,
            product_id,
            warehouse_id,
        }
    }
}

/// Kind of stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementType {
    /// Goods in, at a purchase cost.
    Receipt,
    /// Quantity earmarked for an order.
    Reservation,
    /// Earmark released.
    ReservationCancel,
    /// Goods out, at the current average cost.
    Shipment,
    /// Stock count correction.
    Adjustment,
}

impl MovementType {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Receipt => "receipt",
            Self::Reservation => "reservation",
            Self::ReservationCancel => "reservation_cancel",
            Self::Shipment => "shipment",
            Self::Adjustment => "adjustment",
        }
    }

    /// Parses the stored representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "receipt" => Some(Self::Receipt),
            "reservation" => Some(Self::Reservation),
            "reservation_cancel" => Some(Self::ReservationCancel),
            "shipment" => Some(Self::Shipment),
            "adjustment" => Some(Self::Adjustment),
            _ => None,
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The business document behind a movement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementSource {
    /// Source document, if any.
    pub document_id: Option<DocumentId>,
    /// Source document line, if any.
    pub line_id: Option<Uuid>,
}

impl MovementSource {
    /// A movement caused by a document line.
    #[must_use]
    pub const fn line(document_id: DocumentId, line_id: Uuid) -> Self {
        Self {
            document_id: Some(document_id),
            line_id: Some(line_id),
        }
    }

    /// A movement caused by a whole document.
    #[must_use]
    pub const fn document(document_id: DocumentId) -> Self {
        Self {
            document_id: Some(document_id),
            line_id: None,
        }
    }
}
