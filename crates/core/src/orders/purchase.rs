//! Purchase order state machine.
//!
//! The valid transitions are:
//! - Draft → Approved (approve: number assigned)
//! - Approved → Approved (partial goods receipt)
//! - Approved → Received (goods receipt completing every line)
//! - Received → Invoiced (vendor bill posted)
//! - Invoiced → Paid (vendor payment posted)
//! - Draft | Approved → Cancelled, only while nothing has been received

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::error::OrderError;
use super::types::OrderKind;

/// Purchase order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseOrderStatus {
    /// Editable, unnumbered.
    Draft,
    /// Numbered, open for receipts.
    Approved,
    /// Every line received in full.
    Received,
    /// Vendor bill posted.
    Invoiced,
    /// Vendor paid.
    Paid,
    /// Abandoned before any receipt.
    Cancelled,
}

impl PurchaseOrderStatus {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Approved => "APPROVED",
            Self::Received => "RECEIVED",
            Self::Invoiced => "INVOICED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "APPROVED" => Some(Self::Approved),
            "RECEIVED" => Some(Self::Received),
            "INVOICED" => Some(Self::Invoiced),
            "PAID" => Some(Self::Paid),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }

    /// Parses a stored status, failing on unknown values.
    ///
    /// # Errors
    ///
    /// Returns `UnknownStatus` for a value no purchase order can have.
    pub fn from_stored(s: &str) -> Result<Self, OrderError> {
        Self::parse(s).ok_or_else(|| OrderError::UnknownStatus {
            kind: OrderKind::Purchase,
            status: s.to_string(),
        })
    }
}

impl fmt::Display for PurchaseOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stateless service validating purchase order transitions.
pub struct PurchaseWorkflow;

impl PurchaseWorkflow {
    fn invalid(current: PurchaseOrderStatus, action: &'static str) -> OrderError {
        OrderError::InvalidTransition {
            kind: OrderKind::Purchase,
            from: current.as_str(),
            action,
        }
    }

    /// Draft → Approved.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn approve(current: PurchaseOrderStatus) -> Result<PurchaseOrderStatus, OrderError> {
        match current {
            PurchaseOrderStatus::Draft => Ok(PurchaseOrderStatus::Approved),
            _ => Err(Self::invalid(current, "approve")),
        }
    }

    /// Approved → Approved | Received, depending on `complete`.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` unless the order is approved.
    pub fn receive(
        current: PurchaseOrderStatus,
        complete: bool,
    ) -> Result<PurchaseOrderStatus, OrderError> {
        match current {
            PurchaseOrderStatus::Approved if complete => Ok(PurchaseOrderStatus::Received),
            PurchaseOrderStatus::Approved => Ok(PurchaseOrderStatus::Approved),
            _ => Err(Self::invalid(current, "receive")),
        }
    }

    /// Received → Invoiced.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn invoice(current: PurchaseOrderStatus) -> Result<PurchaseOrderStatus, OrderError> {
        match current {
            PurchaseOrderStatus::Received => Ok(PurchaseOrderStatus::Invoiced),
            _ => Err(Self::invalid(current, "invoice")),
        }
    }

    /// Invoiced → Paid.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn pay(current: PurchaseOrderStatus) -> Result<PurchaseOrderStatus, OrderError> {
        match current {
            PurchaseOrderStatus::Invoiced => Ok(PurchaseOrderStatus::Paid),
            _ => Err(Self::invalid(current, "pay")),
        }
    }

    /// Draft | Approved → Cancelled.
    ///
    /// # Errors
    ///
    /// `HasReceipts` if any goods arrived, `InvalidTransition` from later statuses.
    pub fn cancel(
        current: PurchaseOrderStatus,
        order_id: Uuid,
        anything_received: bool,
    ) -> Result<PurchaseOrderStatus, OrderError> {
        match current {
            PurchaseOrderStatus::Draft | PurchaseOrderStatus::Approved if anything_received => {
                Err(OrderError::HasReceipts(order_id))
            }
            PurchaseOrderStatus::Draft | PurchaseOrderStatus::Approved => {
                Ok(PurchaseOrderStatus::Cancelled)
            }
            _ => Err(Self::invalid(current, "cancel")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_with_partial_receipt() {
        let status = PurchaseWorkflow::approve(PurchaseOrderStatus::Draft).unwrap();
        let status = PurchaseWorkflow::receive(status, false).unwrap();
        assert_eq!(status, PurchaseOrderStatus::Approved);
        let status = PurchaseWorkflow::receive(status, true).unwrap();
        assert_eq!(status, PurchaseOrderStatus::Received);
        let status = PurchaseWorkflow::invoice(status).unwrap();
        let status = PurchaseWorkflow::pay(status).unwrap();
        assert_eq!(status, PurchaseOrderStatus::Paid);
    }

    #[test]
    fn test_cannot_receive_after_complete() {
        assert!(matches!(
            PurchaseWorkflow::receive(PurchaseOrderStatus::Received, false),
            Err(OrderError::InvalidTransition { from: "RECEIVED", action: "receive", .. })
        ));
        assert!(PurchaseWorkflow::receive(PurchaseOrderStatus::Draft, true).is_err());
    }

    #[test]
    fn test_cancel_rules() {
        let id = Uuid::nil();
        assert_eq!(
            PurchaseWorkflow::cancel(PurchaseOrderStatus::Draft, id, false).unwrap(),
            PurchaseOrderStatus::Cancelled
        );
        assert!(matches!(
            PurchaseWorkflow::cancel(PurchaseOrderStatus::Approved, id, true),
            Err(OrderError::HasReceipts(_))
        ));
        assert!(matches!(
            PurchaseWorkflow::cancel(PurchaseOrderStatus::Received, id, true),
            Err(OrderError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_invoice_requires_full_receipt() {
        assert!(PurchaseWorkflow::invoice(PurchaseOrderStatus::Approved).is_err());
        assert!(PurchaseWorkflow::pay(PurchaseOrderStatus::Received).is_err());
    }
}
