//! Sales order state machine.
//!
//! The valid transitions are:
//! - Draft → Confirmed (confirm: number assigned, stock reserved)
//! - Confirmed → Shipped (ship: reservations consumed, COGS posted)
//! - Shipped → Invoiced (invoice: receivable and revenue posted)
//! - Invoiced → Paid (pay: receipt posted)
//! - Draft | Confirmed → Cancelled (cancel: reservations released)

use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::OrderError;
use super::types::OrderKind;

/// Sales order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SalesOrderStatus {
    /// Editable, unnumbered.
    Draft,
    /// Numbered, stock reserved.
    Confirmed,
    /// Goods delivered.
    Shipped,
    /// Customer invoiced.
    Invoiced,
    /// Customer paid.
    Paid,
    /// Abandoned before shipping.
    Cancelled,
}

impl SalesOrderStatus {
    /// Returns the stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "DRAFT",
            Self::Confirmed => "CONFIRMED",
            Self::Shipped => "SHIPPED",
            Self::Invoiced => "INVOICED",
            Self::Paid => "PAID",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status from a string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "DRAFT" => Some(Self::Draft),
            "CONFIRMED" => Some(Self::Confirmed),
            "SHIPPED" => Some(Self::Shipped),
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
    /// Returns `UnknownStatus` for a value no sales order can have.
    pub fn from_stored(s: &str) -> Result<Self, OrderError> {
        Self::parse(s).ok_or_else(|| OrderError::UnknownStatus {
            kind: OrderKind::Sales,
            status: s.to_string(),
        })
    }

    /// Returns true if the order holds reservations.
    #[must_use]
    pub const fn holds_reservations(&self) -> bool {
        matches!(self, Self::Confirmed)
    }
}

impl fmt::Display for SalesOrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Stateless service validating sales order transitions.
pub struct SalesWorkflow;

impl SalesWorkflow {
    fn step(
        current: SalesOrderStatus,
        allowed: &[SalesOrderStatus],
        action: &'static str,
        next: SalesOrderStatus,
    ) -> Result<SalesOrderStatus, OrderError> {
        if allowed.contains(&current) {
            Ok(next)
        } else {
            Err(OrderError::InvalidTransition {
                kind: OrderKind::Sales,
                from: current.as_str(),
                action,
            })
        }
    }

    /// Draft → Confirmed.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn confirm(current: SalesOrderStatus) -> Result<SalesOrderStatus, OrderError> {
        Self::step(current, &[SalesOrderStatus::Draft], "confirm", SalesOrderStatus::Confirmed)
    }

    /// Confirmed → Shipped.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn ship(current: SalesOrderStatus) -> Result<SalesOrderStatus, OrderError> {
        Self::step(current, &[SalesOrderStatus::Confirmed], "ship", SalesOrderStatus::Shipped)
    }

    /// Shipped → Invoiced.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn invoice(current: SalesOrderStatus) -> Result<SalesOrderStatus, OrderError> {
        Self::step(current, &[SalesOrderStatus::Shipped], "invoice", SalesOrderStatus::Invoiced)
    }

    /// Invoiced → Paid.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` from any other status.
    pub fn pay(current: SalesOrderStatus) -> Result<SalesOrderStatus, OrderError> {
        Self::step(current, &[SalesOrderStatus::Invoiced], "pay", SalesOrderStatus::Paid)
    }

    /// Draft | Confirmed → Cancelled.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` once goods have shipped.
    pub fn cancel(current: SalesOrderStatus) -> Result<SalesOrderStatus, OrderError> {
        Self::step(
            current,
            &[SalesOrderStatus::Draft, SalesOrderStatus::Confirmed],
            "cancel",
            SalesOrderStatus::Cancelled,
        )
    }
}
