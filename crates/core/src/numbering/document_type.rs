//! Closed set of numbered business documents.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A business document type and its numbering policy.
///
/// | Type | Prefix | Yearly reset | Branch scoped | Ledger postable |
/// |------|--------|--------------|---------------|-----------------|
/// | JournalEntry | JE | yes | no | yes |
/// | SalesOrder | SO | yes | yes | no |
/// | PurchaseOrder | PO | yes | yes | no |
/// | GoodsReceipt | GRN | yes | yes | yes |
/// | DeliveryNote | DN | yes | yes | yes |
/// | SalesInvoice | INV | yes | no | yes |
/// | PurchaseInvoice | BILL | yes | no | yes |
/// | CustomerReceipt | RCPT | yes | no | yes |
/// | VendorPayment | PAY | yes | no | yes |
/// | StockAdjustment | ADJ | no | no | yes |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Manual journal entry.
    JournalEntry,
    /// Sales order.
    SalesOrder,
    /// Purchase order.
    PurchaseOrder,
    /// Goods receipt note against a purchase order.
    GoodsReceipt,
    /// Delivery note for a shipped sales order.
    DeliveryNote,
    /// Customer invoice.
    SalesInvoice,
    /// Vendor bill.
    PurchaseInvoice,
    /// Payment received from a customer.
    CustomerReceipt,
    /// Payment made to a vendor.
    VendorPayment,
    /// Stock count correction.
    StockAdjustment,
}

impl DocumentType {
    /// Every document type, in declaration order.
    pub const ALL: [Self; 10] = [
        Self::JournalEntry,
        Self::SalesOrder,
        Self::PurchaseOrder,
        Self::GoodsReceipt,
        Self::DeliveryNote,
        Self::SalesInvoice,
        Self::PurchaseInvoice,
        Self::CustomerReceipt,
        Self::VendorPayment,
        Self::StockAdjustment,
    ];

    /// Returns the number prefix, which doubles as the stored type code.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::JournalEntry => "JE",
            Self::SalesOrder => "SO",
            Self::PurchaseOrder => "PO",
            Self::GoodsReceipt => "GRN",
            Self::DeliveryNote => "DN",
            Self::SalesInvoice => "INV",
            Self::PurchaseInvoice => "BILL",
            Self::CustomerReceipt => "RCPT",
            Self::VendorPayment => "PAY",
            Self::StockAdjustment => "ADJ",
        }
    }

    /// Parses a type code (`JE`, `so`, ...), case-insensitively.
    pub fn parse(code: &str) -> Option<Self> {
        let code = code.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.prefix().eq_ignore_ascii_case(code))
    }

    /// Returns true if the counter restarts every fiscal year.
    #[must_use]
    pub const fn resets_yearly(self) -> bool {
        !matches!(self, Self::StockAdjustment)
    }

    /// Returns true if each branch keeps its own counter.
    #[must_use]
    pub const fn is_branch_scoped(self) -> bool {
        matches!(
            self,
            Self::SalesOrder | Self::PurchaseOrder | Self::GoodsReceipt | Self::DeliveryNote
        )
    }

    /// Returns true if a journal entry may be committed under this type.
    ///
    /// Orders are commitments, not postings.
    #[must_use]
    pub const fn is_ledger_postable(self) -> bool {
        !matches!(self, Self::SalesOrder | Self::PurchaseOrder)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}
