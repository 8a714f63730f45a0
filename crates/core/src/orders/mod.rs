//! Sales and purchase order lifecycles.
//!
//! The state machines here only decide whether a transition is legal and
//! what it produces (next status, posting proposals, warnings). Running a
//! transition against the store is `tally-db`'s job.

pub mod error;
pub mod posting;
pub mod purchase;
pub mod sales;
pub mod types;

pub use error::OrderError;
pub use posting::{
    BillAmounts, InvoiceDeviation, OrderCurrency, OrderPostings, check_invoice_deviation,
};
pub use purchase::{PurchaseOrderStatus, PurchaseWorkflow};
pub use sales::{SalesOrderStatus, SalesWorkflow};
pub use types::{
    OrderKind, OrderLineInput, ReceiptLineInput, ReceivedLine, order_total, validate_lines,
};
