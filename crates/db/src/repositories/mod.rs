//! Repository layer.
//!
//! Each engine is the only writer of its tables and works on a caller-owned
//! `DatabaseTransaction`, so one business operation can span several engines
//! and still commit or roll back as a whole.

pub mod balance;
pub mod inventory;
pub mod ledger;
pub mod numbering;
pub mod orders;
pub mod purchase_order;
pub mod sales_order;

pub use balance::BalanceRepository;
pub use inventory::InventoryRepository;
pub use ledger::{LedgerRepository, POSTED_STATUS};
pub use numbering::NumberingRepository;
pub use orders::{NewOrder, TransitionOutcome};
pub use purchase_order::PurchaseOrderRepository;
pub use sales_order::SalesOrderRepository;
