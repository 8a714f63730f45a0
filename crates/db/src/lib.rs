//! Database layer for Tally with `SeaORM` entities and transactional engines.
//!
//! This crate provides:
//! - `SeaORM` entity definitions and the schema migration
//! - The ledger, numbering, inventory and order engines, each operating on a
//!   caller-owned `DatabaseTransaction`
//! - Read-only balance queries
//! - Demo master data for the seeder and the integration tests
//! - `AppService`, the facade that opens one transaction per call

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod seed;
pub mod service;
pub mod txn;

pub use repositories::{
    BalanceRepository, InventoryRepository, LedgerRepository, NewOrder, NumberingRepository,
    PurchaseOrderRepository, SalesOrderRepository, TransitionOutcome,
};
pub use service::{AppService, ServiceError, StockAdjustment, StockOutcome, StockReceipt};

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tally_shared::DatabaseConfig;

/// Establishes a pooled connection to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(config.url.clone());
    options
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .sqlx_logging(false);

    Database::connect(options).await
}
