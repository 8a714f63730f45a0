//! Inventory repository.
//!
//! The only writer of `inventory_items` and `inventory_movements`. Every
//! mutation locks its row with `SELECT ... FOR UPDATE`, computes the new
//! level from the locked values only, writes the row and appends a movement.

use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect,
};
use tally_core::inventory::{InventoryError, InventoryKey, MovementSource, StockChange, StockLevel};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{inventory_items, inventory_movements, products, warehouses};

fn db_err(err: DbErr) -> InventoryError {
    InventoryError::Database(err.to_string())
}

fn positive(qty: Decimal) -> Result<Decimal, InventoryError> {
    if qty > Decimal::ZERO {
        Ok(qty)
    } else {
        Err(InventoryError::InvalidQuantity(qty))
    }
}

/// Stateless stock engine over a caller-owned transaction.
///
/// Every operation returns `Ok(None)` for service products, which carry no
/// stock.
pub struct InventoryRepository;

impl InventoryRepository {
    /// Goods in at `unit_cost` (base currency), creating the row if needed.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity`, `NegativeCost`, `ProductNotFound`,
    /// `WarehouseNotFound` or a database error.
    pub async fn receive(
        txn: &DatabaseTransaction,
        key: InventoryKey,
        qty: Decimal,
        unit_cost: Decimal,
        source: MovementSource,
    ) -> Result<Option<StockChange>, InventoryError> {
        positive(qty)?;
        if unit_cost < Decimal::ZERO {
            return Err(InventoryError::NegativeCost(unit_cost));
        }
        if !Self::is_stock_item(txn, &key).await? {
            return Ok(None);
        }

        warehouses::Entity::find_by_id(key.warehouse_id.into_inner())
            .filter(warehouses::Column::CompanyId.eq(key.company_id.into_inner()))
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or(InventoryError::WarehouseNotFound(key.warehouse_id))?;

        let empty = inventory_items::ActiveModel {
            company_id: Set(key.company_id.into_inner()),
            product_id: Set(key.product_id.into_inner()),
            warehouse_id: Set(key.warehouse_id.into_inner()),
            qty_on_hand: Set(Decimal::ZERO),
            qty_reserved: Set(Decimal::ZERO),
            unit_cost: Set(Decimal::ZERO),
            updated_at: Set(Utc::now().into()),
        };
        inventory_items::Entity::insert(empty)
            .on_conflict(
                OnConflict::columns([
                    inventory_items::Column::CompanyId,
                    inventory_items::Column::ProductId,
                    inventory_items::Column::WarehouseId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(txn)
            .await
            .map_err(db_err)?;

        Self::apply(txn, &key, source, |level| level.receive(qty, unit_cost)).await
    }

    /// Earmarks available stock for an order.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity`, `UnknownItem`, `InsufficientStock` or a database error.
    pub async fn reserve(
        txn: &DatabaseTransaction,
        key: InventoryKey,
        qty: Decimal,
        source: MovementSource,
    ) -> Result<Option<StockChange>, InventoryError> {
        positive(qty)?;
        if !Self::is_stock_item(txn, &key).await? {
            return Ok(None);
        }
        Self::apply(txn, &key, source, |level| level.reserve(qty)).await
    }

    /// Releases a reservation.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity`, `UnknownItem`, `ReservationUnderflow` or a database error.
    pub async fn cancel_reservation(
        txn: &DatabaseTransaction,
        key: InventoryKey,
        qty: Decimal,
        source: MovementSource,
    ) -> Result<Option<StockChange>, InventoryError> {
        positive(qty)?;
        if !Self::is_stock_item(txn, &key).await? {
            return Ok(None);
        }
        Self::apply(txn, &key, source, |level| level.cancel_reservation(qty)).await
    }

    /// Goods out at the current average cost. The change's `value` is the
    /// cost of goods sold.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity`, `UnknownItem`, `InsufficientStock` or a database
    /// error. Nothing is written when stock is insufficient.
    pub async fn ship_or_consume(
        txn: &DatabaseTransaction,
        key: InventoryKey,
        qty: Decimal,
        from_reservation: bool,
        source: MovementSource,
    ) -> Result<Option<StockChange>, InventoryError> {
        positive(qty)?;
        if !Self::is_stock_item(txn, &key).await? {
            return Ok(None);
        }
        Self::apply(txn, &key, source, |level| level.ship(qty, from_reservation)).await
    }

    /// Stock count correction at the current average cost.
    ///
    /// # Errors
    ///
    /// `InvalidQuantity` for zero, `UnknownItem`, `InsufficientStock`,
    /// `AdjustmentBelowReserved` or a database error.
    pub async fn adjust(
        txn: &DatabaseTransaction,
        key: InventoryKey,
        signed_qty: Decimal,
        source: MovementSource,
    ) -> Result<Option<StockChange>, InventoryError> {
        if signed_qty.is_zero() {
            return Err(InventoryError::InvalidQuantity(signed_qty));
        }
        if !Self::is_stock_item(txn, &key).await? {
            return Ok(None);
        }
        Self::apply(txn, &key, source, |level| level.adjust(signed_qty)).await
    }

    /// Current level without locking.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub async fn level<C>(db: &C, key: &InventoryKey) -> Result<Option<StockLevel>, InventoryError>
    where
        C: sea_orm::ConnectionTrait,
    {
        let row = inventory_items::Entity::find()
            .filter(inventory_items::Column::CompanyId.eq(key.company_id.into_inner()))
            .filter(inventory_items::Column::ProductId.eq(key.product_id.into_inner()))
            .filter(inventory_items::Column::WarehouseId.eq(key.warehouse_id.into_inner()))
            .one(db)
            .await
            .map_err(db_err)?;
        Ok(row.map(|r| StockLevel::new(r.qty_on_hand, r.qty_reserved, r.unit_cost)))
    }

    /// Whether the product carries stock; fails if it is not in the company.
    async fn is_stock_item(
        txn: &DatabaseTransaction,
        key: &InventoryKey,
    ) -> Result<bool, InventoryError> {
        let product = products::Entity::find_by_id(key.product_id.into_inner())
            .filter(products::Column::CompanyId.eq(key.company_id.into_inner()))
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or(InventoryError::ProductNotFound(key.product_id))?;
        Ok(product.is_stock_item)
    }

    /// Locks the row, runs `op` on its level, then persists the result.
    async fn apply<F>(
        txn: &DatabaseTransaction,
        key: &InventoryKey,
        source: MovementSource,
        op: F,
    ) -> Result<Option<StockChange>, InventoryError>
    where
        F: FnOnce(&StockLevel) -> Result<StockChange, InventoryError>,
    {
        let row = inventory_items::Entity::find()
            .filter(inventory_items::Column::CompanyId.eq(key.company_id.into_inner()))
            .filter(inventory_items::Column::ProductId.eq(key.product_id.into_inner()))
            .filter(inventory_items::Column::WarehouseId.eq(key.warehouse_id.into_inner()))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or(InventoryError::UnknownItem {
                product_id: key.product_id,
                warehouse_id: key.warehouse_id,
            })?;
        debug!(
            product_id = %key.product_id,
            warehouse_id = %key.warehouse_id,
            "inventory row locked"
        );

        let current = StockLevel::new(row.qty_on_hand, row.qty_reserved, row.unit_cost);
        let change = op(&current)?;

        let now = Utc::now();
        let mut active: inventory_items::ActiveModel = row.into();
        active.qty_on_hand = Set(change.level.qty_on_hand);
        active.qty_reserved = Set(change.level.qty_reserved);
        active.unit_cost = Set(change.level.unit_cost);
        active.updated_at = Set(now.into());
        active.update(txn).await.map_err(db_err)?;

        inventory_movements::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(key.company_id.into_inner()),
            product_id: Set(key.product_id.into_inner()),
            warehouse_id: Set(key.warehouse_id.into_inner()),
            movement_type: Set(change.movement_type.as_str().to_string()),
            quantity: Set(change.quantity),
            unit_cost: Set(change.unit_cost),
            value: Set(change.value),
            source_document_id: Set(source.document_id.map(Into::into)),
            source_line_id: Set(source.line_id),
            created_at: Set(now.into()),
        }
        .insert(txn)
        .await
        .map_err(db_err)?;

        debug!(
            product_id = %key.product_id,
            warehouse_id = %key.warehouse_id,
            movement = change.movement_type.as_str(),
            quantity = %change.quantity,
            on_hand = %change.level.qty_on_hand,
            reserved = %change.level.qty_reserved,
            unit_cost = %change.level.unit_cost,
            "stock movement recorded"
        );

        Ok(Some(change))
    }
}
