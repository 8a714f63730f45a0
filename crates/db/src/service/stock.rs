//! Stock movements outside the order lifecycles: opening stock, direct
//! receipts and count corrections. Each one moves stock and posts its value
//! in the same transaction.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tally_core::inventory::{InventoryKey, MovementSource, StockChange, StockPostings};
use tally_core::ledger::CommitOutcome;
use tally_shared::types::{CompanyId, ProductId, WarehouseId};
use tracing::info;

use super::{AppService, ServiceError};
use crate::repositories::orders::{load_company, posting_date};
use crate::repositories::{InventoryRepository, LedgerRepository};

/// Goods in without a purchase order.
#[derive(Debug, Clone)]
pub struct StockReceipt {
    /// Product received.
    pub product_id: ProductId,
    /// Receiving warehouse.
    pub warehouse_id: WarehouseId,
    /// Positive quantity.
    pub quantity: Decimal,
    /// Unit cost in base currency.
    pub unit_cost: Decimal,
    /// Account credited for the stock value (equity, payable, clearing...).
    pub offset_account: String,
    /// Key of the posting; a retry with the same key is rejected as a duplicate.
    pub idempotency_key: String,
    /// Posting date, today (UTC) if absent.
    pub date: Option<NaiveDate>,
    /// Free text.
    pub narration: String,
}

/// Stock count correction.
#[derive(Debug, Clone)]
pub struct StockAdjustment {
    /// Product counted.
    pub product_id: ProductId,
    /// Warehouse counted.
    pub warehouse_id: WarehouseId,
    /// Positive for a gain, negative for a loss.
    pub quantity: Decimal,
    /// Account taking the other side of the inventory posting.
    pub offset_account: String,
    /// Key of the posting.
    pub idempotency_key: String,
    /// Posting date, today (UTC) if absent.
    pub date: Option<NaiveDate>,
    /// Free text.
    pub narration: String,
}

/// What a direct stock movement did.
#[derive(Debug, Clone)]
pub struct StockOutcome {
    /// Stock change; `None` for a service product.
    pub change: Option<StockChange>,
    /// Ledger posting; `None` when the movement carried no value.
    pub posting: Option<CommitOutcome>,
}

impl AppService {
    /// Receives stock at a given cost and posts DR inventory / CR the offset
    /// account.
    ///
    /// # Errors
    ///
    /// Stock errors, ledger errors (including `DuplicateSubmission`) or a
    /// database error. The stock change is rolled back with the posting.
    pub async fn receive_stock(
        &self,
        company_id: CompanyId,
        receipt: &StockReceipt,
    ) -> Result<StockOutcome, ServiceError> {
        let txn = self.begin().await?;
        let company = load_company(&txn, company_id).await?;
        let key = InventoryKey::new(company_id, receipt.product_id, receipt.warehouse_id);

        let change = InventoryRepository::receive(
            &txn,
            key,
            receipt.quantity,
            receipt.unit_cost,
            MovementSource::default(),
        )
        .await?;

        let postings = StockPostings {
            inventory_account: &self.ledger.accounts.inventory,
            company_code: &company.code,
            base_currency: &company.base_currency,
        };
        let value = change.as_ref().map_or(Decimal::ZERO, |c| c.value);
        let posting = match postings.receipt(
            &receipt.idempotency_key,
            &receipt.offset_account,
            value,
            posting_date(receipt.date),
            &receipt.narration,
        ) {
            Some(proposal) => Some(LedgerRepository::commit_in_txn(&txn, &proposal).await?),
            None => None,
        };

        txn.commit().await?;
        info!(
            company = %company.code,
            product_id = %receipt.product_id,
            quantity = %receipt.quantity,
            value = %value,
            "stock received"
        );
        Ok(StockOutcome { change, posting })
    }

    /// Applies a count correction at the current average cost and posts its
    /// value against the offset account.
    ///
    /// # Errors
    ///
    /// `UnknownItem`, `InsufficientStock`, `AdjustmentBelowReserved`, ledger
    /// errors or a database error.
    pub async fn adjust_stock(
        &self,
        company_id: CompanyId,
        adjustment: &StockAdjustment,
    ) -> Result<StockOutcome, ServiceError> {
        let txn = self.begin().await?;
        let company = load_company(&txn, company_id).await?;
        let key = InventoryKey::new(company_id, adjustment.product_id, adjustment.warehouse_id);

        let change = InventoryRepository::adjust(
            &txn,
            key,
            adjustment.quantity,
            MovementSource::default(),
        )
        .await?;

        let postings = StockPostings {
            inventory_account: &self.ledger.accounts.inventory,
            company_code: &company.code,
            base_currency: &company.base_currency,
        };
        let signed_value = change.as_ref().map_or(Decimal::ZERO, |c| c.value);
        let posting = match postings.adjustment(
            &adjustment.idempotency_key,
            &adjustment.offset_account,
            signed_value,
            posting_date(adjustment.date),
            &adjustment.narration,
        ) {
            Some(proposal) => Some(LedgerRepository::commit_in_txn(&txn, &proposal).await?),
            None => None,
        };

        txn.commit().await?;
        info!(
            company = %company.code,
            product_id = %adjustment.product_id,
            quantity = %adjustment.quantity,
            value = %signed_value,
            "stock adjusted"
        );
        Ok(StockOutcome { change, posting })
    }
}
