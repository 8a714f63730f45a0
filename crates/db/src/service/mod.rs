//! Application service facade.
//!
//! `AppService` is what an outer surface (HTTP handlers, CLI, jobs) talks
//! to. Every mutating method opens one transaction, runs one engine
//! operation inside it and commits; on any error the transaction is dropped
//! and nothing is persisted.

mod error;
mod stock;

pub use error::ServiceError;
pub use stock::{StockAdjustment, StockOutcome, StockReceipt};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{DatabaseConnection, DatabaseTransaction};
use tally_core::inventory::{InventoryKey, StockLevel};
use tally_core::ledger::{
    AccountBalance, AccountStatement, CommitOutcome, Proposal, ResolvedEntry, TrialBalance,
};
use tally_core::orders::ReceiptLineInput;
use tally_shared::types::{CompanyId, DocumentId, JournalEntryId, ProductId, WarehouseId};
use tally_shared::{AppConfig, LedgerConfig};

use crate::repositories::{
    BalanceRepository, InventoryRepository, LedgerRepository, NewOrder, PurchaseOrderRepository,
    SalesOrderRepository, TransitionOutcome,
};
use crate::txn;

/// One transaction per call over the bookkeeping engines.
#[derive(Debug, Clone)]
pub struct AppService {
    db: DatabaseConnection,
    ledger: LedgerConfig,
    lock_timeout_ms: Option<u64>,
}

impl AppService {
    /// Creates the service from loaded configuration.
    #[must_use]
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Self {
        Self::with_settings(db, config.ledger.clone(), config.database.lock_timeout_ms)
    }

    /// Creates the service from explicit settings.
    #[must_use]
    pub const fn with_settings(
        db: DatabaseConnection,
        ledger: LedgerConfig,
        lock_timeout_ms: Option<u64>,
    ) -> Self {
        Self {
            db,
            ledger,
            lock_timeout_ms,
        }
    }

    /// The underlying connection, for read-only queries.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }

    async fn begin(&self) -> Result<DatabaseTransaction, ServiceError> {
        Ok(txn::begin(&self.db, self.lock_timeout_ms).await?)
    }

    fn ledger_repository(&self) -> LedgerRepository {
        LedgerRepository::new(self.db.clone(), self.lock_timeout_ms)
    }

    fn balances(&self) -> BalanceRepository {
        BalanceRepository::new(self.db.clone())
    }

    // ------------------------------------------------------------------
    // Ledger
    // ------------------------------------------------------------------

    /// Commits a journal entry proposal.
    ///
    /// # Errors
    ///
    /// Any ledger rejection, `DuplicateSubmission` for a reused key, or a
    /// database error.
    pub async fn commit_entry(&self, proposal: &Proposal) -> Result<CommitOutcome, ServiceError> {
        Ok(self.ledger_repository().commit(proposal).await?)
    }

    /// Checks a proposal exactly as `commit_entry` would, without writing.
    ///
    /// # Errors
    ///
    /// The rejection `commit_entry` would return.
    pub async fn validate_entry(&self, proposal: &Proposal) -> Result<ResolvedEntry, ServiceError> {
        Ok(self.ledger_repository().validate(proposal).await?)
    }

    /// Posts the compensating entry of a committed one.
    ///
    /// The key defaults to `reversal:<entry id>`.
    ///
    /// # Errors
    ///
    /// `EntryNotFound`, `AlreadyReversed`, `DuplicateSubmission` or a
    /// database error.
    pub async fn reverse_entry(
        &self,
        company_id: CompanyId,
        entry_id: JournalEntryId,
        idempotency_key: Option<&str>,
    ) -> Result<CommitOutcome, ServiceError> {
        Ok(self
            .ledger_repository()
            .reverse(company_id, entry_id, idempotency_key)
            .await?)
    }

    /// Trial balance, optionally as of a posting date.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub async fn trial_balance(
        &self,
        company_id: CompanyId,
        as_of: Option<NaiveDate>,
    ) -> Result<TrialBalance, ServiceError> {
        Ok(self.balances().trial_balance(company_id, as_of).await?)
    }

    /// Balance of one account on its normal side.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` or a database error.
    pub async fn account_balance(
        &self,
        company_id: CompanyId,
        account_code: &str,
    ) -> Result<AccountBalance, ServiceError> {
        Ok(self.balances().account_balance(company_id, account_code).await?)
    }

    /// Statement of one account with a running balance.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` or a database error.
    pub async fn account_statement(
        &self,
        company_id: CompanyId,
        account_code: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AccountStatement, ServiceError> {
        Ok(self
            .balances()
            .account_statement(company_id, account_code, from, to)
            .await?)
    }

    // ------------------------------------------------------------------
    // Sales orders
    // ------------------------------------------------------------------

    /// Creates a draft sales order; `party_code` is the customer code.
    ///
    /// # Errors
    ///
    /// See [`SalesOrderRepository::create_draft`].
    pub async fn create_sales_order(&self, order: &NewOrder) -> Result<DocumentId, ServiceError> {
        let txn = self.begin().await?;
        let order_id = SalesOrderRepository::create_draft(&txn, order).await?;
        txn.commit().await?;
        Ok(order_id)
    }

    /// Confirms a draft sales order, reserving its stock.
    ///
    /// # Errors
    ///
    /// See [`SalesOrderRepository::confirm`].
    pub async fn confirm_sales_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome = SalesOrderRepository::confirm(&txn, company_id, order_id).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Ships a confirmed sales order.
    ///
    /// # Errors
    ///
    /// See [`SalesOrderRepository::ship`].
    pub async fn ship_sales_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome =
            SalesOrderRepository::ship(&txn, &self.ledger.accounts, company_id, order_id, date)
                .await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Invoices a shipped sales order.
    ///
    /// # Errors
    ///
    /// See [`SalesOrderRepository::invoice`].
    pub async fn invoice_sales_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome =
            SalesOrderRepository::invoice(&txn, &self.ledger.accounts, company_id, order_id, date)
                .await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Records the customer payment of an invoiced sales order.
    ///
    /// # Errors
    ///
    /// See [`SalesOrderRepository::pay`].
    pub async fn pay_sales_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome =
            SalesOrderRepository::pay(&txn, &self.ledger.accounts, company_id, order_id, date)
                .await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Cancels a draft or confirmed sales order.
    ///
    /// # Errors
    ///
    /// See [`SalesOrderRepository::cancel`].
    pub async fn cancel_sales_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome = SalesOrderRepository::cancel(&txn, company_id, order_id).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Purchase orders
    // ------------------------------------------------------------------

    /// Creates a draft purchase order; `party_code` is the vendor code.
    ///
    /// # Errors
    ///
    /// See [`PurchaseOrderRepository::create_draft`].
    pub async fn create_purchase_order(&self, order: &NewOrder) -> Result<DocumentId, ServiceError> {
        let txn = self.begin().await?;
        let order_id = PurchaseOrderRepository::create_draft(&txn, order).await?;
        txn.commit().await?;
        Ok(order_id)
    }

    /// Approves a draft purchase order.
    ///
    /// # Errors
    ///
    /// See [`PurchaseOrderRepository::approve`].
    pub async fn approve_purchase_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome = PurchaseOrderRepository::approve(&txn, company_id, order_id).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Records a (possibly partial) goods receipt.
    ///
    /// # Errors
    ///
    /// See [`PurchaseOrderRepository::receive`].
    pub async fn receive_purchase_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
        receipt: &[ReceiptLineInput],
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome = PurchaseOrderRepository::receive(
            &txn,
            &self.ledger.accounts,
            company_id,
            order_id,
            receipt,
            date,
        )
        .await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Books the vendor bill of a fully received purchase order.
    ///
    /// # Errors
    ///
    /// See [`PurchaseOrderRepository::invoice`].
    pub async fn invoice_purchase_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
        invoice_amount: Option<Decimal>,
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome = PurchaseOrderRepository::invoice(
            &txn,
            &self.ledger,
            company_id,
            order_id,
            invoice_amount,
            date,
        )
        .await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Records the payment of an invoiced purchase order.
    ///
    /// # Errors
    ///
    /// See [`PurchaseOrderRepository::pay`].
    pub async fn pay_purchase_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome =
            PurchaseOrderRepository::pay(&txn, &self.ledger.accounts, company_id, order_id, date)
                .await?;
        txn.commit().await?;
        Ok(outcome)
    }

    /// Cancels a purchase order nothing has been received against.
    ///
    /// # Errors
    ///
    /// See [`PurchaseOrderRepository::cancel`].
    pub async fn cancel_purchase_order(
        &self,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<TransitionOutcome, ServiceError> {
        let txn = self.begin().await?;
        let outcome = PurchaseOrderRepository::cancel(&txn, company_id, order_id).await?;
        txn.commit().await?;
        Ok(outcome)
    }

    // ------------------------------------------------------------------
    // Stock
    // ------------------------------------------------------------------

    /// Current stock level of one item, `None` if it was never received.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub async fn stock_level(
        &self,
        company_id: CompanyId,
        product_id: ProductId,
        warehouse_id: WarehouseId,
    ) -> Result<Option<StockLevel>, ServiceError> {
        let key = InventoryKey::new(company_id, product_id, warehouse_id);
        Ok(InventoryRepository::level(&self.db, &key).await?)
    }
}
