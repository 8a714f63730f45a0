//! Sales order engine.
//!
//! DRAFT → CONFIRMED → SHIPPED → INVOICED → PAID, with CANCELLED reachable
//! from DRAFT and CONFIRMED. Each transition runs inside the caller's
//! transaction: lock the order, check the move, touch stock, post at most
//! one journal entry, then write the new status.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QueryOrder,
};
use tally_core::inventory::MovementSource;
use tally_core::ledger::CommitOutcome;
use tally_core::orders::{
    OrderCurrency, OrderError, OrderKind, OrderPostings, SalesOrderStatus, SalesWorkflow,
    order_total, validate_lines,
};
use tally_shared::PostingAccounts;
use tally_shared::types::{CompanyId, DocumentId};
use tracing::info;
use uuid::Uuid;

use super::inventory::InventoryRepository;
use super::ledger::LedgerRepository;
use super::orders::{
    NewOrder, TransitionOutcome, branch_code, check_currency, check_line_refs, insert_draft,
    load_company, lock_order, lock_order_of, number_order, posting_date, set_status,
};
use crate::entities::{companies, customers, documents, sales_order_lines, sales_orders};
use crate::service::ServiceError;

/// A locked sales order with everything a transition reads.
struct LockedOrder {
    document: documents::Model,
    status: SalesOrderStatus,
    header: sales_orders::Model,
    lines: Vec<sales_order_lines::Model>,
    company: companies::Model,
}

impl LockedOrder {
    fn id(&self) -> DocumentId {
        DocumentId::from_uuid(self.document.id)
    }

    fn number(&self) -> String {
        self.document.document_number.clone().unwrap_or_default()
    }

    fn currency(&self) -> OrderCurrency<'_> {
        OrderCurrency {
            currency: &self.header.currency,
            rate: self.header.exchange_rate,
        }
    }
}

/// Stateless sales order engine over a caller-owned transaction.
pub struct SalesOrderRepository;

impl SalesOrderRepository {
    /// Creates a DRAFT order. Nothing is numbered or reserved yet.
    ///
    /// # Errors
    ///
    /// Line validation errors, `CustomerNotFound`, `BranchNotFound`,
    /// `ProductNotFound`, `WarehouseNotFound`, currency errors or a database
    /// error.
    pub async fn create_draft(
        txn: &DatabaseTransaction,
        order: &NewOrder,
    ) -> Result<DocumentId, ServiceError> {
        validate_lines(&order.lines, order.exchange_rate)?;
        let company = load_company(txn, order.company_id).await?;
        let currency = check_currency(&company, &order.currency, order.exchange_rate)?;
        let customer = customers::Entity::find()
            .filter(customers::Column::CompanyId.eq(company.id))
            .filter(customers::Column::Code.eq(&order.party_code))
            .one(txn)
            .await?
            .ok_or_else(|| OrderError::CustomerNotFound(order.party_code.clone()))?;
        check_line_refs(txn, order.company_id, &order.lines).await?;

        let order_id = insert_draft(
            txn,
            order.company_id,
            OrderKind::Sales,
            SalesOrderStatus::Draft.as_str(),
            order.branch_id,
        )
        .await?;

        let total = order_total(&order.lines);
        sales_orders::ActiveModel {
            document_id: Set(order_id.into_inner()),
            company_id: Set(company.id),
            customer_id: Set(customer.id),
            branch_id: Set(order.branch_id.map(Into::into)),
            currency: Set(currency.to_string()),
            exchange_rate: Set(order.exchange_rate),
            order_date: Set(order.order_date),
            total: Set(total),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;

        let rows = order.lines.iter().zip(1..).map(|(line, line_no)| sales_order_lines::ActiveModel {
            id: Set(Uuid::now_v7()),
            order_id: Set(order_id.into_inner()),
            line_no: Set(line_no),
            product_id: Set(line.product_id.into_inner()),
            warehouse_id: Set(line.warehouse_id.into_inner()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            amount: Set(line.amount()),
        });
        sales_order_lines::Entity::insert_many(rows)
            .exec_without_returning(txn)
            .await?;

        info!(
            company = %company.code,
            order_id = %order_id,
            customer = %customer.code,
            total = %total,
            "sales order drafted"
        );
        Ok(order_id)
    }

    /// DRAFT → CONFIRMED: numbers the order and reserves stock line by line.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, `InsufficientStock`, `UnknownItem` or a database
    /// error. No reservation survives a failure.
    pub async fn confirm(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order = Self::lock(txn, company_id, order_id).await?;
        let next = SalesWorkflow::confirm(order.status)?;

        let number = number_order(
            txn,
            &order.company,
            OrderKind::Sales,
            order.header.order_date,
            order.header.branch_id,
        )
        .await?;

        for (key, line) in lock_order_of(company_id, &order.lines, |l| (l.product_id, l.warehouse_id)) {
            InventoryRepository::reserve(txn, key, line.quantity, MovementSource::line(order_id, line.id))
                .await?;
        }

        set_status(txn, order.document, next.as_str(), Some(&number)).await?;
        info!(
            order_id = %order_id,
            document_number = %number.formatted,
            "sales order confirmed"
        );

        Ok(TransitionOutcome {
            order_id,
            status: next.as_str(),
            document_number: Some(number.formatted),
            posting: None,
            warning: None,
        })
    }

    /// CONFIRMED → SHIPPED: consumes the reservations at average cost and
    /// posts the delivery note (DR cost of goods sold / CR inventory).
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, `InsufficientStock`, ledger errors or a database
    /// error.
    pub async fn ship(
        txn: &DatabaseTransaction,
        accounts: &PostingAccounts,
        company_id: CompanyId,
        order_id: DocumentId,
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order = Self::lock(txn, company_id, order_id).await?;
        let next = SalesWorkflow::ship(order.status)?;

        let mut cogs = Decimal::ZERO;
        for (key, line) in lock_order_of(company_id, &order.lines, |l| (l.product_id, l.warehouse_id)) {
            let source = MovementSource::line(order_id, line.id);
            if let Some(change) =
                InventoryRepository::ship_or_consume(txn, key, line.quantity, true, source).await?
            {
                cogs += change.value;
            }
        }

        let branch = branch_code(txn, company_id, order.header.branch_id).await?;
        let postings = OrderPostings::new(accounts, &order.company.code, branch.as_deref());
        let posting = match postings.delivery_note(
            order_id.into_inner(),
            &order.number(),
            &order.company.base_currency,
            cogs,
            posting_date(date),
        ) {
            Some(proposal) => Some(LedgerRepository::commit_in_txn(txn, &proposal).await?),
            None => None,
        };

        Self::finish(txn, order, next, posting, "sales order shipped").await
    }

    /// SHIPPED → INVOICED: posts DR receivable / CR revenue for the order
    /// total in the order currency.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, ledger errors or a database error.
    pub async fn invoice(
        txn: &DatabaseTransaction,
        accounts: &PostingAccounts,
        company_id: CompanyId,
        order_id: DocumentId,
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order = Self::lock(txn, company_id, order_id).await?;
        let next = SalesWorkflow::invoice(order.status)?;

        let posting = if order.header.total > Decimal::ZERO {
            let branch = branch_code(txn, company_id, order.header.branch_id).await?;
            let postings = OrderPostings::new(accounts, &order.company.code, branch.as_deref());
            let proposal = postings.sales_invoice(
                order_id.into_inner(),
                &order.number(),
                order.currency(),
                order.header.total,
                posting_date(date),
            );
            Some(LedgerRepository::commit_in_txn(txn, &proposal).await?)
        } else {
            None
        };

        Self::finish(txn, order, next, posting, "sales order invoiced").await
    }

    /// INVOICED → PAID: posts DR bank / CR receivable.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, ledger errors or a database error.
    pub async fn pay(
        txn: &DatabaseTransaction,
        accounts: &PostingAccounts,
        company_id: CompanyId,
        order_id: DocumentId,
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order = Self::lock(txn, company_id, order_id).await?;
        let next = SalesWorkflow::pay(order.status)?;

        let posting = if order.header.total > Decimal::ZERO {
            let branch = branch_code(txn, company_id, order.header.branch_id).await?;
            let postings = OrderPostings::new(accounts, &order.company.code, branch.as_deref());
            let proposal = postings.customer_receipt(
                order_id.into_inner(),
                &order.number(),
                order.currency(),
                order.header.total,
                posting_date(date),
            );
            Some(LedgerRepository::commit_in_txn(txn, &proposal).await?)
        } else {
            None
        };

        Self::finish(txn, order, next, posting, "sales order paid").await
    }

    /// DRAFT | CONFIRMED → CANCELLED, releasing reservations of a confirmed
    /// order.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` once shipped, or a database error.
    pub async fn cancel(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order = Self::lock(txn, company_id, order_id).await?;
        let next = SalesWorkflow::cancel(order.status)?;

        if order.status.holds_reservations() {
            for (key, line) in
                lock_order_of(company_id, &order.lines, |l| (l.product_id, l.warehouse_id))
            {
                let source = MovementSource::line(order_id, line.id);
                InventoryRepository::cancel_reservation(txn, key, line.quantity, source).await?;
            }
        }

        Self::finish(txn, order, next, None, "sales order cancelled").await
    }

    async fn lock(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<LockedOrder, ServiceError> {
        let document = lock_order(txn, company_id, order_id, OrderKind::Sales).await?;
        let status = SalesOrderStatus::from_stored(&document.status)?;
        let header = sales_orders::Entity::find_by_id(document.id)
            .one(txn)
            .await?
            .ok_or(OrderError::OrderNotFound {
                kind: OrderKind::Sales,
                id: document.id,
            })?;
        let lines = sales_order_lines::Entity::find()
            .filter(sales_order_lines::Column::OrderId.eq(document.id))
            .order_by_asc(sales_order_lines::Column::LineNo)
            .all(txn)
            .await?;
        let company = load_company(txn, company_id).await?;

        Ok(LockedOrder {
            document,
            status,
            header,
            lines,
            company,
        })
    }

    async fn finish(
        txn: &DatabaseTransaction,
        order: LockedOrder,
        next: SalesOrderStatus,
        posting: Option<CommitOutcome>,
        message: &'static str,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order_id = order.id();
        let document_number = order.document.document_number.clone();
        set_status(txn, order.document, next.as_str(), None).await?;
        info!(
            order_id = %order_id,
            status = next.as_str(),
            entry_id = ?posting.as_ref().map(|p| p.entry_id),
            "{message}"
        );

        Ok(TransitionOutcome {
            order_id,
            status: next.as_str(),
            document_number,
            posting,
            warning: None,
        })
    }
}
