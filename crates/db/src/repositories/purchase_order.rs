//! Purchase order engine.
//!
//! DRAFT → APPROVED → (partial receipts) → RECEIVED → INVOICED → PAID, with
//! CANCELLED reachable before anything arrives. Stock enters at the order's
//! unit cost converted to base currency; the vendor bill, also in base
//! currency, clears goods received not invoiced at the receipts' value and
//! books any price or conversion difference as a variance.

use std::collections::{HashMap, HashSet};

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tally_core::currency::round_cost;
use tally_core::inventory::MovementSource;
use tally_core::ledger::CommitOutcome;
use tally_core::orders::{
    BillAmounts, InvoiceDeviation, OrderCurrency, OrderError, OrderKind, OrderPostings,
    PurchaseOrderStatus, PurchaseWorkflow, ReceiptLineInput, ReceivedLine, check_invoice_deviation,
    order_total, validate_lines,
};
use tally_shared::{LedgerConfig, PostingAccounts};
use tally_shared::types::{CompanyId, DocumentId};
use tracing::{info, warn};
use uuid::Uuid;

use super::inventory::InventoryRepository;
use super::ledger::LedgerRepository;
use super::orders::{
    NewOrder, TransitionOutcome, branch_code, check_currency, check_line_refs, insert_draft,
    load_company, lock_order, lock_order_of, number_order, posting_date, set_status,
};
use crate::entities::{
    companies, documents, goods_receipt_lines, goods_receipts, products, purchase_order_lines,
    purchase_orders, vendors,
};
use crate::service::ServiceError;

struct LockedOrder {
    document: documents::Model,
    status: PurchaseOrderStatus,
    header: purchase_orders::Model,
    lines: Vec<purchase_order_lines::Model>,
    company: companies::Model,
}

impl LockedOrder {
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

/// Stateless purchase order engine over a caller-owned transaction.
pub struct PurchaseOrderRepository;

impl PurchaseOrderRepository {
    /// Creates a DRAFT order.
    ///
    /// # Errors
    ///
    /// Line validation errors, `VendorNotFound`, `BranchNotFound`,
    /// `ProductNotFound`, `WarehouseNotFound`, currency errors or a database
    /// error.
    pub async fn create_draft(
        txn: &DatabaseTransaction,
        order: &NewOrder,
    ) -> Result<DocumentId, ServiceError> {
        validate_lines(&order.lines, order.exchange_rate)?;
        let company = load_company(txn, order.company_id).await?;
        let currency = check_currency(&company, &order.currency, order.exchange_rate)?;
        let vendor = vendors::Entity::find()
            .filter(vendors::Column::CompanyId.eq(company.id))
            .filter(vendors::Column::Code.eq(&order.party_code))
            .one(txn)
            .await?
            .ok_or_else(|| OrderError::VendorNotFound(order.party_code.clone()))?;
        check_line_refs(txn, order.company_id, &order.lines).await?;

        let order_id = insert_draft(
            txn,
            order.company_id,
            OrderKind::Purchase,
            PurchaseOrderStatus::Draft.as_str(),
            order.branch_id,
        )
        .await?;

        let total = order_total(&order.lines);
        purchase_orders::ActiveModel {
            document_id: Set(order_id.into_inner()),
            company_id: Set(company.id),
            vendor_id: Set(vendor.id),
            branch_id: Set(order.branch_id.map(Into::into)),
            currency: Set(currency.to_string()),
            exchange_rate: Set(order.exchange_rate),
            order_date: Set(order.order_date),
            total: Set(total),
            invoiced_amount: Set(None),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;

        let rows = order
            .lines
            .iter()
            .zip(1..)
            .map(|(line, line_no)| purchase_order_lines::ActiveModel {
                id: Set(Uuid::now_v7()),
                order_id: Set(order_id.into_inner()),
                line_no: Set(line_no),
                product_id: Set(line.product_id.into_inner()),
                warehouse_id: Set(line.warehouse_id.into_inner()),
                quantity: Set(line.quantity),
                unit_cost: Set(line.unit_price),
                amount: Set(line.amount()),
            });
        purchase_order_lines::Entity::insert_many(rows)
            .exec_without_returning(txn)
            .await?;

        info!(
            company = %company.code,
            order_id = %order_id,
            vendor = %vendor.code,
            total = %total,
            "purchase order drafted"
        );
        Ok(order_id)
    }

    /// DRAFT → APPROVED: numbers the order.
    ///
    /// # Errors
    ///
    /// `InvalidTransition` or a database error.
    pub async fn approve(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order = Self::lock(txn, company_id, order_id).await?;
        let next = PurchaseWorkflow::approve(order.status)?;

        let number = number_order(
            txn,
            &order.company,
            OrderKind::Purchase,
            order.header.order_date,
            order.header.branch_id,
        )
        .await?;
        set_status(txn, order.document, next.as_str(), Some(&number)).await?;
        info!(
            order_id = %order_id,
            document_number = %number.formatted,
            "purchase order approved"
        );

        Ok(TransitionOutcome {
            order_id,
            status: next.as_str(),
            document_number: Some(number.formatted),
            posting: None,
            warning: None,
        })
    }

    /// Records one goods receipt against an approved order.
    ///
    /// Receipts may be partial; the order becomes RECEIVED once every line has
    /// arrived in full. Stock lines enter inventory at the order unit cost in
    /// base currency and the receipt value is posted DR inventory / CR goods
    /// received not invoiced.
    ///
    /// # Errors
    ///
    /// `EmptyReceipt`, `InvalidTransition`, `LineNotFound`, `OverReceipt`,
    /// ledger errors or a database error.
    pub async fn receive(
        txn: &DatabaseTransaction,
        accounts: &PostingAccounts,
        company_id: CompanyId,
        order_id: DocumentId,
        receipt: &[ReceiptLineInput],
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        if receipt.is_empty() {
            return Err(OrderError::EmptyReceipt.into());
        }
        let order = Self::lock(txn, company_id, order_id).await?;
        PurchaseWorkflow::receive(order.status, false)?;

        let received = Self::received_quantities(txn, order.document.id).await?;
        let mut progress: HashMap<Uuid, ReceivedLine> = order
            .lines
            .iter()
            .map(|line| {
                let progress = ReceivedLine {
                    line_id: line.id,
                    ordered: line.quantity,
                    received: received.get(&line.id).copied().unwrap_or_default(),
                };
                (line.id, progress)
            })
            .collect();
        for input in receipt {
            let line = progress
                .get_mut(&input.line_id)
                .ok_or(OrderError::LineNotFound(input.line_id))?;
            line.check(input.quantity)?;
            line.received += input.quantity;
        }
        let complete = progress.values().all(ReceivedLine::is_complete);
        let next = PurchaseWorkflow::receive(order.status, complete)?;

        let by_id: HashMap<Uuid, &purchase_order_lines::Model> =
            order.lines.iter().map(|line| (line.id, line)).collect();
        let arriving = receipt
            .iter()
            .filter_map(|input| by_id.get(&input.line_id).map(|line| (*line, input.quantity)));

        let receipt_id = Uuid::now_v7();
        let receipt_date = posting_date(date);
        let mut value = Decimal::ZERO;
        let mut rows = Vec::with_capacity(receipt.len());
        for (key, (line, quantity)) in
            lock_order_of(company_id, arriving, |(l, _)| (l.product_id, l.warehouse_id))
        {
            let unit_cost_base = round_cost(line.unit_cost * order.header.exchange_rate);
            let row_id = Uuid::now_v7();
            let source = MovementSource::line(order_id, row_id);
            let line_value = InventoryRepository::receive(txn, key, quantity, unit_cost_base, source)
                .await?
                .map_or(Decimal::ZERO, |change| change.value);
            value += line_value;
            rows.push(goods_receipt_lines::ActiveModel {
                id: Set(row_id),
                receipt_id: Set(receipt_id),
                order_line_id: Set(line.id),
                quantity: Set(quantity),
                unit_cost_base: Set(unit_cost_base),
                value: Set(line_value),
            });
        }

        let branch = branch_code(txn, company_id, order.header.branch_id).await?;
        let postings = OrderPostings::new(accounts, &order.company.code, branch.as_deref());
        let base = OrderCurrency {
            currency: &order.company.base_currency,
            rate: Decimal::ONE,
        };
        let posting = match postings.goods_receipt(
            order_id.into_inner(),
            receipt_id,
            &order.number(),
            base,
            value,
            receipt_date,
        ) {
            Some(proposal) => Some(LedgerRepository::commit_in_txn(txn, &proposal).await?),
            None => None,
        };

        goods_receipts::ActiveModel {
            id: Set(receipt_id),
            company_id: Set(company_id.into_inner()),
            order_id: Set(order_id.into_inner()),
            receipt_date: Set(receipt_date),
            journal_entry_id: Set(posting.as_ref().map(|p| p.entry_id.into_inner())),
            created_at: Set(Utc::now().into()),
        }
        .insert(txn)
        .await?;
        goods_receipt_lines::Entity::insert_many(rows)
            .exec_without_returning(txn)
            .await?;

        info!(
            order_id = %order_id,
            receipt_id = %receipt_id,
            value = %value,
            complete,
            "goods received"
        );
        Self::finish(txn, order, next, posting, None).await
    }

    /// RECEIVED → INVOICED: books the vendor bill.
    ///
    /// `invoice_amount` defaults to the order value. A deviation beyond the
    /// configured tolerance is reported as a warning, not a rejection.
    ///
    /// # Errors
    ///
    /// `InvalidTransition`, `InvalidInvoiceAmount`, ledger errors or a
    /// database error.
    pub async fn invoice(
        txn: &DatabaseTransaction,
        config: &LedgerConfig,
        company_id: CompanyId,
        order_id: DocumentId,
        invoice_amount: Option<Decimal>,
        date: Option<NaiveDate>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order = Self::lock(txn, company_id, order_id).await?;
        let next = PurchaseWorkflow::invoice(order.status)?;

        let product_ids: HashSet<Uuid> = order.lines.iter().map(|l| l.product_id).collect();
        let stock_items: HashSet<Uuid> = products::Entity::find()
            .filter(products::Column::Id.is_in(product_ids))
            .filter(products::Column::IsStockItem.eq(true))
            .all(txn)
            .await?
            .into_iter()
            .map(|p| p.id)
            .collect();
        let (ordered_stock, service_value) =
            order
                .lines
                .iter()
                .fold((Decimal::ZERO, Decimal::ZERO), |(stock, service), line| {
                    if stock_items.contains(&line.product_id) {
                        (stock + line.amount, service)
                    } else {
                        (stock, service + line.amount)
                    }
                });

        let expected = ordered_stock + service_value;
        let invoiced = invoice_amount.unwrap_or(expected);
        if invoiced <= Decimal::ZERO {
            return Err(OrderError::InvalidInvoiceAmount(invoiced).into());
        }
        let received_base = Self::received_value(txn, order.document.id).await?;
        let amounts = BillAmounts::in_base(
            received_base,
            service_value,
            invoiced,
            order.header.exchange_rate,
        )
        .ok_or(OrderError::InvalidInvoiceAmount(invoiced))?;

        let warning = check_invoice_deviation(expected, invoiced, config.invoice_tolerance_pct);
        if let Some(deviation) = &warning {
            warn!(
                order_id = %order_id,
                expected = %deviation.expected,
                invoiced = %deviation.invoiced,
                deviation_pct = %deviation.deviation_pct,
                tolerance_pct = %deviation.tolerance_pct,
                "vendor invoice deviates from order value"
            );
        }

        let branch = branch_code(txn, company_id, order.header.branch_id).await?;
        let postings = OrderPostings::new(&config.accounts, &order.company.code, branch.as_deref());
        let base = OrderCurrency {
            currency: &order.company.base_currency,
            rate: Decimal::ONE,
        };
        let proposal = postings.purchase_invoice(
            order_id.into_inner(),
            &order.number(),
            base,
            &amounts,
            posting_date(date),
        );
        let posting = LedgerRepository::commit_in_txn(txn, &proposal).await?;

        let mut header: purchase_orders::ActiveModel = order.header.clone().into();
        header.invoiced_amount = Set(Some(invoiced));
        header.update(txn).await?;

        Self::finish(txn, order, next, Some(posting), warning).await
    }

    /// INVOICED → PAID: posts DR payable / CR bank for the billed amount.
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
        let next = PurchaseWorkflow::pay(order.status)?;

        let amount = order.header.invoiced_amount.unwrap_or(order.header.total);
        let branch = branch_code(txn, company_id, order.header.branch_id).await?;
        let postings = OrderPostings::new(accounts, &order.company.code, branch.as_deref());
        let proposal = postings.vendor_payment(
            order_id.into_inner(),
            &order.number(),
            order.currency(),
            amount,
            posting_date(date),
        );
        let posting = LedgerRepository::commit_in_txn(txn, &proposal).await?;

        Self::finish(txn, order, next, Some(posting), None).await
    }

    /// DRAFT | APPROVED → CANCELLED, only while nothing has been received.
    ///
    /// # Errors
    ///
    /// `HasReceipts`, `InvalidTransition` or a database error.
    pub async fn cancel(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order = Self::lock(txn, company_id, order_id).await?;
        let receipts = goods_receipts::Entity::find()
            .filter(goods_receipts::Column::OrderId.eq(order.document.id))
            .count(txn)
            .await?;
        let next = PurchaseWorkflow::cancel(order.status, order.document.id, receipts > 0)?;

        Self::finish(txn, order, next, None, None).await
    }

    /// Quantity received so far per order line.
    /// Base value the goods receipts of an order put into GRNI.
    async fn received_value(
        txn: &DatabaseTransaction,
        order_id: Uuid,
    ) -> Result<Decimal, ServiceError> {
        let value: Option<Option<Decimal>> = goods_receipt_lines::Entity::find()
            .inner_join(goods_receipts::Entity)
            .filter(goods_receipts::Column::OrderId.eq(order_id))
            .select_only()
            .column_as(goods_receipt_lines::Column::Value.sum(), "value")
            .into_tuple()
            .one(txn)
            .await?;
        Ok(value.flatten().unwrap_or_default())
    }

    async fn received_quantities(
        txn: &DatabaseTransaction,
        order_id: Uuid,
    ) -> Result<HashMap<Uuid, Decimal>, ServiceError> {
        let totals: Vec<(Uuid, Option<Decimal>)> = goods_receipt_lines::Entity::find()
            .inner_join(goods_receipts::Entity)
            .filter(goods_receipts::Column::OrderId.eq(order_id))
            .select_only()
            .column(goods_receipt_lines::Column::OrderLineId)
            .column_as(goods_receipt_lines::Column::Quantity.sum(), "received")
            .group_by(goods_receipt_lines::Column::OrderLineId)
            .into_tuple()
            .all(txn)
            .await?;
        Ok(totals
            .into_iter()
            .map(|(line_id, received)| (line_id, received.unwrap_or_default()))
            .collect())
    }

    async fn lock(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        order_id: DocumentId,
    ) -> Result<LockedOrder, ServiceError> {
        let document = lock_order(txn, company_id, order_id, OrderKind::Purchase).await?;
        let status = PurchaseOrderStatus::from_stored(&document.status)?;
        let header = purchase_orders::Entity::find_by_id(document.id)
            .one(txn)
            .await?
            .ok_or(OrderError::OrderNotFound {
                kind: OrderKind::Purchase,
                id: document.id,
            })?;
        let lines = purchase_order_lines::Entity::find()
            .filter(purchase_order_lines::Column::OrderId.eq(document.id))
            .order_by_asc(purchase_order_lines::Column::LineNo)
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
        next: PurchaseOrderStatus,
        posting: Option<CommitOutcome>,
        warning: Option<InvoiceDeviation>,
    ) -> Result<TransitionOutcome, ServiceError> {
        let order_id = DocumentId::from_uuid(order.document.id);
        let document_number = order.document.document_number.clone();
        set_status(txn, order.document, next.as_str(), None).await?;
        info!(
            order_id = %order_id,
            status = next.as_str(),
            entry_id = ?posting.as_ref().map(|p| p.entry_id),
            "purchase order moved"
        );

        Ok(TransitionOutcome {
            order_id,
            status: next.as_str(),
            document_number,
            posting,
            warning,
        })
    }
}
