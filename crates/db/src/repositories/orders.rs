//! Plumbing shared by the sales and purchase order engines.
//!
//! An order is a `documents` row (status, number) plus a header and lines.
//! Every transition starts by locking the document row, so two transitions
//! of the same order serialize and the second one sees the first one's status.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, EntityTrait, QueryFilter,
    QuerySelect,
};
use tally_core::inventory::{InventoryError, InventoryKey};
use tally_core::ledger::{CommitOutcome, LedgerError};
use tally_core::numbering::{AssignedNumber, DocumentType, NumberingError};
use tally_core::orders::{InvoiceDeviation, OrderError, OrderKind, OrderLineInput};
use tally_shared::types::{BranchId, CompanyId, CurrencyCode, DocumentId, ProductId, WarehouseId};
use uuid::Uuid;

use super::numbering::NumberingRepository;
use crate::entities::{branches, companies, documents, products, warehouses};
use crate::service::ServiceError;

/// Header fields of a new order, sales or purchase.
#[derive(Debug, Clone)]
pub struct NewOrder {
    /// Owning company.
    pub company_id: CompanyId,
    /// Customer code for a sales order, vendor code for a purchase order.
    pub party_code: String,
    /// Branch that numbers the order and its delivery or receipt notes.
    pub branch_id: Option<BranchId>,
    /// Transaction currency.
    pub currency: String,
    /// Units of base currency per unit of `currency`.
    pub exchange_rate: Decimal,
    /// Order date; decides the fiscal year of the order number.
    pub order_date: NaiveDate,
    /// At least one line.
    pub lines: Vec<OrderLineInput>,
}

/// Result of one order transition.
#[derive(Debug, Clone)]
pub struct TransitionOutcome {
    /// The order.
    pub order_id: DocumentId,
    /// Status after the transition.
    pub status: &'static str,
    /// Order number, once assigned.
    pub document_number: Option<String>,
    /// Journal entry posted by the transition, if any.
    pub posting: Option<CommitOutcome>,
    /// Non-fatal warning raised by the transition.
    pub warning: Option<InvoiceDeviation>,
}

const fn document_type(kind: OrderKind) -> DocumentType {
    match kind {
        OrderKind::Sales => DocumentType::SalesOrder,
        OrderKind::Purchase => DocumentType::PurchaseOrder,
    }
}

/// Locks an order's document row (`SELECT ... FOR UPDATE`).
pub(crate) async fn lock_order(
    txn: &DatabaseTransaction,
    company_id: CompanyId,
    order_id: DocumentId,
    kind: OrderKind,
) -> Result<documents::Model, ServiceError> {
    let document = documents::Entity::find_by_id(order_id.into_inner())
        .filter(documents::Column::CompanyId.eq(company_id.into_inner()))
        .filter(documents::Column::DocumentType.eq(document_type(kind).prefix()))
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or(OrderError::OrderNotFound {
            kind,
            id: order_id.into_inner(),
        })?;
    Ok(document)
}

pub(crate) async fn load_company(
    txn: &DatabaseTransaction,
    company_id: CompanyId,
) -> Result<companies::Model, ServiceError> {
    let company = companies::Entity::find_by_id(company_id.into_inner())
        .one(txn)
        .await?
        .ok_or_else(|| LedgerError::CompanyNotFound(company_id.to_string()))?;
    Ok(company)
}

/// Code of the order's branch, for the branch component of posted numbers.
pub(crate) async fn branch_code(
    txn: &DatabaseTransaction,
    company_id: CompanyId,
    branch_id: Option<Uuid>,
) -> Result<Option<String>, ServiceError> {
    let Some(branch_id) = branch_id else {
        return Ok(None);
    };
    let branch = branches::Entity::find_by_id(branch_id)
        .filter(branches::Column::CompanyId.eq(company_id.into_inner()))
        .one(txn)
        .await?
        .ok_or(NumberingError::BranchNotFound(branch_id))?;
    Ok(Some(branch.code))
}

/// Checks the order currency and rate against the company's base currency.
pub(crate) fn check_currency(
    company: &companies::Model,
    currency: &str,
    exchange_rate: Decimal,
) -> Result<CurrencyCode, ServiceError> {
    let code = CurrencyCode::parse(currency).map_err(|e| LedgerError::InvalidCurrency(e.0))?;
    if exchange_rate <= Decimal::ZERO {
        return Err(OrderError::InvalidExchangeRate(exchange_rate).into());
    }
    if code.as_str() == company.base_currency && exchange_rate != Decimal::ONE {
        return Err(LedgerError::BaseCurrencyRate {
            currency: company.base_currency.clone(),
            rate: exchange_rate,
        }
        .into());
    }
    Ok(code)
}

/// Checks that every product and warehouse on the lines belongs to the company.
pub(crate) async fn check_line_refs(
    txn: &DatabaseTransaction,
    company_id: CompanyId,
    lines: &[OrderLineInput],
) -> Result<(), ServiceError> {
    let product_ids: HashSet<Uuid> = lines.iter().map(|l| l.product_id.into_inner()).collect();
    let known: HashSet<Uuid> = products::Entity::find()
        .filter(products::Column::CompanyId.eq(company_id.into_inner()))
        .filter(products::Column::Id.is_in(product_ids.iter().copied()))
        .all(txn)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();
    if let Some(missing) = product_ids.iter().find(|id| !known.contains(id)) {
        return Err(InventoryError::ProductNotFound(ProductId::from_uuid(*missing)).into());
    }

    let warehouse_ids: HashSet<Uuid> = lines.iter().map(|l| l.warehouse_id.into_inner()).collect();
    let known: HashSet<Uuid> = warehouses::Entity::find()
        .filter(warehouses::Column::CompanyId.eq(company_id.into_inner()))
        .filter(warehouses::Column::Id.is_in(warehouse_ids.iter().copied()))
        .all(txn)
        .await?
        .into_iter()
        .map(|w| w.id)
        .collect();
    if let Some(missing) = warehouse_ids.iter().find(|id| !known.contains(id)) {
        return Err(InventoryError::WarehouseNotFound(WarehouseId::from_uuid(*missing)).into());
    }
    Ok(())
}

/// Inserts the unnumbered document envelope of a new draft order.
pub(crate) async fn insert_draft(
    txn: &DatabaseTransaction,
    company_id: CompanyId,
    kind: OrderKind,
    status: &str,
    branch_id: Option<BranchId>,
) -> Result<DocumentId, ServiceError> {
    if let Some(branch_id) = branch_id {
        branch_code(txn, company_id, Some(branch_id.into_inner())).await?;
    }

    let now = Utc::now();
    let order_id = DocumentId::new();
    documents::ActiveModel {
        id: Set(order_id.into_inner()),
        company_id: Set(company_id.into_inner()),
        document_type: Set(document_type(kind).prefix().to_string()),
        status: Set(status.to_string()),
        document_number: Set(None),
        fiscal_year: Set(0),
        branch_id: Set(branch_id.map(Into::into)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(txn)
    .await?;
    Ok(order_id)
}

/// Draws the order number for the fiscal year of `order_date`.
pub(crate) async fn number_order(
    txn: &DatabaseTransaction,
    company: &companies::Model,
    kind: OrderKind,
    order_date: NaiveDate,
    branch_id: Option<Uuid>,
) -> Result<AssignedNumber, ServiceError> {
    let fiscal_year = NumberingRepository::fiscal_year(company, order_date)?;
    let number = NumberingRepository::assign_number(
        txn,
        CompanyId::from_uuid(company.id),
        document_type(kind),
        Some(fiscal_year),
        branch_id.map(BranchId::from_uuid),
    )
    .await?;
    Ok(number)
}

/// Writes the new status, and the number when one was just assigned.
pub(crate) async fn set_status(
    txn: &DatabaseTransaction,
    document: documents::Model,
    status: &str,
    number: Option<&AssignedNumber>,
) -> Result<(), ServiceError> {
    let mut active: documents::ActiveModel = document.into();
    active.status = Set(status.to_string());
    if let Some(number) = number {
        active.document_number = Set(Some(number.formatted.clone()));
        active.fiscal_year = Set(number.key.fiscal_year);
    }
    active.updated_at = Set(Utc::now().into());
    active.update(txn).await?;
    Ok(())
}

/// Orders line references by inventory key so that concurrent transitions
/// touching the same items lock their rows in the same order.
pub(crate) fn lock_order_of<T>(
    company_id: CompanyId,
    lines: impl IntoIterator<Item = T>,
    key_of: impl Fn(&T) -> (Uuid, Uuid),
) -> Vec<(InventoryKey, T)> {
    let mut keyed: Vec<(InventoryKey, T)> = lines
        .into_iter()
        .map(|line| {
            let (product_id, warehouse_id) = key_of(&line);
            let key = InventoryKey::new(
                company_id,
                ProductId::from_uuid(product_id),
                WarehouseId::from_uuid(warehouse_id),
            );
            (key, line)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| (key.product_id.into_inner(), key.warehouse_id.into_inner()));
    keyed
}

/// Posting date of a transition: the given date or today (UTC).
pub(crate) fn posting_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Utc::now().date_naive())
}
