//! Sales and purchase order lifecycles end to end.

#![allow(clippy::uninlined_format_args)]

mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use tally_core::inventory::InventoryError;
use tally_core::orders::{OrderError, OrderLineInput, ReceiptLineInput};
use tally_db::entities::{documents, purchase_order_lines};
use tally_db::seed::{CUSTOMER_CODE, OPENING_EQUITY, VENDOR_CODE};
use tally_db::{NewOrder, ServiceError, StockReceipt};
use tally_shared::types::DocumentId;
use uuid::Uuid;

use common::{TestContext, key, setup};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn opening_stock(ctx: &TestContext, quantity: Decimal, unit_cost: Decimal) {
    let receipt = StockReceipt {
        product_id: ctx.company.stock_product_id,
        warehouse_id: ctx.company.warehouse_id,
        quantity,
        unit_cost,
        offset_account: OPENING_EQUITY.to_string(),
        idempotency_key: key("opening"),
        date: Some(date(2026, 4, 1)),
        narration: "Opening stock".to_string(),
    };
    ctx.service
        .receive_stock(ctx.company.company_id, &receipt)
        .await
        .unwrap();
}

fn sales_order(ctx: &TestContext, quantity: Decimal, unit_price: Decimal) -> NewOrder {
    NewOrder {
        company_id: ctx.company.company_id,
        party_code: CUSTOMER_CODE.to_string(),
        branch_id: Some(ctx.company.branch_id),
        currency: "INR".to_string(),
        exchange_rate: Decimal::ONE,
        order_date: date(2026, 5, 1),
        lines: vec![OrderLineInput {
            product_id: ctx.company.stock_product_id,
            warehouse_id: ctx.company.warehouse_id,
            quantity,
            unit_price,
        }],
    }
}

async fn status_of(ctx: &TestContext, order_id: DocumentId) -> String {
    documents::Entity::find_by_id(order_id.into_inner())
        .one(&ctx.db)
        .await
        .unwrap()
        .unwrap()
        .status
}

async fn line_ids(ctx: &TestContext, order_id: DocumentId) -> Vec<Uuid> {
    purchase_order_lines::Entity::find()
        .filter(purchase_order_lines::Column::OrderId.eq(order_id.into_inner()))
        .order_by_asc(purchase_order_lines::Column::LineNo)
        .all(&ctx.db)
        .await
        .unwrap()
        .into_iter()
        .map(|line| line.id)
        .collect()
}

#[tokio::test]
async fn test_sales_order_lifecycle() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let company_id = ctx.company.company_id;
    opening_stock(&ctx, dec!(20), dec!(60)).await;

    let order_id = ctx
        .service
        .create_sales_order(&sales_order(&ctx, dec!(10), dec!(100)))
        .await
        .unwrap();
    assert_eq!(status_of(&ctx, order_id).await, "DRAFT");

    let confirmed = ctx.service.confirm_sales_order(company_id, order_id).await.unwrap();
    assert_eq!(confirmed.status, "CONFIRMED");
    assert_eq!(confirmed.document_number.as_deref(), Some("SO-HQ-2026-000001"));

    let level = ctx
        .service
        .stock_level(company_id, ctx.company.stock_product_id, ctx.company.warehouse_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.qty_reserved, dec!(10));

    let shipped = ctx
        .service
        .ship_sales_order(company_id, order_id, Some(date(2026, 5, 3)))
        .await
        .unwrap();
    let delivery = shipped.posting.unwrap();
    assert_eq!(delivery.total_base, dec!(600));
    assert_eq!(delivery.document_number, "DN-HQ-2026-000001");

    let invoiced = ctx
        .service
        .invoice_sales_order(company_id, order_id, Some(date(2026, 5, 4)))
        .await
        .unwrap();
    let invoice = invoiced.posting.unwrap();
    assert_eq!(invoice.total_base, dec!(1000));
    assert_eq!(invoice.document_number, "INV-2026-000001");

    let paid = ctx
        .service
        .pay_sales_order(company_id, order_id, Some(date(2026, 5, 20)))
        .await
        .unwrap();
    assert_eq!(paid.status, "PAID");
    assert_eq!(paid.posting.unwrap().document_number, "RCPT-2026-000001");

    let level = ctx
        .service
        .stock_level(company_id, ctx.company.stock_product_id, ctx.company.warehouse_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.qty_on_hand, dec!(10));
    assert_eq!(level.qty_reserved, Decimal::ZERO);

    let trial = ctx.service.trial_balance(company_id, None).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.row("1000").unwrap().balance, dec!(1000));
    assert_eq!(trial.row("1100").unwrap().balance, Decimal::ZERO);
    assert_eq!(trial.row("1200").unwrap().balance, dec!(600));
    assert_eq!(trial.row("4000").unwrap().balance, dec!(1000));
    assert_eq!(trial.row("5000").unwrap().balance, dec!(600));
}

#[tokio::test]
async fn test_sales_order_rejects_skipped_steps() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let company_id = ctx.company.company_id;
    opening_stock(&ctx, dec!(5), dec!(10)).await;
    let order_id = ctx
        .service
        .create_sales_order(&sales_order(&ctx, dec!(1), dec!(25)))
        .await
        .unwrap();

    let err = ctx
        .service
        .ship_sales_order(company_id, order_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Order(OrderError::InvalidTransition { .. })));
    assert_eq!(status_of(&ctx, order_id).await, "DRAFT");
}

#[tokio::test]
async fn test_confirm_without_stock_consumes_no_number() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let company_id = ctx.company.company_id;
    opening_stock(&ctx, dec!(5), dec!(10)).await;

    let order_id = ctx
        .service
        .create_sales_order(&sales_order(&ctx, dec!(8), dec!(25)))
        .await
        .unwrap();
    let err = ctx.service.confirm_sales_order(company_id, order_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Inventory(InventoryError::InsufficientStock { .. })));
    assert_eq!(status_of(&ctx, order_id).await, "DRAFT");

    opening_stock(&ctx, dec!(5), dec!(10)).await;
    let confirmed = ctx.service.confirm_sales_order(company_id, order_id).await.unwrap();
    assert_eq!(confirmed.document_number.as_deref(), Some("SO-HQ-2026-000001"));
}

#[tokio::test]
async fn test_cancel_releases_reservations() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let company_id = ctx.company.company_id;
    opening_stock(&ctx, dec!(10), dec!(10)).await;

    let order_id = ctx
        .service
        .create_sales_order(&sales_order(&ctx, dec!(6), dec!(25)))
        .await
        .unwrap();
    ctx.service.confirm_sales_order(company_id, order_id).await.unwrap();
    let cancelled = ctx.service.cancel_sales_order(company_id, order_id).await.unwrap();
    assert_eq!(cancelled.status, "CANCELLED");

    let level = ctx
        .service
        .stock_level(company_id, ctx.company.stock_product_id, ctx.company.warehouse_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.qty_reserved, Decimal::ZERO);
    assert_eq!(level.qty_on_hand, dec!(10));

    let err = ctx.service.cancel_sales_order(company_id, order_id).await.unwrap_err();
    assert!(matches!(err, ServiceError::Order(OrderError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_unknown_customer_is_rejected() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let mut order = sales_order(&ctx, dec!(1), dec!(1));
    order.party_code = "NOBODY".to_string();
    let err = ctx.service.create_sales_order(&order).await.unwrap_err();
    assert!(matches!(err, ServiceError::Order(OrderError::CustomerNotFound(_))));
}

#[tokio::test]
async fn test_purchase_order_with_partial_receipts_and_variance() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let company_id = ctx.company.company_id;
    let order = NewOrder {
        company_id,
        party_code: VENDOR_CODE.to_string(),
        branch_id: Some(ctx.company.branch_id),
        currency: "INR".to_string(),
        exchange_rate: Decimal::ONE,
        order_date: date(2026, 6, 1),
        lines: vec![
            OrderLineInput {
                product_id: ctx.company.stock_product_id,
                warehouse_id: ctx.company.warehouse_id,
                quantity: dec!(10),
                unit_price: dec!(50),
            },
            OrderLineInput {
                product_id: ctx.company.service_product_id,
                warehouse_id: ctx.company.warehouse_id,
                quantity: dec!(1),
                unit_price: dec!(200),
            },
        ],
    };
    let order_id = ctx.service.create_purchase_order(&order).await.unwrap();
    let approved = ctx.service.approve_purchase_order(company_id, order_id).await.unwrap();
    assert_eq!(approved.document_number.as_deref(), Some("PO-HQ-2026-000001"));
    let lines = line_ids(&ctx, order_id).await;

    let partial = ctx
        .service
        .receive_purchase_order(
            company_id,
            order_id,
            &[ReceiptLineInput { line_id: lines[0], quantity: dec!(4) }],
            Some(date(2026, 6, 5)),
        )
        .await
        .unwrap();
    assert_eq!(partial.status, "APPROVED");
    assert_eq!(partial.posting.unwrap().total_base, dec!(200));

    let err = ctx
        .service
        .receive_purchase_order(
            company_id,
            order_id,
            &[ReceiptLineInput { line_id: lines[0], quantity: dec!(7) }],
            None,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Order(OrderError::OverReceipt { .. })));

    let err = ctx
        .service
        .cancel_purchase_order(company_id, order_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Order(OrderError::HasReceipts(_))));

    let rest = ctx
        .service
        .receive_purchase_order(
            company_id,
            order_id,
            &[
                ReceiptLineInput { line_id: lines[0], quantity: dec!(6) },
                ReceiptLineInput { line_id: lines[1], quantity: dec!(1) },
            ],
            Some(date(2026, 6, 9)),
        )
        .await
        .unwrap();
    assert_eq!(rest.status, "RECEIVED");
    assert_eq!(rest.posting.unwrap().total_base, dec!(300));

    let billed = ctx
        .service
        .invoice_purchase_order(company_id, order_id, Some(dec!(720)), Some(date(2026, 6, 10)))
        .await
        .unwrap();
    assert_eq!(billed.status, "INVOICED");
    let warning = billed.warning.unwrap();
    assert_eq!(warning.expected, dec!(700));
    assert_eq!(warning.invoiced, dec!(720));
    assert_eq!(billed.posting.unwrap().total_base, dec!(720));

    let paid = ctx
        .service
        .pay_purchase_order(company_id, order_id, Some(date(2026, 6, 30)))
        .await
        .unwrap();
    assert_eq!(paid.status, "PAID");
    assert_eq!(paid.posting.unwrap().total_base, dec!(720));

    let trial = ctx.service.trial_balance(company_id, None).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.row("1200").unwrap().balance, dec!(500));
    assert_eq!(trial.row("2000").unwrap().balance, Decimal::ZERO);
    assert_eq!(trial.row("2100").unwrap().balance, Decimal::ZERO);
    assert_eq!(trial.row("5100").unwrap().balance, dec!(200));
    assert_eq!(trial.row("5200").unwrap().balance, dec!(20));
    assert_eq!(trial.row("1000").unwrap().balance, dec!(-720));

    let level = ctx
        .service
        .stock_level(company_id, ctx.company.stock_product_id, ctx.company.warehouse_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.qty_on_hand, dec!(10));
    assert_eq!(level.unit_cost, dec!(50));
}

#[tokio::test]
async fn test_foreign_currency_purchase_clears_grni() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let company_id = ctx.company.company_id;
    let order = NewOrder {
        company_id,
        party_code: VENDOR_CODE.to_string(),
        branch_id: None,
        currency: "USD".to_string(),
        exchange_rate: dec!(80),
        order_date: date(2026, 7, 1),
        lines: vec![OrderLineInput {
            product_id: ctx.company.stock_product_id,
            warehouse_id: ctx.company.warehouse_id,
            quantity: dec!(5),
            unit_price: dec!(10),
        }],
    };
    let order_id = ctx.service.create_purchase_order(&order).await.unwrap();
    let approved = ctx.service.approve_purchase_order(company_id, order_id).await.unwrap();
    assert_eq!(approved.document_number.as_deref(), Some("PO-2026-000001"));
    let lines = line_ids(&ctx, order_id).await;

    let received = ctx
        .service
        .receive_purchase_order(
            company_id,
            order_id,
            &[ReceiptLineInput { line_id: lines[0], quantity: dec!(5) }],
            Some(date(2026, 7, 2)),
        )
        .await
        .unwrap();
    assert_eq!(received.posting.unwrap().total_base, dec!(4000));

    let billed = ctx
        .service
        .invoice_purchase_order(company_id, order_id, None, Some(date(2026, 7, 3)))
        .await
        .unwrap();
    assert!(billed.warning.is_none());
    assert_eq!(billed.posting.unwrap().total_base, dec!(4000));

    let grni = ctx.service.account_balance(company_id, "2100").await.unwrap();
    assert_eq!(grni.balance, Decimal::ZERO);
    let level = ctx
        .service
        .stock_level(company_id, ctx.company.stock_product_id, ctx.company.warehouse_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(level.unit_cost, dec!(800));
}

#[tokio::test]
async fn test_foreign_bill_with_uneven_rate_leaves_no_grni() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let company_id = ctx.company.company_id;
    let order = NewOrder {
        company_id,
        party_code: VENDOR_CODE.to_string(),
        branch_id: None,
        currency: "USD".to_string(),
        exchange_rate: dec!(83.123457),
        order_date: date(2026, 8, 1),
        lines: vec![OrderLineInput {
            product_id: ctx.company.stock_product_id,
            warehouse_id: ctx.company.warehouse_id,
            quantity: dec!(1000),
            unit_price: dec!(0.3333),
        }],
    };
    let order_id = ctx.service.create_purchase_order(&order).await.unwrap();
    ctx.service.approve_purchase_order(company_id, order_id).await.unwrap();
    let lines = line_ids(&ctx, order_id).await;

    let received = ctx
        .service
        .receive_purchase_order(
            company_id,
            order_id,
            &[ReceiptLineInput { line_id: lines[0], quantity: dec!(1000) }],
            Some(date(2026, 8, 2)),
        )
        .await
        .unwrap();
    assert_eq!(received.posting.unwrap().total_base, dec!(27705.048));

    let billed = ctx
        .service
        .invoice_purchase_order(company_id, order_id, None, Some(date(2026, 8, 3)))
        .await
        .unwrap();
    assert!(billed.warning.is_none());
    assert_eq!(billed.posting.unwrap().total_base, dec!(27705.0482));

    let paid = ctx
        .service
        .pay_purchase_order(company_id, order_id, Some(date(2026, 8, 4)))
        .await
        .unwrap();
    assert_eq!(paid.posting.unwrap().total_base, dec!(27705.0482));

    let trial = ctx.service.trial_balance(company_id, None).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.row("2100").unwrap().balance, Decimal::ZERO);
    assert_eq!(trial.row("2000").unwrap().balance, Decimal::ZERO);
    assert_eq!(trial.row("5200").unwrap().balance, dec!(0.0002));
}

#[tokio::test]
async fn test_order_price_beyond_ledger_scale_is_rejected() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let order = sales_order(&ctx, dec!(3), dec!(0.33333));
    let err = ctx.service.create_sales_order(&order).await.unwrap_err();
    assert_eq!(err.error_code(), "LINE_PRICE_PRECISION");

    let order = sales_order(&ctx, dec!(1000000000), dec!(1000000));
    let err = ctx.service.create_sales_order(&order).await.unwrap_err();
    assert_eq!(err.error_code(), "LINE_VALUE_OUT_OF_RANGE");
}

#[tokio::test]
async fn test_base_currency_order_needs_unit_rate() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let mut order = sales_order(&ctx, dec!(1), dec!(1));
    order.exchange_rate = dec!(1.5);
    let err = ctx.service.create_sales_order(&order).await.unwrap_err();
    assert_eq!(err.error_code(), "BASE_CURRENCY_RATE");
}
