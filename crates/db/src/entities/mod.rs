//! `SeaORM` entities, one module per table.

pub mod accounts;
pub mod branches;
pub mod companies;
pub mod customers;
pub mod document_sequences;
pub mod documents;
pub mod goods_receipt_lines;
pub mod goods_receipts;
pub mod inventory_items;
pub mod inventory_movements;
pub mod journal_entries;
pub mod journal_lines;
pub mod products;
pub mod purchase_order_lines;
pub mod purchase_orders;
pub mod sales_order_lines;
pub mod sales_orders;
pub mod vendors;
pub mod warehouses;
