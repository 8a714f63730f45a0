//! Demo master data.
//!
//! Creates a company with a chart of accounts matching the default
//! `PostingAccounts` codes, plus one branch, one warehouse, a stock product,
//! a service product, a customer and a vendor. Used by the seeder binary and
//! by the integration tests.

use sea_orm::{ActiveModelTrait, ActiveValue::Set, ConnectionTrait, DbErr};
use tally_shared::types::{BranchId, CompanyId, ProductId, WarehouseId};
use uuid::Uuid;

use crate::entities::{accounts, branches, companies, customers, products, vendors, warehouses};

/// Chart of accounts: code, name, type.
pub const CHART_OF_ACCOUNTS: &[(&str, &str, &str)] = &[
    ("1000", "Bank", "asset"),
    ("1100", "Accounts Receivable", "asset"),
    ("1200", "Inventory", "asset"),
    ("2000", "Accounts Payable", "liability"),
    ("2100", "Goods Received Not Invoiced", "liability"),
    ("3000", "Owner Equity", "equity"),
    ("4000", "Sales Revenue", "revenue"),
    ("5000", "Cost of Goods Sold", "expense"),
    ("5100", "Purchased Services", "expense"),
    ("5200", "Purchase Price Variance", "expense"),
    ("5300", "Inventory Adjustments", "expense"),
];

/// Equity account used as the offset of opening stock.
pub const OPENING_EQUITY: &str = "3000";
/// Expense account used as the offset of count corrections.
pub const ADJUSTMENT_EXPENSE: &str = "5300";
/// Customer code of the demo customer.
pub const CUSTOMER_CODE: &str = "CUST-001";
/// Vendor code of the demo vendor.
pub const VENDOR_CODE: &str = "VEND-001";
/// Branch code of the demo branch.
pub const BRANCH_CODE: &str = "HQ";

/// What to create.
#[derive(Debug, Clone)]
pub struct CompanySeed {
    /// Unique company code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Base currency.
    pub base_currency: String,
    /// First month of the fiscal year.
    pub fiscal_year_start_month: i32,
}

/// IDs of the seeded rows.
#[derive(Debug, Clone)]
pub struct SeededCompany {
    /// Company.
    pub company_id: CompanyId,
    /// Company code.
    pub code: String,
    /// `HQ` branch.
    pub branch_id: BranchId,
    /// Main warehouse.
    pub warehouse_id: WarehouseId,
    /// Product carrying stock.
    pub stock_product_id: ProductId,
    /// Product without stock.
    pub service_product_id: ProductId,
}

impl CompanySeed {
    /// Inserts the company and its master data.
    ///
    /// # Errors
    ///
    /// Returns a database error, e.g. if the company code is taken.
    pub async fn insert<C: ConnectionTrait>(&self, db: &C) -> Result<SeededCompany, DbErr> {
        let company_id = Uuid::now_v7();
        companies::ActiveModel {
            id: Set(company_id),
            code: Set(self.code.clone()),
            name: Set(self.name.clone()),
            base_currency: Set(self.base_currency.clone()),
            fiscal_year_start_month: Set(self.fiscal_year_start_month),
            ..Default::default()
        }
        .insert(db)
        .await?;

        for (code, name, account_type) in CHART_OF_ACCOUNTS {
            accounts::ActiveModel {
                id: Set(Uuid::now_v7()),
                company_id: Set(company_id),
                code: Set((*code).to_string()),
                name: Set((*name).to_string()),
                account_type: Set((*account_type).to_string()),
                is_active: Set(true),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }

        let branch_id = Uuid::now_v7();
        branches::ActiveModel {
            id: Set(branch_id),
            company_id: Set(company_id),
            code: Set(BRANCH_CODE.to_string()),
            name: Set("Head Office".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let warehouse_id = Uuid::now_v7();
        warehouses::ActiveModel {
            id: Set(warehouse_id),
            company_id: Set(company_id),
            code: Set("MAIN".to_string()),
            name: Set("Main Warehouse".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        let stock_product_id = Uuid::now_v7();
        let service_product_id = Uuid::now_v7();
        for (id, sku, name, is_stock_item) in [
            (stock_product_id, "WIDGET", "Widget", true),
            (service_product_id, "INSTALL", "Installation", false),
        ] {
            products::ActiveModel {
                id: Set(id),
                company_id: Set(company_id),
                sku: Set(sku.to_string()),
                name: Set(name.to_string()),
                is_stock_item: Set(is_stock_item),
                ..Default::default()
            }
            .insert(db)
            .await?;
        }

        customers::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(company_id),
            code: Set(CUSTOMER_CODE.to_string()),
            name: Set("Demo Customer".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        vendors::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_id: Set(company_id),
            code: Set(VENDOR_CODE.to_string()),
            name: Set("Demo Vendor".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await?;

        Ok(SeededCompany {
            company_id: CompanyId::from_uuid(company_id),
            code: self.code.clone(),
            branch_id: BranchId::from_uuid(branch_id),
            warehouse_id: WarehouseId::from_uuid(warehouse_id),
            stock_product_id: ProductId::from_uuid(stock_product_id),
            service_product_id: ProductId::from_uuid(service_product_id),
        })
    }
}
