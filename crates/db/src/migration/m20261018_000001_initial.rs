//! Initial database migration.
//!
//! Creates the tenant masters, the ledger and numbering tables, stock tables,
//! order tables and the triggers that keep posted history immutable.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: TENANTS & MASTERS
        // ============================================================
        db.execute_unprepared(COMPANIES_SQL).await?;
        db.execute_unprepared(BRANCHES_SQL).await?;
        db.execute_unprepared(ACCOUNTS_SQL).await?;
        db.execute_unprepared(PARTIES_SQL).await?;
        db.execute_unprepared(PRODUCTS_SQL).await?;

        // ============================================================
        // PART 2: DOCUMENTS & NUMBERING
        // ============================================================
        db.execute_unprepared(DOCUMENTS_SQL).await?;
        db.execute_unprepared(DOCUMENT_SEQUENCES_SQL).await?;

        // ============================================================
        // PART 3: LEDGER
        // ============================================================
        db.execute_unprepared(JOURNAL_ENTRIES_SQL).await?;
        db.execute_unprepared(JOURNAL_LINES_SQL).await?;

        // ============================================================
        // PART 4: INVENTORY
        // ============================================================
        db.execute_unprepared(INVENTORY_SQL).await?;

        // ============================================================
        // PART 5: ORDERS & RECEIPTS
        // ============================================================
        db.execute_unprepared(SALES_ORDERS_SQL).await?;
        db.execute_unprepared(PURCHASE_ORDERS_SQL).await?;
        db.execute_unprepared(GOODS_RECEIPTS_SQL).await?;

        // ============================================================
        // PART 6: TRIGGERS & FUNCTIONS
        // ============================================================
        db.execute_unprepared(TRIGGERS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const COMPANIES_SQL: &str = r"
CREATE TABLE companies (
    id UUID PRIMARY KEY,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    base_currency CHAR(3) NOT NULL,
    fiscal_year_start_month INTEGER NOT NULL DEFAULT 1,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_companies_code UNIQUE (code),
    CONSTRAINT chk_companies_base_currency CHECK (base_currency ~ '^[A-Z]{3}$'),
    CONSTRAINT chk_companies_fiscal_start CHECK (fiscal_year_start_month BETWEEN 1 AND 12)
);
";

const BRANCHES_SQL: &str = r"
CREATE TABLE branches (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    code VARCHAR(16) NOT NULL,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_branches_code UNIQUE (company_id, code)
);
";

const ACCOUNTS_SQL: &str = r"
CREATE TABLE accounts (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    code VARCHAR(20) NOT NULL,
    name VARCHAR(255) NOT NULL,
    account_type VARCHAR(16) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounts_code UNIQUE (company_id, code),
    CONSTRAINT chk_accounts_type CHECK (
        account_type IN ('asset', 'liability', 'equity', 'revenue', 'expense')
    )
);

CREATE INDEX idx_accounts_company ON accounts(company_id) WHERE is_active = true;
";

const PARTIES_SQL: &str = r"
CREATE TABLE customers (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_customers_code UNIQUE (company_id, code)
);

CREATE TABLE vendors (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_vendors_code UNIQUE (company_id, code)
);
";

const PRODUCTS_SQL: &str = r"
CREATE TABLE products (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    sku VARCHAR(64) NOT NULL,
    name VARCHAR(255) NOT NULL,
    is_stock_item BOOLEAN NOT NULL DEFAULT true,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_products_sku UNIQUE (company_id, sku)
);

CREATE TABLE warehouses (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    code VARCHAR(32) NOT NULL,
    name VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_warehouses_code UNIQUE (company_id, code)
);
";

const DOCUMENTS_SQL: &str = r"
CREATE TABLE documents (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    document_type VARCHAR(8) NOT NULL,
    status VARCHAR(20) NOT NULL,
    document_number VARCHAR(64),
    fiscal_year INTEGER NOT NULL DEFAULT 0,
    branch_id UUID REFERENCES branches(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

-- Drafts carry no number, so any number of them coexist.
CREATE UNIQUE INDEX uq_documents_number ON documents (
    company_id,
    document_type,
    fiscal_year,
    COALESCE(branch_id, '00000000-0000-0000-0000-000000000000'::uuid),
    document_number
) WHERE document_number IS NOT NULL;

CREATE INDEX idx_documents_company_type ON documents(company_id, document_type);
";

const DOCUMENT_SEQUENCES_SQL: &str = r"
CREATE TABLE document_sequences (
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    document_type VARCHAR(8) NOT NULL,
    fiscal_year INTEGER NOT NULL,
    branch_id UUID NOT NULL,
    last_number BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (company_id, document_type, fiscal_year, branch_id),
    CONSTRAINT chk_sequences_non_negative CHECK (last_number >= 0)
);
";

const JOURNAL_ENTRIES_SQL: &str = r"
CREATE TABLE journal_entries (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    document_id UUID NOT NULL REFERENCES documents(id),
    posting_date DATE NOT NULL,
    document_date DATE NOT NULL,
    narration TEXT NOT NULL DEFAULT '',
    reasoning TEXT,
    idempotency_key VARCHAR(255) NOT NULL,
    reversed_entry_id UUID REFERENCES journal_entries(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_journal_entries_document UNIQUE (document_id),
    CONSTRAINT uq_journal_entries_idempotency_key UNIQUE (idempotency_key),
    CONSTRAINT uq_journal_entries_reversed_entry UNIQUE (reversed_entry_id)
);

CREATE INDEX idx_journal_entries_company_date ON journal_entries(company_id, posting_date);
";

const JOURNAL_LINES_SQL: &str = r"
CREATE TABLE journal_lines (
    id UUID PRIMARY KEY,
    entry_id UUID NOT NULL REFERENCES journal_entries(id),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    line_no INTEGER NOT NULL,
    account_id UUID NOT NULL REFERENCES accounts(id),
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC(28, 10) NOT NULL,
    amount NUMERIC NOT NULL,
    debit_base NUMERIC(19, 4) NOT NULL DEFAULT 0,
    credit_base NUMERIC(19, 4) NOT NULL DEFAULT 0,
    CONSTRAINT uq_journal_lines_position UNIQUE (entry_id, line_no),
    CONSTRAINT chk_journal_lines_one_side CHECK (
        (debit_base > 0 AND credit_base = 0) OR (debit_base = 0 AND credit_base > 0)
    ),
    CONSTRAINT chk_journal_lines_sign CHECK (
        (debit_base > 0 AND amount > 0) OR (credit_base > 0 AND amount < 0)
    ),
    CONSTRAINT chk_journal_lines_rate_positive CHECK (exchange_rate > 0)
);

CREATE INDEX idx_journal_lines_entry ON journal_lines(entry_id);
CREATE INDEX idx_journal_lines_account ON journal_lines(company_id, account_id);
";

const INVENTORY_SQL: &str = r"
CREATE TABLE inventory_items (
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    product_id UUID NOT NULL REFERENCES products(id),
    warehouse_id UUID NOT NULL REFERENCES warehouses(id),
    qty_on_hand NUMERIC NOT NULL DEFAULT 0,
    qty_reserved NUMERIC NOT NULL DEFAULT 0,
    unit_cost NUMERIC(19, 6) NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (company_id, product_id, warehouse_id),
    CONSTRAINT chk_inventory_on_hand CHECK (qty_on_hand >= 0),
    CONSTRAINT chk_inventory_reserved CHECK (qty_reserved >= 0),
    CONSTRAINT chk_inventory_reserved_le_on_hand CHECK (qty_reserved <= qty_on_hand),
    CONSTRAINT chk_inventory_cost CHECK (unit_cost >= 0)
);

CREATE TABLE inventory_movements (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL,
    product_id UUID NOT NULL,
    warehouse_id UUID NOT NULL,
    movement_type VARCHAR(24) NOT NULL,
    quantity NUMERIC NOT NULL,
    unit_cost NUMERIC(19, 6) NOT NULL,
    value NUMERIC(19, 4) NOT NULL DEFAULT 0,
    source_document_id UUID REFERENCES documents(id),
    source_line_id UUID,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    FOREIGN KEY (company_id, product_id, warehouse_id)
        REFERENCES inventory_items(company_id, product_id, warehouse_id),
    CONSTRAINT chk_movements_type CHECK (
        movement_type IN ('receipt', 'reservation', 'reservation_cancel', 'shipment', 'adjustment')
    ),
    CONSTRAINT chk_movements_quantity CHECK (quantity <> 0)
);

CREATE INDEX idx_movements_item ON inventory_movements(company_id, product_id, warehouse_id, created_at);
CREATE INDEX idx_movements_source ON inventory_movements(source_document_id)
    WHERE source_document_id IS NOT NULL;
";

const SALES_ORDERS_SQL: &str = r"
CREATE TABLE sales_orders (
    document_id UUID PRIMARY KEY REFERENCES documents(id),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    customer_id UUID NOT NULL REFERENCES customers(id),
    branch_id UUID REFERENCES branches(id),
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC(28, 10) NOT NULL,
    order_date DATE NOT NULL,
    total NUMERIC(19, 4) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_sales_orders_rate CHECK (exchange_rate > 0)
);

CREATE TABLE sales_order_lines (
    id UUID PRIMARY KEY,
    order_id UUID NOT NULL REFERENCES sales_orders(document_id),
    line_no INTEGER NOT NULL,
    product_id UUID NOT NULL REFERENCES products(id),
    warehouse_id UUID NOT NULL REFERENCES warehouses(id),
    quantity NUMERIC NOT NULL,
    unit_price NUMERIC(19, 4) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    CONSTRAINT uq_sales_order_lines_position UNIQUE (order_id, line_no),
    CONSTRAINT chk_sales_order_lines_quantity CHECK (quantity > 0),
    CONSTRAINT chk_sales_order_lines_price CHECK (unit_price >= 0)
);
";

const PURCHASE_ORDERS_SQL: &str = r"
CREATE TABLE purchase_orders (
    document_id UUID PRIMARY KEY REFERENCES documents(id),
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    vendor_id UUID NOT NULL REFERENCES vendors(id),
    branch_id UUID REFERENCES branches(id),
    currency CHAR(3) NOT NULL,
    exchange_rate NUMERIC(28, 10) NOT NULL,
    order_date DATE NOT NULL,
    total NUMERIC(19, 4) NOT NULL,
    invoiced_amount NUMERIC(19, 4),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_purchase_orders_rate CHECK (exchange_rate > 0)
);

CREATE TABLE purchase_order_lines (
    id UUID PRIMARY KEY,
    order_id UUID NOT NULL REFERENCES purchase_orders(document_id),
    line_no INTEGER NOT NULL,
    product_id UUID NOT NULL REFERENCES products(id),
    warehouse_id UUID NOT NULL REFERENCES warehouses(id),
    quantity NUMERIC NOT NULL,
    unit_cost NUMERIC(19, 4) NOT NULL,
    amount NUMERIC(19, 4) NOT NULL,
    CONSTRAINT uq_purchase_order_lines_position UNIQUE (order_id, line_no),
    CONSTRAINT chk_purchase_order_lines_quantity CHECK (quantity > 0),
    CONSTRAINT chk_purchase_order_lines_cost CHECK (unit_cost >= 0)
);
";

const GOODS_RECEIPTS_SQL: &str = r"
CREATE TABLE goods_receipts (
    id UUID PRIMARY KEY,
    company_id UUID NOT NULL REFERENCES companies(id) ON DELETE CASCADE,
    order_id UUID NOT NULL REFERENCES purchase_orders(document_id),
    receipt_date DATE NOT NULL,
    journal_entry_id UUID REFERENCES journal_entries(id),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now()
);

CREATE TABLE goods_receipt_lines (
    id UUID PRIMARY KEY,
    receipt_id UUID NOT NULL REFERENCES goods_receipts(id),
    order_line_id UUID NOT NULL REFERENCES purchase_order_lines(id),
    quantity NUMERIC NOT NULL,
    unit_cost_base NUMERIC(19, 6) NOT NULL,
    value NUMERIC(19, 4) NOT NULL,
    CONSTRAINT chk_goods_receipt_lines_quantity CHECK (quantity > 0)
);

CREATE INDEX idx_goods_receipts_order ON goods_receipts(order_id);
CREATE INDEX idx_goods_receipt_lines_order_line ON goods_receipt_lines(order_line_id);
";

const TRIGGERS_SQL: &str = r"
-- ============================================================
-- FUNCTION: check_entry_balance
-- Base debits must equal base credits once the transaction commits
-- ============================================================
CREATE OR REPLACE FUNCTION check_entry_balance()
RETURNS TRIGGER AS $$
DECLARE
    total_debit NUMERIC(19, 4);
    total_credit NUMERIC(19, 4);
    line_count INTEGER;
BEGIN
    SELECT
        COALESCE(SUM(debit_base), 0),
        COALESCE(SUM(credit_base), 0),
        COUNT(*)
    INTO total_debit, total_credit, line_count
    FROM journal_lines
    WHERE entry_id = NEW.entry_id;

    IF line_count < 2 THEN
        RAISE EXCEPTION 'Journal entry % has fewer than two lines', NEW.entry_id;
    END IF;

    IF total_debit <> total_credit THEN
        RAISE EXCEPTION 'Journal entry % is not balanced. Debit: %, Credit: %',
            NEW.entry_id, total_debit, total_credit;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE CONSTRAINT TRIGGER trg_check_entry_balance
AFTER INSERT ON journal_lines
DEFERRABLE INITIALLY DEFERRED
FOR EACH ROW
EXECUTE FUNCTION check_entry_balance();

-- ============================================================
-- FUNCTION: prevent_append_only_modification
-- Posted ledger rows and stock movements are never changed
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_append_only_modification()
RETURNS TRIGGER AS $$
BEGIN
    RAISE EXCEPTION 'Table % is append-only. Post a compensating record instead.', TG_TABLE_NAME;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_journal_entries_append_only
BEFORE UPDATE OR DELETE ON journal_entries
FOR EACH ROW
EXECUTE FUNCTION prevent_append_only_modification();

CREATE TRIGGER trg_journal_lines_append_only
BEFORE UPDATE OR DELETE ON journal_lines
FOR EACH ROW
EXECUTE FUNCTION prevent_append_only_modification();

CREATE TRIGGER trg_inventory_movements_append_only
BEFORE UPDATE OR DELETE ON inventory_movements
FOR EACH ROW
EXECUTE FUNCTION prevent_append_only_modification();

-- ============================================================
-- FUNCTION: protect_referenced_account
-- An account referenced by a posted line keeps its identity
-- ============================================================
CREATE OR REPLACE FUNCTION protect_referenced_account()
RETURNS TRIGGER AS $$
BEGIN
    IF (NEW.code <> OLD.code
        OR NEW.account_type <> OLD.account_type
        OR NEW.company_id <> OLD.company_id)
       AND EXISTS (SELECT 1 FROM journal_lines WHERE account_id = OLD.id) THEN
        RAISE EXCEPTION 'Account % is referenced by posted lines and cannot change', OLD.code;
    END IF;

    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_protect_referenced_account
BEFORE UPDATE ON accounts
FOR EACH ROW
EXECUTE FUNCTION protect_referenced_account();

-- ============================================================
-- FUNCTION: prevent_renumbering
-- A document number, once assigned, is permanent
-- ============================================================
CREATE OR REPLACE FUNCTION prevent_renumbering()
RETURNS TRIGGER AS $$
BEGIN
    IF OLD.document_number IS NOT NULL
       AND NEW.document_number IS DISTINCT FROM OLD.document_number THEN
        RAISE EXCEPTION 'Document % is already numbered %', OLD.id, OLD.document_number;
    END IF;

    NEW.updated_at := now();
    RETURN NEW;
END;
$$ LANGUAGE plpgsql;

CREATE TRIGGER trg_prevent_renumbering
BEFORE UPDATE ON documents
FOR EACH ROW
EXECUTE FUNCTION prevent_renumbering();
";

const DROP_ALL_SQL: &str = r"
-- ============================================================
-- DROP ALL: Rollback migration
-- Order matters due to foreign key constraints
-- ============================================================

-- Drop triggers
DROP TRIGGER IF EXISTS trg_prevent_renumbering ON documents;
DROP TRIGGER IF EXISTS trg_protect_referenced_account ON accounts;
DROP TRIGGER IF EXISTS trg_inventory_movements_append_only ON inventory_movements;
DROP TRIGGER IF EXISTS trg_journal_lines_append_only ON journal_lines;
DROP TRIGGER IF EXISTS trg_journal_entries_append_only ON journal_entries;
DROP TRIGGER IF EXISTS trg_check_entry_balance ON journal_lines;

-- Drop functions
DROP FUNCTION IF EXISTS prevent_renumbering();
DROP FUNCTION IF EXISTS protect_referenced_account();
DROP FUNCTION IF EXISTS prevent_append_only_modification();
DROP FUNCTION IF EXISTS check_entry_balance();

-- Drop tables (reverse order of creation)
DROP TABLE IF EXISTS goods_receipt_lines CASCADE;
DROP TABLE IF EXISTS goods_receipts CASCADE;
DROP TABLE IF EXISTS purchase_order_lines CASCADE;
DROP TABLE IF EXISTS purchase_orders CASCADE;
DROP TABLE IF EXISTS sales_order_lines CASCADE;
DROP TABLE IF EXISTS sales_orders CASCADE;
DROP TABLE IF EXISTS inventory_movements CASCADE;
DROP TABLE IF EXISTS inventory_items CASCADE;
DROP TABLE IF EXISTS journal_lines CASCADE;
DROP TABLE IF EXISTS journal_entries CASCADE;
DROP TABLE IF EXISTS document_sequences CASCADE;
DROP TABLE IF EXISTS documents CASCADE;
DROP TABLE IF EXISTS warehouses CASCADE;
DROP TABLE IF EXISTS products CASCADE;
DROP TABLE IF EXISTS vendors CASCADE;
DROP TABLE IF EXISTS customers CASCADE;
DROP TABLE IF EXISTS accounts CASCADE;
DROP TABLE IF EXISTS branches CASCADE;
DROP TABLE IF EXISTS companies CASCADE;
";
