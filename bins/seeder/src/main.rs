//! Demo data seeder for Tally.
//!
//! Creates the `DEMO` company with its chart of accounts and master data,
//! books an owner capital injection and receives opening stock. Running it
//! twice is harmless: an existing `DEMO` company is left alone.
//!
//! Usage: cargo run --bin tally-seeder

use anyhow::Context;
use rust_decimal::Decimal;
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter};
use tally_core::ledger::Proposal;
use tally_core::numbering::DocumentType;
use tally_db::entities::companies;
use tally_db::seed::{CompanySeed, OPENING_EQUITY};
use tally_db::{AppService, StockReceipt};
use tally_shared::{AppConfig, LogConfig};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

const DEMO_CODE: &str = "DEMO";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.log)?;

    let db = tally_db::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to database");

    let existing = companies::Entity::find()
        .filter(companies::Column::Code.eq(DEMO_CODE))
        .one(&db)
        .await?;
    if existing.is_some() {
        info!(company = DEMO_CODE, "Demo company already exists, skipping");
        return Ok(());
    }

    let seed = CompanySeed {
        code: DEMO_CODE.to_string(),
        name: "Demo Trading Co".to_string(),
        base_currency: "INR".to_string(),
        fiscal_year_start_month: 4,
    };
    let company = seed.insert(&db).await.context("failed to seed master data")?;
    info!(company = DEMO_CODE, company_id = %company.company_id, "Seeded master data");

    let service = AppService::new(db, &config);

    let capital = Proposal::new(DocumentType::JournalEntry, DEMO_CODE, "seed:capital", "INR")
        .narrated("Owner capital")
        .debit(&config.ledger.accounts.bank, Decimal::new(500_000, 0))
        .credit(OPENING_EQUITY, Decimal::new(500_000, 0));
    let outcome = service.commit_entry(&capital).await?;
    info!(number = %outcome.document_number, "Booked owner capital");

    let opening = StockReceipt {
        product_id: company.stock_product_id,
        warehouse_id: company.warehouse_id,
        quantity: Decimal::new(100, 0),
        unit_cost: Decimal::new(250, 0),
        offset_account: OPENING_EQUITY.to_string(),
        idempotency_key: "seed:opening-stock".to_string(),
        date: None,
        narration: "Opening stock".to_string(),
    };
    let stock = service.receive_stock(company.company_id, &opening).await?;
    if let Some(change) = stock.change {
        info!(
            on_hand = %change.level.qty_on_hand,
            unit_cost = %change.level.unit_cost,
            "Received opening stock"
        );
    }

    info!("Seeding complete");
    Ok(())
}

fn init_tracing(log: &LogConfig) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new(&log.filter))?;

    if log.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()?;
    }
    Ok(())
}
