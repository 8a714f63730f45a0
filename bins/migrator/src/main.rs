//! Schema migration runner for Tally.
//!
//! Usage:
//!   tally-migrator up      - Apply pending migrations
//!   tally-migrator down    - Roll back the last migration
//!   tally-migrator status  - List applied and pending migrations
//!   tally-migrator fresh   - Drop everything and migrate from scratch
//!
//! Reads `DATABASE_URL` (a `.env` file is honoured).

use sea_orm_migration::prelude::*;
use tally_db::migration::Migrator;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // The CLI installs its own subscriber.
    cli::run_cli(Migrator).await;
}
