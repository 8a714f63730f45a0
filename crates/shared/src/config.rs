//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Ledger posting configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Logging configuration.
    #[serde(default)]
    pub log: LogConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
    /// Optional `lock_timeout` applied to every service transaction.
    ///
    /// `None` keeps the PostgreSQL default: row-lock waits block until the
    /// holder commits or rolls back.
    #[serde(default)]
    pub lock_timeout_ms: Option<u64>,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Ledger posting configuration used by the order state machines.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Account codes the order/procurement postings use.
    #[serde(default)]
    pub accounts: PostingAccounts,
    /// Allowed deviation (percent of the order total) between a vendor
    /// invoice and its purchase order before a warning is raised.
    #[serde(default = "default_invoice_tolerance_pct")]
    pub invoice_tolerance_pct: Decimal,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            accounts: PostingAccounts::default(),
            invoice_tolerance_pct: default_invoice_tolerance_pct(),
        }
    }
}

fn default_invoice_tolerance_pct() -> Decimal {
    Decimal::new(2, 0)
}

/// Chart-of-accounts codes used by order and procurement postings.
///
/// These are codes, not IDs: they are resolved per company through the same
/// path as any untrusted proposal.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PostingAccounts {
    /// Bank / cash account.
    pub bank: String,
    /// Accounts receivable.
    pub receivable: String,
    /// Inventory asset.
    pub inventory: String,
    /// Accounts payable.
    pub payable: String,
    /// Goods received not invoiced (accrued liability).
    pub goods_received_not_invoiced: String,
    /// Sales revenue.
    pub revenue: String,
    /// Cost of goods sold.
    pub cost_of_goods_sold: String,
    /// Expense for purchased services.
    pub purchase_expense: String,
    /// Purchase price variance between invoice and receipt value.
    pub purchase_price_variance: String,
}

impl Default for PostingAccounts {
    fn default() -> Self {
        Self {
            bank: "1000".to_string(),
            receivable: "1100".to_string(),
            inventory: "1200".to_string(),
            payable: "2000".to_string(),
            goods_received_not_invoiced: "2100".to_string(),
            revenue: "4000".to_string(),
            cost_of_goods_sold: "5000".to_string(),
            purchase_expense: "5100".to_string(),
            purchase_price_variance: "5200".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}

fn default_log_filter() -> String {
    "tally=info,sea_orm=warn".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Sources, later ones winning: `config/default.toml`,
    /// `config/{RUN_MODE}.toml`, then `TALLY__SECTION__KEY` variables.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        dotenvy::dotenv().ok();
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("TALLY").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_from_environment() {
        temp_env::with_vars(
            [
                ("TALLY__DATABASE__URL", Some("postgres://localhost/tally_test")),
                ("TALLY__DATABASE__LOCK_TIMEOUT_MS", Some("5000")),
                ("TALLY__LEDGER__ACCOUNTS__BANK", Some("1010")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.database.url, "postgres://localhost/tally_test");
                assert_eq!(config.database.lock_timeout_ms, Some(5000));
                assert_eq!(config.database.max_connections, 10);
                assert_eq!(config.ledger.accounts.bank, "1010");
                assert_eq!(config.ledger.accounts.receivable, "1100");
            },
        );
    }

    #[test]
    fn test_ledger_defaults() {
        let ledger = LedgerConfig::default();
        assert_eq!(ledger.invoice_tolerance_pct, Decimal::new(2, 0));
        assert_eq!(ledger.accounts.cost_of_goods_sold, "5000");
        assert_eq!(LogConfig::default().filter, "tally=info,sea_orm=warn");
    }
}
