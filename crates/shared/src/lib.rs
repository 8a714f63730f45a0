//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Typed IDs for type-safe entity references
//! - ISO-4217 style currency codes
//! - The five-class error taxonomy every engine reports into
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::{AppConfig, DatabaseConfig, LedgerConfig, LogConfig, PostingAccounts};
pub use error::{AppError, AppResult, ErrorKind};
