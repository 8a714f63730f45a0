//! Double-entry bookkeeping logic.
//!
//! This module implements the pure half of the ledger:
//! - Proposal normalization and validation
//! - Account and base-currency resolution
//! - Reversal mirroring
//! - Balance, trial balance and statement calculations
//! - Error types for ledger operations

pub mod balance;
pub mod error;
pub mod proposal;
pub mod reversal;
pub mod service;
pub mod types;
pub mod validation;

#[cfg(test)]
mod service_props;
#[cfg(test)]
mod validation_props;

pub use balance::{AccountBalance, AccountStatement, StatementEntry, StatementLine, TrialBalance};
pub use error::LedgerError;
pub use proposal::{NormalizedLine, NormalizedProposal, Proposal, ProposalLine};
pub use reversal::ReversalService;
pub use service::LedgerService;
pub use types::{
    AccountInfo, AccountType, CommitOutcome, EntrySide, EntryTotals, PostedLine, ResolvedEntry,
    ResolvedLine, ValidatedLine, ValidatedProposal,
};
pub use validation::validate;
