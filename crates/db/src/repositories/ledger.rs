//! Ledger repository.
//!
//! The sole writer of `journal_entries` and `journal_lines`. Every entry is
//! resolved against the company's own accounts, numbered through
//! `NumberingRepository` and written together with its lines inside one
//! transaction.

use std::collections::HashMap;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr,
    EntityTrait, QueryFilter, QueryOrder, QuerySelect, SqlErr,
};
use tally_core::ledger::{
    AccountInfo, AccountType, CommitOutcome, LedgerError, LedgerService, PostedLine, Proposal,
    ResolvedEntry, ReversalService,
};
use tally_core::numbering::DocumentType;
use tally_shared::types::{AccountId, BranchId, CompanyId, CurrencyCode, DocumentId, JournalEntryId};
use tracing::{info, warn};
use uuid::Uuid;

use super::numbering::NumberingRepository;
use crate::entities::{accounts, branches, companies, documents, journal_entries, journal_lines};
use crate::txn;

/// Status of a document envelope that carries a journal entry.
pub const POSTED_STATUS: &str = "POSTED";

const IDEMPOTENCY_CONSTRAINT: &str = "uq_journal_entries_idempotency_key";
const REVERSAL_CONSTRAINT: &str = "uq_journal_entries_reversed_entry";

pub(crate) fn db_err(err: DbErr) -> LedgerError {
    LedgerError::Database(err.to_string())
}

/// Maps a failed entry insert, turning lost races on the unique keys into
/// their domain errors.
fn entry_insert_error(err: DbErr, idempotency_key: &str, reversed: Option<Uuid>) -> LedgerError {
    if let Some(SqlErr::UniqueConstraintViolation(message)) = err.sql_err() {
        if message.contains(IDEMPOTENCY_CONSTRAINT) {
            return LedgerError::DuplicateSubmission(idempotency_key.to_string());
        }
        if let Some(original) = reversed
            && message.contains(REVERSAL_CONSTRAINT)
        {
            return LedgerError::AlreadyReversed(original);
        }
    }
    db_err(err)
}

/// A proposal resolved against one company, ready to insert.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The company the proposal names.
    pub company: companies::Model,
    /// Branch used for numbering, if the proposal names one.
    pub branch_id: Option<Uuid>,
    /// Lines with account IDs and base amounts.
    pub entry: ResolvedEntry,
}

/// One line to insert.
struct NewLine {
    account_id: Uuid,
    currency: String,
    exchange_rate: Decimal,
    amount: Decimal,
    debit_base: Decimal,
    credit_base: Decimal,
}

/// Everything needed to write a numbered entry.
struct NewEntry<'a> {
    document_type: DocumentType,
    branch_id: Option<Uuid>,
    posting_date: NaiveDate,
    document_date: NaiveDate,
    narration: &'a str,
    reasoning: Option<&'a str>,
    idempotency_key: &'a str,
    reversed_entry_id: Option<Uuid>,
    lines: Vec<NewLine>,
}

/// Ledger repository for committing, validating and reversing entries.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    lock_timeout_ms: Option<u64>,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, lock_timeout_ms: Option<u64>) -> Self {
        Self {
            db,
            lock_timeout_ms,
        }
    }

    /// Commits a proposal in its own transaction.
    ///
    /// # Errors
    ///
    /// Returns any `LedgerError`; nothing is persisted on error.
    pub async fn commit(&self, proposal: &Proposal) -> Result<CommitOutcome, LedgerError> {
        let txn = txn::begin(&self.db, self.lock_timeout_ms)
            .await
            .map_err(db_err)?;
        let outcome = Self::commit_in_txn(&txn, proposal).await?;
        txn.commit().await.map_err(db_err)?;
        Ok(outcome)
    }

    /// Commits a proposal inside the caller's transaction.
    ///
    /// Used by the order transitions so that stock, numbering and the
    /// posting succeed or fail together.
    ///
    /// # Errors
    ///
    /// Returns any `LedgerError`. The caller must discard the transaction.
    pub async fn commit_in_txn(
        txn: &DatabaseTransaction,
        proposal: &Proposal,
    ) -> Result<CommitOutcome, LedgerError> {
        let resolution = Self::resolve_in_txn(txn, proposal).await?;
        let Resolution {
            company,
            branch_id,
            entry,
        } = resolution;

        let draft = &entry.proposal;
        let currency = draft.currency.to_string();
        let lines = entry
            .lines
            .iter()
            .map(|line| NewLine {
                account_id: line.account_id.into_inner(),
                currency: currency.clone(),
                exchange_rate: draft.exchange_rate,
                amount: line.signed_amount(),
                debit_base: line.debit_base,
                credit_base: line.credit_base,
            })
            .collect();

        Self::insert_entry(
            txn,
            &company,
            NewEntry {
                document_type: draft.document_type,
                branch_id,
                posting_date: draft.posting_date,
                document_date: draft.document_date,
                narration: &draft.narration,
                reasoning: draft.reasoning.as_deref(),
                idempotency_key: &draft.idempotency_key,
                reversed_entry_id: None,
                lines,
            },
        )
        .await
    }

    /// Dry run: normalizes, validates and resolves a proposal, checks its
    /// idempotency key, then rolls back.
    ///
    /// # Errors
    ///
    /// Returns the `LedgerError` `commit` would have failed with before
    /// inserting anything.
    pub async fn validate(&self, proposal: &Proposal) -> Result<ResolvedEntry, LedgerError> {
        let txn = txn::begin(&self.db, self.lock_timeout_ms)
            .await
            .map_err(db_err)?;
        let resolution = Self::resolve_in_txn(&txn, proposal).await;
        txn.rollback().await.map_err(db_err)?;
        resolution.map(|r| r.entry)
    }

    /// Reverses a posted entry in its own transaction, dated today (UTC).
    ///
    /// # Errors
    ///
    /// Returns `EntryNotFound`, `AlreadyReversed`, `DuplicateSubmission` or a
    /// database error.
    pub async fn reverse(
        &self,
        company_id: CompanyId,
        entry_id: JournalEntryId,
        idempotency_key: Option<&str>,
    ) -> Result<CommitOutcome, LedgerError> {
        let txn = txn::begin(&self.db, self.lock_timeout_ms)
            .await
            .map_err(db_err)?;
        let outcome = Self::reverse_in_txn(
            &txn,
            company_id,
            entry_id,
            idempotency_key,
            Utc::now().date_naive(),
        )
        .await?;
        txn.commit().await.map_err(db_err)?;
        Ok(outcome)
    }

    /// Creates the compensating entry of `entry_id` inside the caller's
    /// transaction.
    ///
    /// The original row is locked first, so two concurrent reversals of the
    /// same entry serialize and the second sees `AlreadyReversed`.
    ///
    /// # Errors
    ///
    /// See [`LedgerRepository::reverse`].
    pub async fn reverse_in_txn(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        entry_id: JournalEntryId,
        idempotency_key: Option<&str>,
        posting_date: NaiveDate,
    ) -> Result<CommitOutcome, LedgerError> {
        let original = journal_entries::Entity::find_by_id(entry_id.into_inner())
            .filter(journal_entries::Column::CompanyId.eq(company_id.into_inner()))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or(LedgerError::EntryNotFound(entry_id.into_inner()))?;

        let existing = journal_entries::Entity::find()
            .filter(journal_entries::Column::ReversedEntryId.eq(original.id))
            .one(txn)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            warn!(entry_id = %original.id, "entry already reversed");
            return Err(LedgerError::AlreadyReversed(original.id));
        }

        let key = idempotency_key.map_or_else(
            || ReversalService::default_idempotency_key(original.id),
            ToString::to_string,
        );
        Self::ensure_new_key(txn, &key).await?;

        let company = companies::Entity::find_by_id(company_id.into_inner())
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::CompanyNotFound(company_id.to_string()))?;
        let original_number = documents::Entity::find_by_id(original.document_id)
            .one(txn)
            .await
            .map_err(db_err)?
            .and_then(|d| d.document_number)
            .unwrap_or_default();

        let stored = journal_lines::Entity::find()
            .filter(journal_lines::Column::EntryId.eq(original.id))
            .order_by_asc(journal_lines::Column::LineNo)
            .all(txn)
            .await
            .map_err(db_err)?;
        let posted: Vec<PostedLine> = stored
            .iter()
            .map(|line| PostedLine {
                account_id: AccountId::from_uuid(line.account_id),
                amount: line.amount,
                debit_base: line.debit_base,
                credit_base: line.credit_base,
            })
            .collect();

        let lines = ReversalService::mirror_lines(&posted)
            .into_iter()
            .zip(&stored)
            .map(|(mirrored, line)| NewLine {
                account_id: mirrored.account_id.into_inner(),
                currency: line.currency.clone(),
                exchange_rate: line.exchange_rate,
                amount: mirrored.amount,
                debit_base: mirrored.debit_base,
                credit_base: mirrored.credit_base,
            })
            .collect();

        let narration = ReversalService::narration(&original_number, &original.narration);
        Self::insert_entry(
            txn,
            &company,
            NewEntry {
                document_type: DocumentType::JournalEntry,
                branch_id: None,
                posting_date,
                document_date: posting_date,
                narration: &narration,
                reasoning: None,
                idempotency_key: &key,
                reversed_entry_id: Some(original.id),
                lines,
            },
        )
        .await
    }

    /// Steps normalize → validate → resolve → idempotency check.
    async fn resolve_in_txn(
        txn: &DatabaseTransaction,
        proposal: &Proposal,
    ) -> Result<Resolution, LedgerError> {
        let validated = LedgerService::prepare(proposal, Utc::now().date_naive())?;

        let company = companies::Entity::find()
            .filter(companies::Column::Code.eq(validated.company_code.as_str()))
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::CompanyNotFound(validated.company_code.clone()))?;
        let base_currency = CurrencyCode::parse(&company.base_currency)
            .map_err(|e| LedgerError::InvalidCurrency(e.0))?;

        let branch_id = match validated.branch_code.as_deref() {
            Some(code) => Some(
                branches::Entity::find()
                    .filter(branches::Column::CompanyId.eq(company.id))
                    .filter(branches::Column::Code.eq(code))
                    .one(txn)
                    .await
                    .map_err(db_err)?
                    .ok_or_else(|| LedgerError::BranchNotFound(code.to_string()))?
                    .id,
            ),
            None => None,
        };

        let codes: Vec<String> = validated
            .lines
            .iter()
            .map(|line| line.account_code.clone())
            .collect();
        let rows = accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(company.id))
            .filter(accounts::Column::Code.is_in(codes))
            .all(txn)
            .await
            .map_err(db_err)?;
        let mut directory = HashMap::with_capacity(rows.len());
        for row in rows {
            let info = account_info(row)?;
            directory.insert(info.code.clone(), info);
        }

        let entry = LedgerService::resolve(validated, &base_currency, |code| {
            directory.get(code).cloned()
        })?;
        Self::ensure_new_key(txn, &entry.proposal.idempotency_key).await?;

        Ok(Resolution {
            company,
            branch_id,
            entry,
        })
    }

    async fn ensure_new_key(txn: &DatabaseTransaction, key: &str) -> Result<(), LedgerError> {
        let existing = journal_entries::Entity::find()
            .filter(journal_entries::Column::IdempotencyKey.eq(key))
            .one(txn)
            .await
            .map_err(db_err)?;
        if existing.is_some() {
            warn!(idempotency_key = key, "duplicate submission rejected");
            return Err(LedgerError::DuplicateSubmission(key.to_string()));
        }
        Ok(())
    }

    /// Numbers a document envelope and writes the entry with its lines.
    async fn insert_entry(
        txn: &DatabaseTransaction,
        company: &companies::Model,
        entry: NewEntry<'_>,
    ) -> Result<CommitOutcome, LedgerError> {
        let now = Utc::now();
        let company_id = CompanyId::from_uuid(company.id);
        let fiscal_year = NumberingRepository::fiscal_year(company, entry.posting_date)?;
        let number = NumberingRepository::assign_number(
            txn,
            company_id,
            entry.document_type,
            Some(fiscal_year),
            entry.branch_id.map(BranchId::from_uuid),
        )
        .await?;

        let document_id = DocumentId::new();
        documents::ActiveModel {
            id: Set(document_id.into_inner()),
            company_id: Set(company.id),
            document_type: Set(entry.document_type.prefix().to_string()),
            status: Set(POSTED_STATUS.to_string()),
            document_number: Set(Some(number.formatted.clone())),
            fiscal_year: Set(number.key.fiscal_year),
            branch_id: Set(number.key.has_branch().then_some(number.key.branch_id)),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        }
        .insert(txn)
        .await
        .map_err(db_err)?;

        let entry_id = JournalEntryId::new();
        journal_entries::ActiveModel {
            id: Set(entry_id.into_inner()),
            company_id: Set(company.id),
            document_id: Set(document_id.into_inner()),
            posting_date: Set(entry.posting_date),
            document_date: Set(entry.document_date),
            narration: Set(entry.narration.to_string()),
            reasoning: Set(entry.reasoning.map(ToString::to_string)),
            idempotency_key: Set(entry.idempotency_key.to_string()),
            reversed_entry_id: Set(entry.reversed_entry_id),
            created_at: Set(now.into()),
        }
        .insert(txn)
        .await
        .map_err(|e| entry_insert_error(e, entry.idempotency_key, entry.reversed_entry_id))?;

        let total_base: Decimal = entry.lines.iter().map(|l| l.debit_base).sum();
        let line_count = entry.lines.len();
        let rows = entry.lines.into_iter().zip(1..).map(|(line, line_no)| {
            journal_lines::ActiveModel {
                id: Set(Uuid::now_v7()),
                entry_id: Set(entry_id.into_inner()),
                company_id: Set(company.id),
                line_no: Set(line_no),
                account_id: Set(line.account_id),
                currency: Set(line.currency),
                exchange_rate: Set(line.exchange_rate),
                amount: Set(line.amount),
                debit_base: Set(line.debit_base),
                credit_base: Set(line.credit_base),
            }
        });
        journal_lines::Entity::insert_many(rows)
            .exec_without_returning(txn)
            .await
            .map_err(db_err)?;

        info!(
            company = %company.code,
            entry_id = %entry_id,
            document_number = %number.formatted,
            idempotency_key = entry.idempotency_key,
            lines = line_count,
            total_base = %total_base,
            "journal entry committed"
        );

        Ok(CommitOutcome {
            entry_id,
            document_id,
            document_number: number.formatted,
            total_base,
        })
    }
}

/// Converts an account row into the facts resolution needs.
pub(crate) fn account_info(row: accounts::Model) -> Result<AccountInfo, LedgerError> {
    let account_type = AccountType::parse(&row.account_type).ok_or_else(|| {
        LedgerError::Database(format!(
            "account {} has unknown type '{}'",
            row.code, row.account_type
        ))
    })?;
    Ok(AccountInfo {
        id: AccountId::from_uuid(row.id),
        code: row.code,
        account_type,
        is_active: row.is_active,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unrelated_errors_stay_infrastructure() {
        let err = entry_insert_error(DbErr::Custom("boom".to_string()), "k-1", None);
        assert!(matches!(err, LedgerError::Database(_)));
    }

    #[test]
    fn test_account_info_rejects_unknown_type() {
        let row = accounts::Model {
            id: Uuid::now_v7(),
            company_id: Uuid::now_v7(),
            code: "1000".to_string(),
            name: "Bank".to_string(),
            account_type: "contra".to_string(),
            is_active: true,
            created_at: Utc::now().into(),
        };
        assert!(matches!(account_info(row), Err(LedgerError::Database(_))));
    }
}
