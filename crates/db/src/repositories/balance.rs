//! Read-only balance queries.
//!
//! Balances are always aggregated from posted lines; nothing here reads a
//! stored running total.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Select,
};
use tally_core::ledger::{
    AccountBalance, AccountStatement, AccountType, LedgerError, StatementEntry, TrialBalance,
};
use tally_shared::types::{AccountId, CompanyId, JournalEntryId};
use uuid::Uuid;

use super::ledger::db_err;
use crate::entities::{accounts, documents, journal_entries, journal_lines};

/// Balance repository for trial balances and account statements.
#[derive(Debug, Clone)]
pub struct BalanceRepository {
    db: DatabaseConnection,
}

impl BalanceRepository {
    /// Creates a new balance repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Trial balance of a company, optionally as of a posting date.
    ///
    /// Only accounts with at least one posted line appear.
    ///
    /// # Errors
    ///
    /// Returns a database error.
    pub async fn trial_balance(
        &self,
        company_id: CompanyId,
        as_of: Option<NaiveDate>,
    ) -> Result<TrialBalance, LedgerError> {
        let mut query = lines_of(company_id)
            .select_only()
            .column(journal_lines::Column::AccountId)
            .column_as(journal_lines::Column::DebitBase.sum(), "debit_total")
            .column_as(journal_lines::Column::CreditBase.sum(), "credit_total")
            .group_by(journal_lines::Column::AccountId);
        if let Some(date) = as_of {
            query = query.filter(journal_entries::Column::PostingDate.lte(date));
        }
        let totals: Vec<(Uuid, Decimal, Decimal)> =
            query.into_tuple().all(&self.db).await.map_err(db_err)?;

        let directory: HashMap<Uuid, accounts::Model> = accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(company_id.into_inner()))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(|account| (account.id, account))
            .collect();

        let mut rows = Vec::with_capacity(totals.len());
        for (account_id, debit, credit) in totals {
            let account = directory.get(&account_id).ok_or_else(|| {
                LedgerError::Database(format!("posted line references unknown account {account_id}"))
            })?;
            rows.push(AccountBalance::from_totals(
                AccountId::from_uuid(account.id),
                account.code.clone(),
                account.name.clone(),
                parse_type(account)?,
                debit,
                credit,
            ));
        }

        Ok(TrialBalance::new(as_of, rows))
    }

    /// Current balance of one account on its normal side.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the code is not in the company.
    pub async fn account_balance(
        &self,
        company_id: CompanyId,
        account_code: &str,
    ) -> Result<AccountBalance, LedgerError> {
        let account = self.find_account(company_id, account_code).await?;
        let (debit, credit) = self.totals(company_id, account.id, None).await?;

        Ok(AccountBalance::from_totals(
            AccountId::from_uuid(account.id),
            account.code.clone(),
            account.name.clone(),
            parse_type(&account)?,
            debit,
            credit,
        ))
    }

    /// Lines of one account between two posting dates (inclusive), with a
    /// running balance that starts from everything posted before `from`.
    ///
    /// # Errors
    ///
    /// Returns `AccountNotFound` if the code is not in the company.
    pub async fn account_statement(
        &self,
        company_id: CompanyId,
        account_code: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AccountStatement, LedgerError> {
        let account = self.find_account(company_id, account_code).await?;
        let account_type = parse_type(&account)?;

        let opening = match from {
            Some(date) => {
                let (debit, credit) = self.totals(company_id, account.id, Some(date)).await?;
                account_type.balance_change(debit, credit)
            }
            None => Decimal::ZERO,
        };

        let mut query = journal_lines::Entity::find()
            .find_also_related(journal_entries::Entity)
            .filter(journal_lines::Column::CompanyId.eq(company_id.into_inner()))
            .filter(journal_lines::Column::AccountId.eq(account.id))
            .order_by_asc(journal_entries::Column::PostingDate)
            .order_by_asc(journal_entries::Column::CreatedAt)
            .order_by_asc(journal_lines::Column::LineNo);
        if let Some(date) = from {
            query = query.filter(journal_entries::Column::PostingDate.gte(date));
        }
        if let Some(date) = to {
            query = query.filter(journal_entries::Column::PostingDate.lte(date));
        }
        let rows = query.all(&self.db).await.map_err(db_err)?;

        let document_ids: Vec<Uuid> = rows
            .iter()
            .filter_map(|(_, entry)| entry.as_ref().map(|e| e.document_id))
            .collect();
        let numbers: HashMap<Uuid, String> = documents::Entity::find()
            .filter(documents::Column::Id.is_in(document_ids))
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .filter_map(|doc| doc.document_number.map(|number| (doc.id, number)))
            .collect();

        let entries = rows
            .into_iter()
            .filter_map(|(line, entry)| entry.map(|entry| (line, entry)))
            .map(|(line, entry)| StatementEntry {
                entry_id: JournalEntryId::from_uuid(entry.id),
                document_number: numbers.get(&entry.document_id).cloned().unwrap_or_default(),
                posting_date: entry.posting_date,
                narration: entry.narration,
                debit: line.debit_base,
                credit: line.credit_base,
            })
            .collect();

        Ok(AccountStatement::build(
            account.code,
            account_type,
            opening,
            entries,
        ))
    }

    async fn find_account(
        &self,
        company_id: CompanyId,
        code: &str,
    ) -> Result<accounts::Model, LedgerError> {
        accounts::Entity::find()
            .filter(accounts::Column::CompanyId.eq(company_id.into_inner()))
            .filter(accounts::Column::Code.eq(code))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    /// Base debit and credit totals of one account, optionally strictly
    /// before a posting date.
    async fn totals(
        &self,
        company_id: CompanyId,
        account_id: Uuid,
        before: Option<NaiveDate>,
    ) -> Result<(Decimal, Decimal), LedgerError> {
        let mut query = lines_of(company_id)
            .filter(journal_lines::Column::AccountId.eq(account_id))
            .select_only()
            .column_as(journal_lines::Column::DebitBase.sum(), "debit_total")
            .column_as(journal_lines::Column::CreditBase.sum(), "credit_total");
        if let Some(date) = before {
            query = query.filter(journal_entries::Column::PostingDate.lt(date));
        }
        let totals: Option<(Option<Decimal>, Option<Decimal>)> =
            query.into_tuple().one(&self.db).await.map_err(db_err)?;

        Ok(totals.map_or((Decimal::ZERO, Decimal::ZERO), |(debit, credit)| {
            (debit.unwrap_or_default(), credit.unwrap_or_default())
        }))
    }
}

/// Posted lines of a company joined to their entry header.
fn lines_of(company_id: CompanyId) -> Select<journal_lines::Entity> {
    journal_lines::Entity::find()
        .inner_join(journal_entries::Entity)
        .filter(journal_lines::Column::CompanyId.eq(company_id.into_inner()))
}

fn parse_type(account: &accounts::Model) -> Result<AccountType, LedgerError> {
    AccountType::parse(&account.account_type).ok_or_else(|| {
        LedgerError::Database(format!(
            "account {} has unknown type '{}'",
            account.code, account.account_type
        ))
    })
}
