//! Document numbering repository.
//!
//! The only writer of `document_sequences`. Numbers are drawn inside the
//! caller's transaction, so a rolled-back document gives its number back and
//! the sequence stays gapless.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ActiveValue::Set, ColumnTrait, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QuerySelect,
};
use tally_core::numbering::{
    AssignedNumber, DocumentType, NumberingError, SequenceKey, fiscal_year_for, format_number,
};
use tally_shared::types::{BranchId, CompanyId};
use tracing::debug;

use crate::entities::{branches, companies, document_sequences};

fn db_err(err: DbErr) -> NumberingError {
    NumberingError::Database(err.to_string())
}

/// Stateless numbering service over a caller-owned transaction.
pub struct NumberingRepository;

impl NumberingRepository {
    /// Assigns the next number for a document.
    ///
    /// 1. Derives the counter key from the type's policy
    /// 2. Creates the counter row at zero if it does not exist yet
    /// 3. Locks the row (`SELECT ... FOR UPDATE`) and increments it
    /// 4. Formats the business number
    ///
    /// Concurrent callers on the same key queue on the row lock and receive
    /// consecutive numbers.
    ///
    /// # Errors
    ///
    /// Returns `MissingFiscalYear` for a yearly type without a year,
    /// `BranchNotFound` for a branch outside the company, or a database error.
    pub async fn assign_number(
        txn: &DatabaseTransaction,
        company_id: CompanyId,
        document_type: DocumentType,
        fiscal_year: Option<i32>,
        branch_id: Option<BranchId>,
    ) -> Result<AssignedNumber, NumberingError> {
        let key = SequenceKey::for_document(company_id, document_type, fiscal_year, branch_id)?;

        let branch_code = if key.has_branch() {
            let branch = branches::Entity::find_by_id(key.branch_id)
                .filter(branches::Column::CompanyId.eq(company_id.into_inner()))
                .one(txn)
                .await
                .map_err(db_err)?
                .ok_or(NumberingError::BranchNotFound(key.branch_id))?;
            Some(branch.code)
        } else {
            None
        };

        let seed = document_sequences::ActiveModel {
            company_id: Set(company_id.into_inner()),
            document_type: Set(document_type.prefix().to_string()),
            fiscal_year: Set(key.fiscal_year),
            branch_id: Set(key.branch_id),
            last_number: Set(0),
            updated_at: Set(Utc::now().into()),
        };
        document_sequences::Entity::insert(seed)
            .on_conflict(
                OnConflict::columns([
                    document_sequences::Column::CompanyId,
                    document_sequences::Column::DocumentType,
                    document_sequences::Column::FiscalYear,
                    document_sequences::Column::BranchId,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(txn)
            .await
            .map_err(db_err)?;

        let counter = document_sequences::Entity::find()
            .filter(document_sequences::Column::CompanyId.eq(company_id.into_inner()))
            .filter(document_sequences::Column::DocumentType.eq(document_type.prefix()))
            .filter(document_sequences::Column::FiscalYear.eq(key.fiscal_year))
            .filter(document_sequences::Column::BranchId.eq(key.branch_id))
            .lock_exclusive()
            .one(txn)
            .await
            .map_err(db_err)?
            .ok_or_else(|| {
                NumberingError::Database(format!("sequence row for {document_type} not found"))
            })?;

        let sequence = key.next_after(counter.last_number)?;

        let mut active: document_sequences::ActiveModel = counter.into();
        active.last_number = Set(sequence);
        active.updated_at = Set(Utc::now().into());
        active.update(txn).await.map_err(db_err)?;

        let formatted = format_number(&key, branch_code.as_deref(), sequence);
        debug!(
            company_id = %company_id,
            document_type = %document_type,
            fiscal_year = key.fiscal_year,
            sequence,
            number = %formatted,
            "document number assigned"
        );

        Ok(AssignedNumber {
            key,
            sequence,
            formatted,
        })
    }

    /// Fiscal-year label of `date` under the company's fiscal calendar.
    ///
    /// # Errors
    ///
    /// Returns `InvalidFiscalYearStart` if the stored start month is out of range.
    pub fn fiscal_year(company: &companies::Model, date: NaiveDate) -> Result<i32, NumberingError> {
        let start_month = u32::try_from(company.fiscal_year_start_month).unwrap_or(0);
        fiscal_year_for(date, start_month)
    }
}
