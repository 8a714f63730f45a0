//! Sequence keys, fiscal-year labels and number formatting.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use tally_shared::types::{BranchId, CompanyId};
use uuid::Uuid;

use super::{DocumentType, NumberingError};

/// Stored fiscal year of a sequence whose type never resets.
pub const NO_FISCAL_YEAR: i32 = 0;

/// Stored branch of a sequence whose type is not branch scoped.
pub const NO_BRANCH: Uuid = Uuid::nil();

/// Width the numeric part is zero-padded to.
const NUMBER_WIDTH: usize = 6;

/// Identity of one counter row.
///
/// Dimensions the type's policy ignores are collapsed to sentinels so every
/// key has the same shape and the store can use a plain composite primary key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SequenceKey {
    /// Owning company.
    pub company_id: CompanyId,
    /// Document type.
    pub document_type: DocumentType,
    /// Fiscal year label, or `NO_FISCAL_YEAR`.
    pub fiscal_year: i32,
    /// Branch, or `NO_BRANCH`.
    pub branch_id: Uuid,
}

impl SequenceKey {
    /// Derives the counter key for a document from its type's policy.
    ///
    /// A branch-scoped type numbered without a branch shares the company-wide
    /// counter of that type.
    ///
    /// # Errors
    ///
    /// Returns `MissingFiscalYear` if the type resets yearly and no fiscal
    /// year was supplied.
    pub fn for_document(
        company_id: CompanyId,
        document_type: DocumentType,
        fiscal_year: Option<i32>,
        branch_id: Option<BranchId>,
    ) -> Result<Self, NumberingError> {
        let fiscal_year = if document_type.resets_yearly() {
            fiscal_year.ok_or(NumberingError::MissingFiscalYear(document_type))?
        } else {
            NO_FISCAL_YEAR
        };

        let branch_id = match branch_id {
            Some(branch) if document_type.is_branch_scoped() => branch.into_inner(),
            _ => NO_BRANCH,
        };

        Ok(Self {
            company_id,
            document_type,
            fiscal_year,
            branch_id,
        })
    }

    /// Returns true if this key carries a real branch.
    #[must_use]
    pub fn has_branch(&self) -> bool {
        self.branch_id != NO_BRANCH
    }

    /// Returns the fiscal year, if the type resets yearly.
    #[must_use]
    pub fn fiscal_year_label(&self) -> Option<i32> {
        (self.fiscal_year != NO_FISCAL_YEAR).then_some(self.fiscal_year)
    }

    /// Computes the number following `last_number`.
    ///
    /// # Errors
    ///
    /// Returns `SequenceExhausted` on overflow.
    pub fn next_after(&self, last_number: i64) -> Result<i64, NumberingError> {
        last_number
            .checked_add(1)
            .ok_or(NumberingError::SequenceExhausted(self.document_type))
    }
}

/// A number handed out by the numbering service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignedNumber {
    /// Counter the number was drawn from.
    pub key: SequenceKey,
    /// Raw sequence value.
    pub sequence: i64,
    /// Formatted business number, e.g. `SO-BLR-2026-000042`.
    pub formatted: String,
}

/// Returns the fiscal-year label for a date.
///
/// The label is the calendar year in which the fiscal year starts: with an
/// April start, 2027-02-10 belongs to fiscal year 2026.
///
/// # Errors
///
/// Returns `InvalidFiscalYearStart` unless `start_month` is in 1..=12.
pub fn fiscal_year_for(date: NaiveDate, start_month: u32) -> Result<i32, NumberingError> {
    if !(1..=12).contains(&start_month) {
        return Err(NumberingError::InvalidFiscalYearStart(start_month));
    }
    if date.month() >= start_month {
        Ok(date.year())
    } else {
        Ok(date.year() - 1)
    }
}

/// Formats `PREFIX[-BRANCH][-YEAR]-NNNNNN`.
///
/// The numeric part is zero padded to six digits and grows past six digits
/// when needed. The branch segment appears only when the key is branch
/// scoped and a branch code is given.
#[must_use]
pub fn format_number(key: &SequenceKey, branch_code: Option<&str>, sequence: i64) -> String {
    let mut formatted = key.document_type.prefix().to_string();
    if key.has_branch()
        && let Some(code) = branch_code
    {
        formatted.push('-');
        formatted.push_str(code);
    }
    if let Some(year) = key.fiscal_year_label() {
        formatted.push('-');
        formatted.push_str(&year.to_string());
    }
    formatted.push('-');
    formatted.push_str(&format!("{sequence:0NUMBER_WIDTH$}"));
    formatted
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(date(2026, 1, 1), 1, 2026)]
    #[case(date(2026, 12, 31), 1, 2026)]
    #[case(date(2026, 3, 31), 4, 2025)]
    #[case(date(2026, 4, 1), 4, 2026)]
    #[case(date(2027, 2, 10), 4, 2026)]
    fn test_fiscal_year_for(#[case] on: NaiveDate, #[case] start: u32, #[case] expected: i32) {
        assert_eq!(fiscal_year_for(on, start).unwrap(), expected);
    }

    #[rstest]
    #[case(0)]
    #[case(13)]
    fn test_fiscal_year_rejects_bad_start(#[case] start: u32) {
        assert!(matches!(
            fiscal_year_for(date(2026, 1, 1), start),
            Err(NumberingError::InvalidFiscalYearStart(_))
        ));
    }

    #[test]
    fn test_key_uses_sentinels_outside_policy() {
        let company = CompanyId::new();
        let branch = BranchId::new();

        let je = SequenceKey::for_document(company, DocumentType::JournalEntry, Some(2026), Some(branch))
            .unwrap();
        assert_eq!(je.fiscal_year, 2026);
        assert_eq!(je.branch_id, NO_BRANCH);

        let adj = SequenceKey::for_document(company, DocumentType::StockAdjustment, Some(2026), None)
            .unwrap();
        assert_eq!(adj.fiscal_year, NO_FISCAL_YEAR);

        let so = SequenceKey::for_document(company, DocumentType::SalesOrder, Some(2026), Some(branch))
            .unwrap();
        assert_eq!(so.branch_id, branch.into_inner());
    }

    #[test]
    fn test_key_requires_fiscal_year_for_yearly_types() {
        let result = SequenceKey::for_document(CompanyId::new(), DocumentType::SalesInvoice, None, None);
        assert!(matches!(result, Err(NumberingError::MissingFiscalYear(DocumentType::SalesInvoice))));
    }

    #[test]
    fn test_format_number() {
        let company = CompanyId::new();
        let branch = BranchId::new();

        let so = SequenceKey::for_document(company, DocumentType::SalesOrder, Some(2026), Some(branch))
            .unwrap();
        assert_eq!(format_number(&so, Some("BLR"), 42), "SO-BLR-2026-000042");

        let je = SequenceKey::for_document(company, DocumentType::JournalEntry, Some(2026), None)
            .unwrap();
        assert_eq!(format_number(&je, Some("BLR"), 1), "JE-2026-000001");

        let adj = SequenceKey::for_document(company, DocumentType::StockAdjustment, None, None).unwrap();
        assert_eq!(format_number(&adj, None, 7), "ADJ-000007");
        assert_eq!(format_number(&adj, None, 1_234_567), "ADJ-1234567");
    }

    #[test]
    fn test_next_after_overflow() {
        let key = SequenceKey::for_document(CompanyId::new(), DocumentType::StockAdjustment, None, None)
            .unwrap();
        assert_eq!(key.next_after(41).unwrap(), 42);
        assert!(matches!(key.next_after(i64::MAX), Err(NumberingError::SequenceExhausted(_))));
    }
}
