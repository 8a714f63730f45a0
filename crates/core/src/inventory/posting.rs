//! Ledger proposals for stock movements outside orders.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::currency::round_ledger;
use crate::ledger::Proposal;
use crate::numbering::DocumentType;

/// Builds direct stock receipt and adjustment postings, base currency.
#[derive(Debug, Clone, Copy)]
pub struct StockPostings<'a> {
    /// Inventory asset account code.
    pub inventory_account: &'a str,
    /// Company code.
    pub company_code: &'a str,
    /// Company base currency.
    pub base_currency: &'a str,
}

impl StockPostings<'_> {
    /// GRN: DR inventory / CR `offset_account`.
    ///
    /// `None` for a zero-value receipt (free goods).
    #[must_use]
    pub fn receipt(
        &self,
        idempotency_key: &str,
        offset_account: &str,
        value: Decimal,
        date: NaiveDate,
        narration: &str,
    ) -> Option<Proposal> {
        let value = round_ledger(value);
        (value > Decimal::ZERO).then(|| {
            Proposal::new(DocumentType::GoodsReceipt, self.company_code, idempotency_key, self.base_currency)
                .on(date)
                .narrated(narration)
                .debit(self.inventory_account, value)
                .credit(offset_account, value)
        })
    }

    /// ADJ: a gain debits inventory, a loss credits it; `offset_account`
    /// takes the other side.
    ///
    /// `None` when the adjustment carries no value.
    #[must_use]
    pub fn adjustment(
        &self,
        idempotency_key: &str,
        offset_account: &str,
        signed_value: Decimal,
        date: NaiveDate,
        narration: &str,
    ) -> Option<Proposal> {
        let value = round_ledger(signed_value.abs());
        if value.is_zero() {
            return None;
        }
        let proposal = Proposal::new(
            DocumentType::StockAdjustment,
            self.company_code,
            idempotency_key,
            self.base_currency,
        )
        .on(date)
        .narrated(narration);

        Some(if signed_value > Decimal::ZERO {
            proposal.debit(self.inventory_account, value).credit(offset_account, value)
        } else {
            proposal.debit(offset_account, value).credit(self.inventory_account, value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{EntrySide, validate};
    use rust_decimal_macros::dec;

    fn postings() -> StockPostings<'static> {
        StockPostings {
            inventory_account: "1200",
            company_code: "ACME",
            base_currency: "INR",
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    #[test]
    fn test_receipt() {
        let proposal = postings().receipt("rcv-1", "3000", dec!(1000), date(), "Opening stock").unwrap();
        let validated = validate(&proposal.normalize(date())).unwrap();
        assert_eq!(validated.document_type, DocumentType::GoodsReceipt);
        assert_eq!(validated.lines[0].account_code, "1200");
        assert_eq!(validated.lines[0].side, EntrySide::Debit);
        assert!(postings().receipt("rcv-2", "3000", Decimal::ZERO, date(), "").is_none());
    }

    #[test]
    fn test_adjustment_sides() {
        let loss = postings().adjustment("adj-1", "5300", dec!(-75), date(), "Count").unwrap();
        let validated = validate(&loss.normalize(date())).unwrap();
        assert_eq!(validated.lines[0].account_code, "5300");
        assert_eq!(validated.lines[1].account_code, "1200");
        assert_eq!(validated.lines[1].side, EntrySide::Credit);
        assert_eq!(validated.lines[1].amount, dec!(75));

        let gain = postings().adjustment("adj-2", "5300", dec!(25), date(), "Count").unwrap();
        let validated = validate(&gain.normalize(date())).unwrap();
        assert_eq!(validated.lines[0].account_code, "1200");
    }
}
