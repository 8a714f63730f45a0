//! Ledger proposals produced by order transitions.
//!
//! Orders never write journal lines themselves. Each posting transition
//! builds an ordinary `Proposal` here and sends it through the same
//! normalize → validate → resolve pipeline as any outside proposal.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::PostingAccounts;
use uuid::Uuid;

use super::types::OrderKind;
use crate::currency::{LEDGER_SCALE, convert_amount, fits_ledger, round_ledger};
use crate::ledger::Proposal;
use crate::numbering::DocumentType;

/// Currency context of an order.
#[derive(Debug, Clone, Copy)]
pub struct OrderCurrency<'a> {
    /// Order currency code.
    pub currency: &'a str,
    /// Order-to-base rate fixed when the order was created.
    pub rate: Decimal,
}

/// Builds the proposals of one company's order transitions.
#[derive(Debug, Clone, Copy)]
pub struct OrderPostings<'a> {
    accounts: &'a PostingAccounts,
    company_code: &'a str,
    branch_code: Option<&'a str>,
}

/// Amounts a vendor bill clears, all in one currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillAmounts {
    /// Value of received stock lines.
    pub received_value: Decimal,
    /// Value of service lines.
    pub service_value: Decimal,
    /// Amount on the vendor's invoice.
    pub invoice_amount: Decimal,
}

impl BillAmounts {
    /// Base-currency amounts of a bill.
    ///
    /// `received_base` is what the goods receipts put into goods received not
    /// invoiced, so the bill clears that account exactly. Service and invoice
    /// amounts are converted from the order currency at `rate`; conversion
    /// residue ends up in the variance. `None` if a conversion leaves the
    /// ledger range.
    #[must_use]
    pub fn in_base(
        received_base: Decimal,
        service_value: Decimal,
        invoice_amount: Decimal,
        rate: Decimal,
    ) -> Option<Self> {
        let convert = |amount| {
            convert_amount(amount, rate, LEDGER_SCALE).filter(|base| fits_ledger(*base))
        };
        Some(Self {
            received_value: round_ledger(received_base),
            service_value: convert(service_value)?,
            invoice_amount: convert(invoice_amount)?,
        })
    }

    /// What the order says the bill should be.
    #[must_use]
    pub fn expected(&self) -> Decimal {
        self.received_value + self.service_value
    }

    /// Invoice minus expected; positive when the vendor charged more.
    #[must_use]
    pub fn variance(&self) -> Decimal {
        self.invoice_amount - self.expected()
    }
}

/// A vendor invoice outside the configured tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDeviation {
    /// Order value.
    pub expected: Decimal,
    /// Invoiced value.
    pub invoiced: Decimal,
    /// Absolute deviation in percent of `expected`, 2 dp.
    pub deviation_pct: Decimal,
    /// Configured tolerance in percent.
    pub tolerance_pct: Decimal,
}

/// Compares a vendor invoice with the order value.
///
/// Returns `None` inside the tolerance. A zero-valued order deviates by
/// definition when anything at all is invoiced.
#[must_use]
pub fn check_invoice_deviation(
    expected: Decimal,
    invoiced: Decimal,
    tolerance_pct: Decimal,
) -> Option<InvoiceDeviation> {
    let difference = (invoiced - expected).abs();
    let deviation_pct = if expected.is_zero() {
        if difference.is_zero() {
            return None;
        }
        Decimal::ONE_HUNDRED
    } else {
        (difference * Decimal::ONE_HUNDRED / expected).round_dp(2)
    };

    (deviation_pct > tolerance_pct).then_some(InvoiceDeviation {
        expected,
        invoiced,
        deviation_pct,
        tolerance_pct,
    })
}

impl<'a> OrderPostings<'a> {
    /// Creates a builder for one company and order branch.
    #[must_use]
    pub const fn new(
        accounts: &'a PostingAccounts,
        company_code: &'a str,
        branch_code: Option<&'a str>,
    ) -> Self {
        Self {
            accounts,
            company_code,
            branch_code,
        }
    }

    fn proposal(
        &self,
        document_type: DocumentType,
        key: String,
        currency: OrderCurrency<'_>,
        date: NaiveDate,
    ) -> Proposal {
        Proposal::new(document_type, self.company_code, key, currency.currency)
            .with_rate(currency.rate)
            .on(date)
            .in_branch(self.branch_code)
    }

    /// DN: DR cost of goods sold / CR inventory, base currency.
    ///
    /// `None` when nothing of value left stock (service-only orders, zero cost).
    #[must_use]
    pub fn delivery_note(
        &self,
        order_id: Uuid,
        order_number: &str,
        base_currency: &str,
        cogs: Decimal,
        date: NaiveDate,
    ) -> Option<Proposal> {
        let cogs = round_ledger(cogs);
        if cogs <= Decimal::ZERO {
            return None;
        }
        let base = OrderCurrency {
            currency: base_currency,
            rate: Decimal::ONE,
        };
        Some(
            self.proposal(
                DocumentType::DeliveryNote,
                OrderKind::Sales.idempotency_key(order_id, "ship"),
                base,
                date,
            )
            .narrated(format!("Goods shipped for {order_number}"))
            .debit(&self.accounts.cost_of_goods_sold, cogs)
            .credit(&self.accounts.inventory, cogs),
        )
    }

    /// INV: DR receivable / CR revenue, order currency.
    #[must_use]
    pub fn sales_invoice(
        &self,
        order_id: Uuid,
        order_number: &str,
        currency: OrderCurrency<'_>,
        amount: Decimal,
        date: NaiveDate,
    ) -> Proposal {
        self.proposal(
            DocumentType::SalesInvoice,
            OrderKind::Sales.idempotency_key(order_id, "invoice"),
            currency,
            date,
        )
        .narrated(format!("Invoice for {order_number}"))
        .debit(&self.accounts.receivable, amount)
        .credit(&self.accounts.revenue, amount)
    }

    /// RCPT: DR bank / CR receivable, order currency.
    #[must_use]
    pub fn customer_receipt(
        &self,
        order_id: Uuid,
        order_number: &str,
        currency: OrderCurrency<'_>,
        amount: Decimal,
        date: NaiveDate,
    ) -> Proposal {
        self.proposal(
            DocumentType::CustomerReceipt,
            OrderKind::Sales.idempotency_key(order_id, "pay"),
            currency,
            date,
        )
        .narrated(format!("Payment received for {order_number}"))
        .debit(&self.accounts.bank, amount)
        .credit(&self.accounts.receivable, amount)
    }

    /// GRN: DR inventory / CR goods received not invoiced.
    ///
    /// `None` when the receipt carries no stock value.
    #[must_use]
    pub fn goods_receipt(
        &self,
        order_id: Uuid,
        receipt_id: Uuid,
        order_number: &str,
        currency: OrderCurrency<'_>,
        value: Decimal,
        date: NaiveDate,
    ) -> Option<Proposal> {
        let value = round_ledger(value);
        if value <= Decimal::ZERO {
            return None;
        }
        Some(
            self.proposal(
                DocumentType::GoodsReceipt,
                OrderKind::Purchase.idempotency_key(order_id, &format!("receive:{receipt_id}")),
                currency,
                date,
            )
            .narrated(format!("Goods received for {order_number}"))
            .debit(&self.accounts.inventory, value)
            .credit(&self.accounts.goods_received_not_invoiced, value),
        )
    }

    /// BILL: DR GRNI + DR purchase expense / CR payable.
    ///
    /// Posted in base currency (see [`BillAmounts::in_base`]) so the GRNI
    /// debit matches the goods receipts to the unit. Any difference between
    /// the invoice and the cleared values goes to the purchase price variance
    /// account, on whichever side balances the entry.
    #[must_use]
    pub fn purchase_invoice(
        &self,
        order_id: Uuid,
        order_number: &str,
        currency: OrderCurrency<'_>,
        amounts: &BillAmounts,
        date: NaiveDate,
    ) -> Proposal {
        let mut proposal = self
            .proposal(
                DocumentType::PurchaseInvoice,
                OrderKind::Purchase.idempotency_key(order_id, "invoice"),
                currency,
                date,
            )
            .narrated(format!("Vendor bill for {order_number}"));

        if amounts.received_value > Decimal::ZERO {
            proposal = proposal.debit(&self.accounts.goods_received_not_invoiced, amounts.received_value);
        }
        if amounts.service_value > Decimal::ZERO {
            proposal = proposal.debit(&self.accounts.purchase_expense, amounts.service_value);
        }

        let variance = amounts.variance();
        if variance > Decimal::ZERO {
            proposal = proposal.debit(&self.accounts.purchase_price_variance, variance);
        } else if variance < Decimal::ZERO {
            proposal = proposal.credit(&self.accounts.purchase_price_variance, -variance);
        }

        proposal.credit(&self.accounts.payable, amounts.invoice_amount)
    }

    /// PAY: DR payable / CR bank, order currency.
    #[must_use]
    pub fn vendor_payment(
        &self,
        order_id: Uuid,
        order_number: &str,
        currency: OrderCurrency<'_>,
        amount: Decimal,
        date: NaiveDate,
    ) -> Proposal {
        self.proposal(
            DocumentType::VendorPayment,
            OrderKind::Purchase.idempotency_key(order_id, "pay"),
            currency,
            date,
        )
        .narrated(format!("Payment to vendor for {order_number}"))
        .debit(&self.accounts.payable, amount)
        .credit(&self.accounts.bank, amount)
    }
}
