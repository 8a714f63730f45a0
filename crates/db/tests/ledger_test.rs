//! Ledger engine against a live database: commit, idempotency, reversal,
//! tenant scoping and balance queries.

#![allow(clippy::uninlined_format_args)]

mod common;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use tally_core::ledger::{LedgerError, Proposal};
use tally_core::numbering::DocumentType;
use tally_db::ServiceError;
use tally_db::entities::{accounts, journal_entries, journal_lines};
use uuid::Uuid;

use common::{key, setup};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn capital_injection(company: &str, idempotency_key: &str, amount: Decimal) -> Proposal {
    Proposal::new(DocumentType::JournalEntry, company, idempotency_key, "INR")
        .on(date(2026, 5, 10))
        .narrated("Capital injection")
        .debit("1000", amount)
        .credit("3000", amount)
}

#[tokio::test]
async fn test_commit_and_duplicate_key() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let idempotency_key = key("capital");
    let proposal = capital_injection(&ctx.company.code, &idempotency_key, dec!(50000));

    let outcome = ctx.service.commit_entry(&proposal).await.unwrap();
    assert_eq!(outcome.total_base, dec!(50000));
    assert_eq!(outcome.document_number, "JE-2026-000001");

    let lines = journal_lines::Entity::find()
        .filter(journal_lines::Column::EntryId.eq(outcome.entry_id.into_inner()))
        .all(&ctx.db)
        .await
        .unwrap();
    assert_eq!(lines.len(), 2);
    let debit: Decimal = lines.iter().map(|l| l.debit_base).sum();
    let credit: Decimal = lines.iter().map(|l| l.credit_base).sum();
    assert_eq!(debit, credit);

    let err = ctx.service.commit_entry(&proposal).await.unwrap_err();
    assert!(
        matches!(err, ServiceError::Ledger(LedgerError::DuplicateSubmission(ref k)) if *k == idempotency_key),
        "expected duplicate submission, got {err:?}"
    );

    let entries = journal_entries::Entity::find()
        .filter(journal_entries::Column::IdempotencyKey.eq(&idempotency_key))
        .count(&ctx.db)
        .await
        .unwrap();
    assert_eq!(entries, 1);
}

#[tokio::test]
async fn test_validate_writes_nothing() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let idempotency_key = key("dry-run");
    let proposal = capital_injection(&ctx.company.code, &idempotency_key, dec!(10));

    let resolved = ctx.service.validate_entry(&proposal).await.unwrap();
    assert_eq!(resolved.lines.len(), 2);
    assert_eq!(resolved.totals.debit_base, dec!(10));

    let entries = journal_entries::Entity::find()
        .filter(journal_entries::Column::CompanyId.eq(ctx.company.company_id.into_inner()))
        .count(&ctx.db)
        .await
        .unwrap();
    assert_eq!(entries, 0);

    // The dry run did not consume a number either.
    let outcome = ctx.service.commit_entry(&proposal).await.unwrap();
    assert_eq!(outcome.document_number, "JE-2026-000001");
}

#[tokio::test]
async fn test_unbalanced_proposal_is_rejected() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let proposal = Proposal::new(DocumentType::JournalEntry, &ctx.company.code, key("bad"), "INR")
        .on(date(2026, 5, 10))
        .debit("1000", dec!(100))
        .credit("3000", dec!(90));

    let err = ctx.service.commit_entry(&proposal).await.unwrap_err();
    assert!(matches!(err, ServiceError::Ledger(LedgerError::Unbalanced { .. })));
    assert_eq!(err.error_code(), "UNBALANCED_ENTRY");
}

#[tokio::test]
async fn test_foreign_currency_is_converted_to_base() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let proposal = Proposal::new(DocumentType::JournalEntry, &ctx.company.code, key("usd"), "USD")
        .with_rate(dec!(83.25))
        .on(date(2026, 5, 10))
        .debit("1000", dec!(100))
        .credit("3000", dec!(100));

    let outcome = ctx.service.commit_entry(&proposal).await.unwrap();
    assert_eq!(outcome.total_base, dec!(8325));

    let lines = journal_lines::Entity::find()
        .filter(journal_lines::Column::EntryId.eq(outcome.entry_id.into_inner()))
        .all(&ctx.db)
        .await
        .unwrap();
    assert!(lines.iter().all(|l| l.currency == "USD" && l.exchange_rate == dec!(83.25)));
    let signed: Decimal = lines.iter().map(|l| l.amount).sum();
    assert_eq!(signed, Decimal::ZERO);
}

#[tokio::test]
async fn test_reverse_once() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let company_id = ctx.company.company_id;
    let original = ctx
        .service
        .commit_entry(&capital_injection(&ctx.company.code, &key("capital"), dec!(1200)))
        .await
        .unwrap();

    let reversal = ctx
        .service
        .reverse_entry(company_id, original.entry_id, None)
        .await
        .unwrap();
    assert_ne!(reversal.entry_id, original.entry_id);
    assert_eq!(reversal.total_base, dec!(1200));

    let stored = journal_entries::Entity::find_by_id(reversal.entry_id.into_inner())
        .one(&ctx.db)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.reversed_entry_id, Some(original.entry_id.into_inner()));
    assert_eq!(stored.idempotency_key, format!("reversal:{}", original.entry_id));

    let again = ctx
        .service
        .reverse_entry(company_id, original.entry_id, Some(&key("another")))
        .await
        .unwrap_err();
    assert!(matches!(again, ServiceError::Ledger(LedgerError::AlreadyReversed(id)) if id == original.entry_id.into_inner()));

    let balance = ctx.service.account_balance(company_id, "1000").await.unwrap();
    assert_eq!(balance.balance, Decimal::ZERO);
    assert_eq!(balance.debit_total, dec!(1200));
    assert_eq!(balance.credit_total, dec!(1200));
}

#[tokio::test]
async fn test_reverse_unknown_entry() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let missing = tally_shared::types::JournalEntryId::new();
    let err = ctx
        .service
        .reverse_entry(ctx.company.company_id, missing, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Ledger(LedgerError::EntryNotFound(_))));
}

#[tokio::test]
async fn test_accounts_are_scoped_to_the_company() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let other = match common::seed_company(&ctx.db, "INR").await {
        Ok(company) => company,
        Err(e) => {
            eprintln!("Skipping test - setup failed: {}", e);
            return;
        }
    };
    accounts::ActiveModel {
        id: Set(Uuid::now_v7()),
        company_id: Set(other.company_id.into_inner()),
        code: Set("9999".to_string()),
        name: Set("Only in the other company".to_string()),
        account_type: Set("asset".to_string()),
        is_active: Set(true),
        ..Default::default()
    }
    .insert(&ctx.db)
    .await
    .unwrap();

    let proposal = Proposal::new(DocumentType::JournalEntry, &ctx.company.code, key("x"), "INR")
        .on(date(2026, 5, 10))
        .debit("9999", dec!(10))
        .credit("3000", dec!(10));
    let err = ctx.service.commit_entry(&proposal).await.unwrap_err();
    assert!(matches!(err, ServiceError::Ledger(LedgerError::AccountNotFound(ref code)) if code == "9999"));

    // An entry of another company is invisible too.
    let theirs = Proposal::new(DocumentType::JournalEntry, &other.code, key("y"), "INR")
        .on(date(2026, 5, 10))
        .debit("9999", dec!(10))
        .credit("3000", dec!(10));
    let outcome = ctx.service.commit_entry(&theirs).await.unwrap();
    let err = ctx
        .service
        .reverse_entry(ctx.company.company_id, outcome.entry_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Ledger(LedgerError::EntryNotFound(_))));
}

#[tokio::test]
async fn test_trial_balance_and_statement() {
    let Some(ctx) = setup("INR").await else {
        return;
    };
    let company_id = ctx.company.company_id;
    let code = ctx.company.code.clone();

    ctx.service
        .commit_entry(&capital_injection(&code, &key("capital"), dec!(1000)))
        .await
        .unwrap();
    let expense = Proposal::new(DocumentType::JournalEntry, &code, key("rent"), "INR")
        .on(date(2026, 6, 1))
        .narrated("Rent")
        .debit("5300", dec!(300))
        .credit("1000", dec!(300));
    ctx.service.commit_entry(&expense).await.unwrap();

    let trial = ctx.service.trial_balance(company_id, None).await.unwrap();
    assert!(trial.is_balanced);
    assert_eq!(trial.total_debit, trial.total_credit);
    assert_eq!(trial.row("1000").unwrap().balance, dec!(700));
    assert_eq!(trial.row("3000").unwrap().balance, dec!(1000));

    let as_of_may = ctx
        .service
        .trial_balance(company_id, Some(date(2026, 5, 31)))
        .await
        .unwrap();
    assert!(as_of_may.row("5300").is_none());
    assert_eq!(as_of_may.row("1000").unwrap().balance, dec!(1000));

    let statement = ctx
        .service
        .account_statement(company_id, "1000", None, None)
        .await
        .unwrap();
    assert_eq!(statement.opening_balance, Decimal::ZERO);
    assert_eq!(statement.lines.len(), 2);
    assert_eq!(statement.lines[0].running_balance, dec!(1000));
    assert_eq!(statement.lines[1].running_balance, dec!(700));
    assert_eq!(statement.closing_balance, dec!(700));

    let june = ctx
        .service
        .account_statement(company_id, "1000", Some(date(2026, 6, 1)), None)
        .await
        .unwrap();
    assert_eq!(june.opening_balance, dec!(1000));
    assert_eq!(june.lines.len(), 1);
    assert_eq!(june.closing_balance, dec!(700));
}
