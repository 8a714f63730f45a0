//! Transaction setup shared by every mutating call.
//!
//! Row-lock waits block until the holder finishes unless a lock timeout is
//! configured, in which case it is applied with `SET LOCAL` so it never
//! outlives the transaction.

use sea_orm::{ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr, TransactionTrait};

/// Begins a transaction, applying `lock_timeout_ms` when set.
///
/// # Errors
///
/// Returns an error if the transaction cannot be started or the timeout
/// cannot be set.
pub async fn begin(
    db: &DatabaseConnection,
    lock_timeout_ms: Option<u64>,
) -> Result<DatabaseTransaction, DbErr> {
    let txn = db.begin().await?;
    if let Some(timeout) = lock_timeout_ms {
        set_lock_timeout(&txn, timeout).await?;
    }
    Ok(txn)
}

/// Sets the lock timeout on an existing transaction.
///
/// # Errors
///
/// Returns an error if the statement fails.
pub async fn set_lock_timeout(txn: &DatabaseTransaction, timeout_ms: u64) -> Result<(), DbErr> {
    txn.execute_unprepared(&lock_timeout_sql(timeout_ms)).await?;
    Ok(())
}

fn lock_timeout_sql(timeout_ms: u64) -> String {
    format!("SET LOCAL lock_timeout = '{timeout_ms}ms'")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_timeout_sql_format() {
        assert_eq!(lock_timeout_sql(2500), "SET LOCAL lock_timeout = '2500ms'");
    }
}
