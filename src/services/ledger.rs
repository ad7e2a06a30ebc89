//! BalanceLedger: the sole mutator of balance rows.
//!
//! Every credit/debit in the engine goes through [`adjust`], which locks the
//! `(user, ticker)` row, computes `old + delta`, and refuses the write if the
//! result would be negative — this is what keeps every balance non-negative
//! unconditionally, rather than relying on each caller to check first.

use sqlx::PgConnection;
use uuid::Uuid;

use crate::error::AppError;
use crate::services::store;

pub async fn adjust(
    conn: &mut PgConnection,
    user_id: Uuid,
    ticker: &str,
    delta: i64,
) -> Result<(), AppError> {
    let current = store::get_balance_for_update(conn, user_id, ticker).await?;
    let new_amount = current
        .checked_add(delta)
        .ok_or_else(|| AppError::Internal("balance overflow".into()))?;
    if new_amount < 0 {
        return Err(AppError::InsufficientBalance);
    }
    store::set_balance(conn, user_id, ticker, new_amount).await?;
    tracing::debug!(%user_id, ticker, delta, new_amount, "balance adjusted");
    Ok(())
}

/// Read-only snapshot of a user's full balance map, for authorization
/// checks against free balance. Not transactional with subsequent writes
/// unless the caller passes a connection that is part of the same
/// transaction.
pub async fn snapshot(pool: &sqlx::PgPool, user_id: Uuid) -> Result<std::collections::HashMap<String, i64>, AppError> {
    store::snapshot_balances(pool, user_id).await
}
