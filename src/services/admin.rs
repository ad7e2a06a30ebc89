//! Admin-only mutations: user deregistration, instrument registry, and
//! direct balance adjustments (deposit/withdraw).

use uuid::Uuid;

use crate::error::AppError;
use crate::models::{is_valid_ticker, Instrument, User};
use crate::services::{ledger, store};
use crate::state::AppState;

pub async fn delete_user(state: &AppState, user_id: Uuid) -> Result<User, AppError> {
    let mut tx = state.db.pool.begin().await?;
    let user = store::delete_user(&mut tx, user_id).await?.ok_or(AppError::NotFound)?;
    tx.commit().await?;
    Ok(user)
}

pub async fn add_instrument(state: &AppState, ticker: &str, name: &str) -> Result<Instrument, AppError> {
    if !is_valid_ticker(ticker) {
        return Err(AppError::ValidationFailed(
            "ticker must be 2-10 uppercase letters".into(),
        ));
    }
    let mut tx = state.db.pool.begin().await?;
    let instrument = store::insert_instrument(&mut tx, ticker, name).await?;
    tx.commit().await?;
    Ok(instrument)
}

pub async fn delete_instrument(state: &AppState, ticker: &str) -> Result<(), AppError> {
    let mut tx = state.db.pool.begin().await?;
    let removed = store::delete_instrument(&mut tx, ticker).await?;
    if !removed {
        return Err(AppError::NotFound);
    }
    tx.commit().await?;
    Ok(())
}

pub async fn deposit(state: &AppState, user_id: Uuid, ticker: &str, amount: i64) -> Result<(), AppError> {
    let mut tx = state.db.pool.begin().await?;
    ledger::adjust(&mut tx, user_id, ticker, amount).await?;
    tx.commit().await?;
    Ok(())
}

pub async fn withdraw(state: &AppState, user_id: Uuid, ticker: &str, amount: i64) -> Result<(), AppError> {
    let mut tx = state.db.pool.begin().await?;
    ledger::adjust(&mut tx, user_id, ticker, -amount).await?;
    tx.commit().await?;
    Ok(())
}
