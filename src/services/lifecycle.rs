//! OrderLifecycle: admission, matching, and cancellation of orders.
//!
//! Every mutating call here acquires the instrument's in-process lock before
//! opening a transaction, then runs the whole admit-reserve-match (or
//! cancel-refund) sequence inside that single transaction, so the book a
//! concurrent request observes never straddles a half-applied fill.

use chrono::Utc;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{
    Direction, Instrument, Order, OrderBody, OrderStatus, QUOTE_CURRENCY,
};
use crate::services::{ledger, matching, store};
use crate::state::AppState;

/// Validate and admit a new order, matching it against the book before
/// returning. Fully synchronous with respect to the caller: by the time this
/// returns, every fill the order could get has already happened.
pub async fn submit(state: &AppState, user_id: Uuid, body: OrderBody) -> Result<Order, AppError> {
    if body.qty() < 1 {
        return Err(AppError::ValidationFailed("qty must be >= 1".into()));
    }
    if let Some(price) = body.price() {
        if price <= 0 {
            return Err(AppError::ValidationFailed("price must be > 0".into()));
        }
    }

    let ticker = body.ticker().to_string();
    ensure_instrument_exists(state, &ticker).await?;

    let lock = state.ticker_lock(&ticker);
    let _guard = lock.lock().await;

    let mut tx = state.db.pool.begin().await?;

    reserve(&mut tx, user_id, &ticker, &body).await?;

    let order_id = Uuid::new_v4();
    let mut order = store::insert_order(
        &mut tx,
        order_id,
        user_id,
        &ticker,
        body.direction(),
        body.qty(),
        body.price(),
        Utc::now(),
    )
    .await?;

    matching::match_order(&mut tx, &mut order).await?;

    tx.commit().await?;
    Ok(order)
}

async fn ensure_instrument_exists(state: &AppState, ticker: &str) -> Result<Instrument, AppError> {
    store::get_instrument(&state.db.pool, ticker)
        .await?
        .ok_or_else(|| AppError::InstrumentUnknown(ticker.to_string()))
}

/// Reserve the funds or inventory an order needs before it can rest or
/// match, failing the whole submission (before any row is written) if the
/// reservation can't be satisfied.
async fn reserve(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    ticker: &str,
    body: &OrderBody,
) -> Result<(), AppError> {
    match (body.direction(), body.price()) {
        (Direction::Buy, Some(price)) => {
            let cost = price
                .checked_mul(body.qty())
                .ok_or_else(|| AppError::Internal("reservation overflow".into()))?;
            ledger::adjust(tx, user_id, QUOTE_CURRENCY, -cost).await
        }
        (Direction::Buy, None) => {
            let levels = ask_levels(tx, ticker).await?;
            let cost = matching::walk_liquidity(&levels, body.qty())
                .ok_or(AppError::InsufficientLiquidity)?;
            ledger::adjust(tx, user_id, QUOTE_CURRENCY, -cost).await
        }
        (Direction::Sell, Some(_)) => ledger::adjust(tx, user_id, ticker, -body.qty()).await,
        (Direction::Sell, None) => {
            let levels = bid_levels(tx, ticker).await?;
            if matching::walk_liquidity(&levels, body.qty()).is_none() {
                return Err(AppError::InsufficientLiquidity);
            }
            ledger::adjust(tx, user_id, ticker, -body.qty()).await
        }
    }
}

async fn ask_levels(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ticker: &str,
) -> Result<Vec<(i64, i64)>, AppError> {
    let asks = store::scan_resting(tx, ticker, Direction::Sell, None).await?;
    Ok(asks
        .iter()
        .map(|o| (o.price.unwrap_or(0), o.remaining()))
        .collect())
}

async fn bid_levels(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    ticker: &str,
) -> Result<Vec<(i64, i64)>, AppError> {
    let bids = store::scan_resting(tx, ticker, Direction::Buy, None).await?;
    Ok(bids
        .iter()
        .map(|o| (o.price.unwrap_or(0), o.remaining()))
        .collect())
}

/// Cancel a resting order, refunding whatever it still had reserved.
pub async fn cancel(state: &AppState, user_id: Uuid, order_id: Uuid, is_admin: bool) -> Result<Order, AppError> {
    let ticker = store::get_order(&state.db.pool, order_id)
        .await?
        .ok_or(AppError::NotFound)?
        .ticker;

    let lock = state.ticker_lock(&ticker);
    let _guard = lock.lock().await;

    let mut tx = state.db.pool.begin().await?;

    let mut order = store::get_order_for_update(&mut tx, order_id)
        .await?
        .ok_or(AppError::NotFound)?;

    if order.user_id != user_id && !is_admin {
        return Err(AppError::NotFound);
    }
    if order.is_market() {
        return Err(AppError::CannotCancelMarket);
    }
    if order.status != OrderStatus::New {
        return Err(AppError::CannotCancelExecuted);
    }

    let remaining = order.remaining();
    order.status = OrderStatus::Cancelled;
    store::update_order(&mut tx, &order).await?;

    let price = order.price.expect("non-market order always has a price");
    match order.direction {
        Direction::Buy => {
            let refund = remaining
                .checked_mul(price)
                .ok_or_else(|| AppError::Internal("refund overflow".into()))?;
            ledger::adjust(&mut tx, order.user_id, QUOTE_CURRENCY, refund).await?
        }
        Direction::Sell => ledger::adjust(&mut tx, order.user_id, &order.ticker, remaining).await?,
    }

    tx.commit().await?;
    Ok(order)
}

pub async fn list_orders(state: &AppState, user_id: Uuid) -> Result<Vec<Order>, AppError> {
    store::list_orders_for_user(&state.db.pool, user_id).await
}

pub async fn get_order(state: &AppState, user_id: Uuid, order_id: Uuid, is_admin: bool) -> Result<Order, AppError> {
    let order = store::get_order(&state.db.pool, order_id)
        .await?
        .ok_or(AppError::NotFound)?;
    if order.user_id != user_id && !is_admin {
        return Err(AppError::NotFound);
    }
    Ok(order)
}
