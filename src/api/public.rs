//! Unauthenticated endpoints: registration, instrument listing, order book
//! depth, and the public trade tape.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppError;
use crate::models::{Instrument, NewUser, Role, Trade, User};
use crate::services::{order_book, store};
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<NewUser>,
) -> Result<Json<User>, AppError> {
    body.validate()
        .map_err(|e| AppError::ValidationFailed(e.to_string()))?;
    let mut tx = state.db.pool.begin().await?;
    let user = store::insert_user(&mut tx, &body.name, Role::User).await?;
    tx.commit().await?;
    Ok(Json(user))
}

pub async fn list_instruments(State(state): State<AppState>) -> Result<Json<Vec<Instrument>>, AppError> {
    let instruments = store::list_instruments(&state.db.pool).await?;
    Ok(Json(instruments))
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    limit: Option<i64>,
}

pub async fn orderbook(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<order_book::L2OrderBook>, AppError> {
    let limit = q.limit.unwrap_or(order_book::DEFAULT_L2_LIMIT);
    let book = order_book::l2(&state.db.pool, &ticker, limit).await?;
    Ok(Json(book))
}

pub async fn transactions(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Result<Json<Vec<Trade>>, AppError> {
    let limit = q.limit.unwrap_or(order_book::DEFAULT_TRADES_LIMIT);
    let trades = order_book::recent_trades(&state.db.pool, &ticker, limit).await?;
    Ok(Json(trades))
}

pub async fn health() -> &'static str {
    "OK"
}
