//! OrderBook: read-only projections over resting orders for one instrument.

use serde::Serialize;
use sqlx::PgPool;

use crate::error::AppError;
use crate::models::{Direction, Trade};
use crate::services::store;

pub const MAX_L2_LIMIT: i64 = 25;
pub const DEFAULT_L2_LIMIT: i64 = 10;
pub const MAX_TRADES_LIMIT: i64 = 100;
pub const DEFAULT_TRADES_LIMIT: i64 = 10;

#[derive(Debug, Clone, Serialize)]
pub struct Level {
    pub price: i64,
    pub qty: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct L2OrderBook {
    pub bid_levels: Vec<Level>,
    pub ask_levels: Vec<Level>,
}

pub async fn l2(pool: &PgPool, ticker: &str, limit: i64) -> Result<L2OrderBook, AppError> {
    let limit = limit.clamp(1, MAX_L2_LIMIT);
    let bids = store::l2_levels(pool, ticker, Direction::Buy, limit).await?;
    let asks = store::l2_levels(pool, ticker, Direction::Sell, limit).await?;
    Ok(L2OrderBook {
        bid_levels: bids
            .into_iter()
            .map(|(price, qty)| Level { price, qty })
            .collect(),
        ask_levels: asks
            .into_iter()
            .map(|(price, qty)| Level { price, qty })
            .collect(),
    })
}

pub async fn recent_trades(pool: &PgPool, ticker: &str, limit: i64) -> Result<Vec<Trade>, AppError> {
    let limit = limit.clamp(1, MAX_TRADES_LIMIT);
    store::recent_trades(pool, ticker, limit).await
}
