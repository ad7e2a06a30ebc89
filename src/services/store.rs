//! The Store: a thin layer over `sqlx::PgPool` providing typed accessors and
//! the two ordered scans the order book needs.
//!
//! Mutating accessors take `&mut sqlx::PgConnection` so callers thread a
//! single `sqlx::Transaction` through a whole engine call; read-only
//! accessors take `&PgPool` directly since they don't need a transaction —
//! read-only endpoints never take mutating locks.

use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{Direction, Instrument, Order, OrderStatus, Role, Trade, User};

// ---------------------------------------------------------------------
// Row <-> domain conversions
// ---------------------------------------------------------------------

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    role: String,
    api_key: String,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(r: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: r.id,
            name: r.name,
            role: Role::from_str(&r.role).map_err(AppError::Internal)?,
            api_key: r.api_key,
        })
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    user_id: Uuid,
    ticker: String,
    direction: String,
    qty: i64,
    price: Option<i64>,
    status: String,
    filled: i64,
    timestamp: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = AppError;

    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        Ok(Order {
            id: r.id,
            user_id: r.user_id,
            ticker: r.ticker,
            direction: Direction::from_str(&r.direction).map_err(AppError::Internal)?,
            qty: r.qty,
            price: r.price,
            status: OrderStatus::from_str(&r.status).map_err(AppError::Internal)?,
            filled: r.filled,
            timestamp: r.timestamp,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TradeRow {
    id: Uuid,
    ticker: String,
    amount: i64,
    price: i64,
    timestamp: DateTime<Utc>,
}

impl From<TradeRow> for Trade {
    fn from(r: TradeRow) -> Self {
        Trade {
            id: r.id,
            ticker: r.ticker,
            amount: r.amount,
            price: r.price,
            timestamp: r.timestamp,
        }
    }
}

// ---------------------------------------------------------------------
// Users
// ---------------------------------------------------------------------

pub async fn get_user_by_key(pool: &PgPool, api_key: &str) -> Result<Option<User>, AppError> {
    let row: Option<UserRow> =
        sqlx::query_as("SELECT id, name, role, api_key FROM users WHERE api_key = $1")
            .bind(api_key)
            .fetch_optional(pool)
            .await?;
    row.map(User::try_from).transpose()
}

pub async fn get_user(pool: &PgPool, id: Uuid) -> Result<Option<User>, AppError> {
    let row: Option<UserRow> =
        sqlx::query_as("SELECT id, name, role, api_key FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;
    row.map(User::try_from).transpose()
}

pub async fn insert_user(conn: &mut PgConnection, name: &str, role: Role) -> Result<User, AppError> {
    let id = Uuid::new_v4();
    let api_key = User::new_api_key();
    let role_s = role.to_string();
    sqlx::query("INSERT INTO users (id, name, role, api_key) VALUES ($1, $2, $3, $4)")
        .bind(id)
        .bind(name)
        .bind(&role_s)
        .bind(&api_key)
        .execute(conn)
        .await?;
    Ok(User {
        id,
        name: name.to_string(),
        role,
        api_key,
    })
}

pub async fn delete_user(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>, AppError> {
    let row: Option<UserRow> = sqlx::query_as(
        "DELETE FROM users WHERE id = $1 RETURNING id, name, role, api_key",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.map(User::try_from).transpose()
}

// ---------------------------------------------------------------------
// Instruments
// ---------------------------------------------------------------------

pub async fn get_instrument(pool: &PgPool, ticker: &str) -> Result<Option<Instrument>, AppError> {
    let row = sqlx::query_as::<_, (String, String)>(
        "SELECT ticker, name FROM instruments WHERE ticker = $1",
    )
    .bind(ticker)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|(ticker, name)| Instrument { ticker, name }))
}

pub async fn list_instruments(pool: &PgPool) -> Result<Vec<Instrument>, AppError> {
    let rows = sqlx::query_as::<_, (String, String)>("SELECT ticker, name FROM instruments ORDER BY ticker")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(ticker, name)| Instrument { ticker, name })
        .collect())
}

pub async fn insert_instrument(
    conn: &mut PgConnection,
    ticker: &str,
    name: &str,
) -> Result<Instrument, AppError> {
    let exists: Option<(String,)> =
        sqlx::query_as("SELECT ticker FROM instruments WHERE ticker = $1")
            .bind(ticker)
            .fetch_optional(&mut *conn)
            .await?;
    if exists.is_some() {
        return Err(AppError::InstrumentDuplicate(ticker.to_string()));
    }
    sqlx::query("INSERT INTO instruments (ticker, name) VALUES ($1, $2)")
        .bind(ticker)
        .bind(name)
        .execute(conn)
        .await?;
    Ok(Instrument {
        ticker: ticker.to_string(),
        name: name.to_string(),
    })
}

pub async fn delete_instrument(conn: &mut PgConnection, ticker: &str) -> Result<bool, AppError> {
    let result = sqlx::query("DELETE FROM instruments WHERE ticker = $1")
        .bind(ticker)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}

// ---------------------------------------------------------------------
// Balances
// ---------------------------------------------------------------------

/// Locate-or-create the `(user, ticker)` row under a row-level lock,
/// returning its current amount (0 if it was just created).
pub async fn get_balance_for_update(
    conn: &mut PgConnection,
    user_id: Uuid,
    ticker: &str,
) -> Result<i64, AppError> {
    sqlx::query(
        "INSERT INTO balances (user_id, ticker, amount) VALUES ($1, $2, 0)
         ON CONFLICT (user_id, ticker) DO NOTHING",
    )
    .bind(user_id)
    .bind(ticker)
    .execute(&mut *conn)
    .await?;

    let row: (i64,) = sqlx::query_as(
        "SELECT amount FROM balances WHERE user_id = $1 AND ticker = $2 FOR UPDATE",
    )
    .bind(user_id)
    .bind(ticker)
    .fetch_one(conn)
    .await?;
    Ok(row.0)
}

pub async fn set_balance(
    conn: &mut PgConnection,
    user_id: Uuid,
    ticker: &str,
    amount: i64,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO balances (user_id, ticker, amount) VALUES ($1, $2, $3)
         ON CONFLICT (user_id, ticker) DO UPDATE SET amount = EXCLUDED.amount",
    )
    .bind(user_id)
    .bind(ticker)
    .bind(amount)
    .execute(conn)
    .await?;
    Ok(())
}

pub async fn snapshot_balances(pool: &PgPool, user_id: Uuid) -> Result<HashMap<String, i64>, AppError> {
    let rows: Vec<(String, i64)> =
        sqlx::query_as("SELECT ticker, amount FROM balances WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(pool)
            .await?;
    Ok(rows.into_iter().collect())
}

// ---------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------

#[allow(clippy::too_many_arguments)]
pub async fn insert_order(
    conn: &mut PgConnection,
    id: Uuid,
    user_id: Uuid,
    ticker: &str,
    direction: Direction,
    qty: i64,
    price: Option<i64>,
    timestamp: DateTime<Utc>,
) -> Result<Order, AppError> {
    let status = OrderStatus::New;
    sqlx::query(
        "INSERT INTO orders (id, user_id, ticker, direction, qty, price, status, filled, \"timestamp\")
         VALUES ($1, $2, $3, $4, $5, $6, $7, 0, $8)",
    )
    .bind(id)
    .bind(user_id)
    .bind(ticker)
    .bind(direction.to_string())
    .bind(qty)
    .bind(price)
    .bind(status.to_string())
    .bind(timestamp)
    .execute(conn)
    .await?;

    Ok(Order {
        id,
        user_id,
        ticker: ticker.to_string(),
        direction,
        qty,
        price,
        status,
        filled: 0,
        timestamp,
    })
}

pub async fn get_order(pool: &PgPool, id: Uuid) -> Result<Option<Order>, AppError> {
    let row: Option<OrderRow> = sqlx::query_as(
        "SELECT id, user_id, ticker, direction, qty, price, status, filled, \"timestamp\"
         FROM orders WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;
    row.map(Order::try_from).transpose()
}

/// Load an order row under a row-level lock, for use within a mutating
/// transaction (cancellation, or re-reading a just-matched order).
pub async fn get_order_for_update(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<Order>, AppError> {
    let row: Option<OrderRow> = sqlx::query_as(
        "SELECT id, user_id, ticker, direction, qty, price, status, filled, \"timestamp\"
         FROM orders WHERE id = $1 FOR UPDATE",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;
    row.map(Order::try_from).transpose()
}

pub async fn list_orders_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Order>, AppError> {
    let rows: Vec<OrderRow> = sqlx::query_as(
        "SELECT id, user_id, ticker, direction, qty, price, status, filled, \"timestamp\"
         FROM orders WHERE user_id = $1 ORDER BY \"timestamp\" ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(Order::try_from).collect()
}

pub async fn update_order(conn: &mut PgConnection, order: &Order) -> Result<(), AppError> {
    sqlx::query(
        "UPDATE orders SET status = $1, filled = $2 WHERE id = $3",
    )
    .bind(order.status.to_string())
    .bind(order.filled)
    .bind(order.id)
    .execute(conn)
    .await?;
    Ok(())
}

/// Resting orders of `side`, price-time ordered, locked `FOR UPDATE` because
/// matching is about to mutate every row it returns.
///
/// `price_bound` is `None` for a market aggressor (no bound). For a limit
/// aggressor it is `Some(new_order.price)`: when `side` is `Sell` (the
/// aggressor is buying) this bounds resting asks to `price <= bound`; when
/// `side` is `Buy` (the aggressor is selling) it bounds resting bids to
/// `price >= bound`.
pub async fn scan_resting(
    conn: &mut PgConnection,
    ticker: &str,
    side: Direction,
    price_bound: Option<i64>,
) -> Result<Vec<Order>, AppError> {
    let side_s = side.to_string();
    let order_by = match side {
        Direction::Sell => "price ASC, \"timestamp\" ASC, id ASC",
        Direction::Buy => "price DESC, \"timestamp\" ASC, id ASC",
    };
    let cmp = match side {
        Direction::Sell => "<=",
        Direction::Buy => ">=",
    };

    let rows: Vec<OrderRow> = match price_bound {
        None => {
            let sql = format!(
                "SELECT id, user_id, ticker, direction, qty, price, status, filled, \"timestamp\"
                 FROM orders
                 WHERE ticker = $1 AND direction = $2
                   AND status IN ('NEW', 'PARTIALLY_EXECUTED') AND qty > filled
                   AND price IS NOT NULL
                 ORDER BY {order_by}
                 FOR UPDATE"
            );
            sqlx::query_as(&sql)
                .bind(ticker)
                .bind(&side_s)
                .fetch_all(conn)
                .await?
        }
        Some(p) => {
            let sql = format!(
                "SELECT id, user_id, ticker, direction, qty, price, status, filled, \"timestamp\"
                 FROM orders
                 WHERE ticker = $1 AND direction = $2
                   AND status IN ('NEW', 'PARTIALLY_EXECUTED') AND qty > filled
                   AND price IS NOT NULL AND price {cmp} $3
                 ORDER BY {order_by}
                 FOR UPDATE"
            );
            sqlx::query_as(&sql)
                .bind(ticker)
                .bind(&side_s)
                .bind(p)
                .fetch_all(conn)
                .await?
        }
    };
    rows.into_iter().map(Order::try_from).collect()
}

// ---------------------------------------------------------------------
// Trades
// ---------------------------------------------------------------------

pub async fn insert_trade(
    conn: &mut PgConnection,
    ticker: &str,
    amount: i64,
    price: i64,
    timestamp: DateTime<Utc>,
) -> Result<Trade, AppError> {
    let id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO transactions (id, ticker, amount, price, \"timestamp\") VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(id)
    .bind(ticker)
    .bind(amount)
    .bind(price)
    .bind(timestamp)
    .execute(conn)
    .await?;
    Ok(Trade {
        id,
        ticker: ticker.to_string(),
        amount,
        price,
        timestamp,
    })
}

pub async fn recent_trades(pool: &PgPool, ticker: &str, limit: i64) -> Result<Vec<Trade>, AppError> {
    let rows: Vec<TradeRow> = sqlx::query_as(
        "SELECT id, ticker, amount, price, \"timestamp\" FROM transactions
         WHERE ticker = $1 ORDER BY \"timestamp\" DESC LIMIT $2",
    )
    .bind(ticker)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(Trade::from).collect())
}

// ---------------------------------------------------------------------
// L2 depth
// ---------------------------------------------------------------------

/// One aggregated price level: residual quantity across all resting orders
/// sharing that price.
pub async fn l2_levels(
    pool: &PgPool,
    ticker: &str,
    direction: Direction,
    limit: i64,
) -> Result<Vec<(i64, i64)>, AppError> {
    let order_by = match direction {
        Direction::Buy => "price DESC",
        Direction::Sell => "price ASC",
    };
    let sql = format!(
        "SELECT price, SUM(qty - filled) AS residual FROM orders
         WHERE ticker = $1 AND direction = $2
           AND status IN ('NEW', 'PARTIALLY_EXECUTED') AND qty > filled
           AND price IS NOT NULL
         GROUP BY price
         HAVING SUM(qty - filled) > 0
         ORDER BY {order_by}
         LIMIT $3"
    );
    let rows: Vec<(i64, i64)> = sqlx::query_as(&sql)
        .bind(ticker)
        .bind(direction.to_string())
        .bind(limit)
        .fetch_all(pool)
        .await?;
    Ok(rows)
}
