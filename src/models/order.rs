use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Buy,
    Sell,
}

impl Direction {
    pub fn opposite(self) -> Self {
        match self {
            Direction::Buy => Direction::Sell,
            Direction::Sell => Direction::Buy,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Direction::Buy => "BUY",
            Direction::Sell => "SELL",
        };
        write!(f, "{s}")
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BUY" => Ok(Direction::Buy),
            "SELL" => Ok(Direction::Sell),
            other => Err(format!("unknown direction {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    New,
    PartiallyExecuted,
    Executed,
    Cancelled,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::New => "NEW",
            OrderStatus::PartiallyExecuted => "PARTIALLY_EXECUTED",
            OrderStatus::Executed => "EXECUTED",
            OrderStatus::Cancelled => "CANCELLED",
        };
        write!(f, "{s}")
    }
}

impl FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(OrderStatus::New),
            "PARTIALLY_EXECUTED" => Ok(OrderStatus::PartiallyExecuted),
            "EXECUTED" => Ok(OrderStatus::Executed),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(format!("unknown order status {other}")),
        }
    }
}

impl OrderStatus {
    /// Status implied by a given `(filled, qty)` pair.
    /// Never returns `Cancelled` — that transition only happens explicitly.
    pub fn from_fill(filled: i64, qty: i64) -> Self {
        if filled >= qty {
            OrderStatus::Executed
        } else if filled > 0 {
            OrderStatus::PartiallyExecuted
        } else {
            OrderStatus::New
        }
    }
}

/// The engine's single internal order record. `price = None` marks a market
/// order: it never rests and is never cancellable.
#[derive(Debug, Clone)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticker: String,
    pub direction: Direction,
    pub qty: i64,
    pub price: Option<i64>,
    pub status: OrderStatus,
    pub filled: i64,
    pub timestamp: DateTime<Utc>,
}

impl Order {
    pub fn is_market(&self) -> bool {
        self.price.is_none()
    }

    pub fn remaining(&self) -> i64 {
        self.qty - self.filled
    }

    pub fn is_resting(&self) -> bool {
        matches!(self.status, OrderStatus::New | OrderStatus::PartiallyExecuted) && self.remaining() > 0
    }
}

// ---------------------------------------------------------------------
// Wire DTOs
// ---------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct LimitOrderBody {
    pub direction: Direction,
    pub ticker: String,
    pub qty: i64,
    pub price: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarketOrderBody {
    pub direction: Direction,
    pub ticker: String,
    pub qty: i64,
}

/// `LimitOrderBody` and `MarketOrderBody` are discriminated purely by the
/// presence of `price` in the JSON body, so the wire type is an untagged
/// union rather than a tagged enum.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OrderBody {
    Limit(LimitOrderBody),
    Market(MarketOrderBody),
}

impl OrderBody {
    pub fn ticker(&self) -> &str {
        match self {
            OrderBody::Limit(b) => &b.ticker,
            OrderBody::Market(b) => &b.ticker,
        }
    }

    pub fn direction(&self) -> Direction {
        match self {
            OrderBody::Limit(b) => b.direction,
            OrderBody::Market(b) => b.direction,
        }
    }

    pub fn qty(&self) -> i64 {
        match self {
            OrderBody::Limit(b) => b.qty,
            OrderBody::Market(b) => b.qty,
        }
    }

    pub fn price(&self) -> Option<i64> {
        match self {
            OrderBody::Limit(b) => Some(b.price),
            OrderBody::Market(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub ticker: String,
    pub direction: Direction,
    pub qty: i64,
    pub price: Option<i64>,
    pub status: OrderStatus,
    pub filled: i64,
    pub timestamp: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(o: Order) -> Self {
        Self {
            id: o.id,
            user_id: o.user_id,
            ticker: o.ticker,
            direction: o.direction,
            qty: o.qty,
            price: o.price,
            status: o.status,
            filled: o.filled,
            timestamp: o.timestamp,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateOrderResponse {
    pub success: bool,
    pub order_id: Uuid,
}

#[derive(Debug, Clone, Serialize)]
pub struct Ok {
    pub success: bool,
}

impl Default for Ok {
    fn default() -> Self {
        Self { success: true }
    }
}
