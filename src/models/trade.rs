use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Append-only execution record. Persisted in the `transactions` table even
/// though the domain name is "Trade".
#[derive(Debug, Clone, Serialize)]
pub struct Trade {
    pub id: Uuid,
    pub ticker: String,
    pub amount: i64,
    pub price: i64,
    pub timestamp: DateTime<Utc>,
}
