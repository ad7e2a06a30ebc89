use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// `GET /api/v1/balance` response: `ticker -> amount`.
pub type BalanceMap = std::collections::HashMap<String, i64>;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct DepositBody {
    pub user_id: Uuid,
    pub ticker: String,
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct WithdrawBody {
    pub user_id: Uuid,
    pub ticker: String,
    #[validate(range(min = 1))]
    pub amount: i64,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewInstrumentBody {
    pub name: String,
    pub ticker: String,
}
