use axum::extract::State;
use axum::Json;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::BalanceMap;
use crate::services::ledger;
use crate::state::AppState;

pub async fn get_balance(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<BalanceMap>, AppError> {
    let balances = ledger::snapshot(&state.db.pool, user.id).await?;
    Ok(Json(balances))
}
