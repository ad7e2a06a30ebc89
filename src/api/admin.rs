use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;
use validator::Validate;

use crate::auth::AdminUser;
use crate::error::AppError;
use crate::models::{DepositBody, NewInstrumentBody, Ok as OkResponse, User, WithdrawBody};
use crate::services::admin;
use crate::state::AppState;

pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, AppError> {
    let user = admin::delete_user(&state, id).await?;
    Ok(Json(user))
}

pub async fn add_instrument(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(body): Json<NewInstrumentBody>,
) -> Result<Json<OkResponse>, AppError> {
    body.validate()
        .map_err(|e| AppError::ValidationFailed(e.to_string()))?;
    admin::add_instrument(&state, &body.ticker, &body.name).await?;
    Ok(Json(OkResponse::default()))
}

pub async fn delete_instrument(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(ticker): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    admin::delete_instrument(&state, &ticker).await?;
    Ok(Json(OkResponse::default()))
}

pub async fn deposit(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(body): Json<DepositBody>,
) -> Result<Json<OkResponse>, AppError> {
    body.validate()
        .map_err(|e| AppError::ValidationFailed(e.to_string()))?;
    admin::deposit(&state, body.user_id, &body.ticker, body.amount).await?;
    Ok(Json(OkResponse::default()))
}

pub async fn withdraw(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Json(body): Json<WithdrawBody>,
) -> Result<Json<OkResponse>, AppError> {
    body.validate()
        .map_err(|e| AppError::ValidationFailed(e.to_string()))?;
    admin::withdraw(&state, body.user_id, &body.ticker, body.amount).await?;
    Ok(Json(OkResponse::default()))
}
