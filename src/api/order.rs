use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::AppError;
use crate::models::{CreateOrderResponse, Ok as OkResponse, OrderBody, OrderResponse};
use crate::services::lifecycle;
use crate::state::AppState;

pub async fn submit(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(body): Json<OrderBody>,
) -> Result<Json<CreateOrderResponse>, AppError> {
    let order = lifecycle::submit(&state, user.id, body).await?;
    Ok(Json(CreateOrderResponse {
        success: true,
        order_id: order.id,
    }))
}

pub async fn list(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Vec<OrderResponse>>, AppError> {
    let orders = lifecycle::list_orders(&state, user.id).await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

pub async fn get(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderResponse>, AppError> {
    let order = lifecycle::get_order(&state, user.id, id, user.is_admin()).await?;
    Ok(Json(order.into()))
}

pub async fn cancel(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<OkResponse>, AppError> {
    lifecycle::cancel(&state, user.id, id, user.is_admin()).await?;
    Ok(Json(OkResponse::default()))
}
