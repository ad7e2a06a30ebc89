//! Bearer-token extractors: `Authorization: TOKEN <api_key>`.
//!
//! `AuthUser` resolves any registered user; `AdminUser` additionally
//! enforces the admin role, so a handler that takes it as an argument gets
//! authorization checked before its body ever runs.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::models::User;
use crate::services::store;
use crate::state::AppState;

pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .ok_or(AppError::AuthInvalid)?;

        let api_key = header.strip_prefix("TOKEN ").ok_or(AppError::AuthInvalid)?;

        let user = store::get_user_by_key(&state.db.pool, api_key)
            .await?
            .ok_or(AppError::AuthInvalid)?;

        Ok(AuthUser(user))
    }
}

pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let AuthUser(user) = AuthUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(AppError::AdminRequired);
        }
        Ok(AdminUser(user))
    }
}
