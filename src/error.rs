//! Uniform error envelope for the HTTP surface.
//!
//! Every handler returns `Result<T, AppError>`. `AppError` carries both the
//! status code and the `{detail: [{loc, msg, type}]}` body shape used
//! throughout the API.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("missing or invalid authorization header")]
    AuthInvalid,
    #[error("admin access required")]
    AdminRequired,
    #[error("validation failed: {0}")]
    ValidationFailed(String),
    #[error("instrument {0} is unknown")]
    InstrumentUnknown(String),
    #[error("instrument {0} already exists")]
    InstrumentDuplicate(String),
    #[error("insufficient balance")]
    InsufficientBalance,
    #[error("insufficient liquidity to fill market order")]
    InsufficientLiquidity,
    #[error("market orders cannot be cancelled")]
    CannotCancelMarket,
    #[error("order cannot be cancelled once it has started executing")]
    CannotCancelExecuted,
    #[error("not found")]
    NotFound,
    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ValidationError {
    loc: Vec<String>,
    msg: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    detail: Vec<ValidationError>,
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::AuthInvalid => StatusCode::UNAUTHORIZED,
            AppError::AdminRequired => StatusCode::FORBIDDEN,
            AppError::ValidationFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InstrumentUnknown(_)
            | AppError::InstrumentDuplicate(_)
            | AppError::InsufficientBalance
            | AppError::InsufficientLiquidity
            | AppError::CannotCancelMarket
            | AppError::CannotCancelExecuted => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn loc(&self) -> Vec<String> {
        match self {
            AppError::AuthInvalid => vec!["authorization".into()],
            AppError::AdminRequired => vec!["authorization".into()],
            AppError::InstrumentUnknown(_) | AppError::InstrumentDuplicate(_) => {
                vec!["ticker".into()]
            }
            AppError::InsufficientBalance => vec!["balance".into()],
            AppError::InsufficientLiquidity => vec!["qty".into()],
            _ => vec!["body".into()],
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::AuthInvalid | AppError::AdminRequired => "permission_error",
            AppError::Internal(_) => "internal_error",
            _ => "value_error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, AppError::Internal(_)) {
            tracing::error!(error = %self, "internal error");
        } else {
            tracing::warn!(error = %self, "request rejected");
        }
        let body = ErrorEnvelope {
            detail: vec![ValidationError {
                loc: self.loc(),
                msg: self.to_string(),
                kind: self.kind().to_string(),
            }],
        };
        (status, Json(body)).into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}
