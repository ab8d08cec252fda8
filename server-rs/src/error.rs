use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::models::RosterCode;
use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Invalid match id: {0}")]
    InvalidMatchId(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn code(&self) -> RosterCode {
        match self {
            AppError::BadRequest(_) => RosterCode::BadRequest,
            AppError::InvalidMatchId(_) => RosterCode::MatchIdInvalid,
            AppError::Unauthorized(_) | AppError::Jwt(_) => RosterCode::Unauthorized,
            AppError::Store(_) => RosterCode::InternalServerError,
            AppError::Internal(_) => RosterCode::UnexpectedError,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::InvalidMatchId(raw) => {
                (StatusCode::BAD_REQUEST, format!("Invalid match id: {raw}"))
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg.clone()),
            AppError::Jwt(_) => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {msg}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = json!({
            "success": false,
            "code": self.code(),
            "message": message,
        });
        (status, Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infrastructure_failures_keep_distinct_codes() {
        let store = AppError::Store(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(store.code(), RosterCode::InternalServerError);
        assert_eq!(
            AppError::Internal("negative amount".into()).code(),
            RosterCode::UnexpectedError
        );
        assert_eq!(
            AppError::InvalidMatchId("abc".into()).code(),
            RosterCode::MatchIdInvalid
        );
    }

    #[test]
    fn internal_errors_render_500() {
        let response = AppError::Internal("negative amount".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
