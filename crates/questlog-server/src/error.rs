use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use questlog_core::CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Errors a handler can return. Each maps to one status code.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation(e) => ApiError::Validation(e.to_string()),
            e @ CoreError::NotFound { .. } => ApiError::NotFound(e.to_string()),
            e => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("  Request failed: {}", self);
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use questlog_core::ValidationError;

    #[test]
    fn core_errors_map_to_status_codes() {
        let validation: ApiError =
            CoreError::from(ValidationError::MissingField("title".into())).into();
        assert_eq!(validation.status(), StatusCode::BAD_REQUEST);

        let missing: ApiError = CoreError::not_found("Habit", "h1").into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let sync: ApiError = CoreError::Sync("boom".into()).into();
        assert_eq!(sync.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unauthorized_is_401() {
        assert_eq!(
            ApiError::Unauthorized("no user".into()).status(),
            StatusCode::UNAUTHORIZED
        );
    }
}
