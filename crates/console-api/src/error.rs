use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use console_persist::{ErrorKind, PersistError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid request: {0}")]
    BadRequest(String),

    #[error("Persistence error: {0}")]
    Persist(#[from] PersistError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ApiError::Persist(ref e) => match e.kind() {
                ErrorKind::InvalidInput => (StatusCode::BAD_REQUEST, e.to_string()),
                ErrorKind::NotFound => (StatusCode::NOT_FOUND, e.to_string()),
                ErrorKind::Conflict => (StatusCode::CONFLICT, e.to_string()),
                ErrorKind::StorageFailure => {
                    tracing::error!("Persistence error: {}", e);
                    (StatusCode::INTERNAL_SERVER_ERROR, "Storage error".to_string())
                }
            },
        };

        let body = Json(json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
