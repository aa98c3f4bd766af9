use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use merx_core::Error;

/// HTTP-facing error type. Domain errors carry their own status mapping;
/// everything else collapses to a 500 with the detail kept in the logs.
#[derive(Debug)]
pub enum AppError {
    Domain(Error),
    Unauthorized(String),
    Anyhow(anyhow::Error),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Domain(err)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Anyhow(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Domain(err) => {
                let status = match &err {
                    Error::NotFound(..) => StatusCode::NOT_FOUND,
                    Error::Forbidden(_) => StatusCode::FORBIDDEN,
                    Error::Conflict { .. } | Error::InvalidTransition { .. } => {
                        StatusCode::CONFLICT
                    }
                    Error::InsufficientStock { .. } | Error::Validation { .. } => {
                        StatusCode::BAD_REQUEST
                    }
                    Error::Storage(detail) => {
                        tracing::error!("Storage error: {}", detail);
                        return (
                            StatusCode::INTERNAL_SERVER_ERROR,
                            Json(json!({ "error": "Internal Server Error" })),
                        )
                            .into_response();
                    }
                };
                (status, err.to_string())
            }
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}
