//! HTTP error mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use stratus_engine::EngineError;
use stratus_ports::StoreError;

/// Errors rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The engine refused or could not record an execution.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A management operation failed in the store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Malformed input.
    #[error("{0}")]
    BadRequest(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ApiError {
    /// Status this error renders with.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Engine(err) => {
                StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            Self::Store(err) => store_status(err),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    if err.is_not_found() {
        return StatusCode::NOT_FOUND;
    }
    match err {
        StoreError::InvalidFunction(_) => StatusCode::BAD_REQUEST,
        StoreError::CannotDeleteActiveVersion(_)
        | StoreError::VersionInUse { .. }
        | StoreError::InvalidTransition { .. } => StatusCode::CONFLICT,
        _ if err.is_retryable() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let body = Json(ErrorBody {
            error: self.to_string(),
        });
        (status, body).into_response()
    }
}
