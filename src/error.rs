use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::db::StoreError;
use crate::services::auth::AuthError;
use crate::services::provider::ProviderError;

/// Application-level error type for HTTP handlers.
///
/// Every variant renders the same JSON envelope:
/// `{"success": false, "error": <message>, "code": <CODE>}`.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or incomplete input from the caller.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or invalid credential or webhook secret. The message is fixed
    /// so callers cannot tell which part failed.
    #[error("Unauthorized")]
    Unauthorized,

    /// Unknown job, or a job the caller does not own.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The provider refused the request (4xx or payload-level error).
    #[error("Upstream rejected request: {0}")]
    UpstreamRejected(String),

    /// The provider's output image could not be downloaded.
    #[error("Upstream fetch failed: {0}")]
    UpstreamFetchFailed(String),

    /// The provider answered without an output image.
    #[error("Upstream returned no result")]
    UpstreamEmptyResult,

    /// The provider failed (5xx, timeout or transport error).
    #[error("Upstream error: {0}")]
    Upstream(String),

    #[error("Database error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn code(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "INVALID_REQUEST",
            AppError::Unauthorized => "UNAUTHORIZED",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::UpstreamRejected(_) => "UPSTREAM_REJECTED",
            AppError::UpstreamFetchFailed(_) => "UPSTREAM_FETCH_FAILED",
            AppError::UpstreamEmptyResult => "UPSTREAM_EMPTY_RESULT",
            AppError::Upstream(_) => "UPSTREAM_ERROR",
            AppError::Store(_) | AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::UpstreamRejected(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Upstream(_) => StatusCode::BAD_GATEWAY,
            AppError::UpstreamFetchFailed(_)
            | AppError::UpstreamEmptyResult
            | AppError::Store(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::InvalidRequest(msg) | AppError::NotFound(msg) => msg.clone(),
            AppError::Unauthorized => "Unauthorized".to_string(),
            AppError::UpstreamRejected(msg) => msg.clone(),
            AppError::UpstreamEmptyResult => "No image returned from model".to_string(),
            AppError::UpstreamFetchFailed(detail) | AppError::Upstream(detail) => {
                tracing::error!(error = %detail, "Upstream failure");
                "Image generation service failed".to_string()
            }
            AppError::Store(err) => {
                tracing::error!(error = %err, "Database error");
                "An internal error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                "An internal error occurred".to_string()
            }
        };

        let body = json!({
            "success": false,
            "error": message,
            "code": self.code(),
        });

        (status, axum::Json(body)).into_response()
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Rejected { message, .. } | ProviderError::Failed(message) => {
                AppError::UpstreamRejected(message)
            }
            ProviderError::EmptyResult => AppError::UpstreamEmptyResult,
            other => AppError::Upstream(other.to_string()),
        }
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        tracing::debug!(error = %err, "Credential rejected");
        AppError::Unauthorized
    }
}
