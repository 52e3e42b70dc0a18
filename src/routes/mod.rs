use axum::body::{Body, Bytes};
use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::error::{AppError, AppResult};

pub mod generate;
pub mod health;
pub mod metrics;
pub mod status;
pub mod webhook;

pub const GENERATE_PATH: &str = "/functions/v1/tryon-generate";
pub const WEBHOOK_PATH: &str = "/functions/v1/tryon-webhook";
pub const STATUS_PATH: &str = "/functions/v1/tryon-status";

/// Build the try-on API router with its middleware stack.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route(GENERATE_PATH, post(generate::generate_tryon))
        .route(WEBHOOK_PATH, post(webhook::receive_callback))
        .route(STATUS_PATH, post(status::get_job_status))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(preflight))
        .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024)) // 10 MB limit
}

/// OPTIONS — CORS preflight.
///
/// `CorsLayer` answers every OPTIONS request itself with an empty body; this
/// keeps its headers and replaces the body with `ok`.
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let (mut parts, _) = next.run(request).await.into_parts();
    parts.status = StatusCode::OK;
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/plain; charset=utf-8"),
    );
    Response::from_parts(parts, Body::from("ok"))
}

/// Decode a JSON body, reporting problems as `InvalidRequest`.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> AppResult<T> {
    if body.is_empty() {
        return Err(AppError::InvalidRequest("Request body is required".to_string()));
    }
    serde_json::from_slice(body)
        .map_err(|e| AppError::InvalidRequest(format!("Invalid JSON body: {}", e)))
}
