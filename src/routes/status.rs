use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::Json;
use uuid::Uuid;

use super::parse_json;
use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::tryon::{StatusRequest, StatusResponse};
use crate::services::{auth::bearer_token, jobs};

/// POST /functions/v1/tryon-status — poll a job owned by the caller.
pub async fn get_job_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<StatusResponse>> {
    let header = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = bearer_token(header).ok_or(AppError::Unauthorized)?;
    let user_id = state.identity.resolve(token).await?;

    let request: StatusRequest = parse_json(&body)?;
    let job_id = request
        .job_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("jobId is required".to_string()))?;
    let job_id = Uuid::parse_str(job_id)
        .map_err(|_| AppError::InvalidRequest("jobId is not a valid id".to_string()))?;

    // Jobs of other users are reported exactly like missing ones.
    let job = state
        .store
        .get_job_for_user(job_id, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    let result = jobs::resolve_result(state.store.as_ref(), state.storage.as_ref(), &job).await?;

    tracing::debug!(job_id = %job_id, status = %job.status, has_result = result.is_some(), "Job status polled");

    Ok(Json(StatusResponse {
        job_id: job.id,
        status: job.status,
        error_message: job.error_message,
        result,
    }))
}
