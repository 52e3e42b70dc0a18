use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::Json;
use uuid::Uuid;

use super::parse_json;
use crate::app_state::AppState;
use crate::error::{AppError, AppResult};
use crate::models::tryon::{ProviderCallback, WebhookAck, WebhookQuery};
use crate::services::{auth::secrets_match, jobs};

/// POST /functions/v1/tryon-webhook?secret=..&job_id=.. — provider callback.
///
/// Acknowledges with 200 whenever the callback is authentic and well formed,
/// including when the job ends up `FAILED`.
pub async fn receive_callback(
    State(state): State<AppState>,
    Query(query): Query<WebhookQuery>,
    body: Bytes,
) -> AppResult<Json<WebhookAck>> {
    let expected = state.config.webhook_secret.as_str();
    let authentic = !expected.is_empty()
        && query
            .secret
            .as_deref()
            .is_some_and(|provided| secrets_match(provided, expected));

    if !authentic {
        metrics::counter!("tryon_webhooks_total", "outcome" => "unauthorized").increment(1);
        tracing::warn!("Rejected webhook with invalid secret");
        return Err(AppError::Unauthorized);
    }

    let job_id = query
        .job_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("job_id is required".to_string()))?;
    let job_id = Uuid::parse_str(job_id)
        .map_err(|_| AppError::InvalidRequest("job_id is not a valid id".to_string()))?;

    let callback: ProviderCallback = parse_json(&body)?;

    tracing::info!(
        job_id = %job_id,
        request_id = callback.request_id.as_deref().unwrap_or(""),
        status = ?callback.status,
        "Received provider callback"
    );

    let outcome = jobs::apply_callback(&state, job_id, &callback).await?;
    metrics::counter!("tryon_webhooks_total", "outcome" => outcome.as_label()).increment(1);

    Ok(Json(WebhookAck { success: true }))
}
