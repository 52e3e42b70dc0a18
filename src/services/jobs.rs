//! Job lifecycle: applying provider callbacks, resolving result URLs and
//! sweeping jobs whose callback never arrived.

use chrono::Utc;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::{JobStore, StoreError};
use crate::error::{AppError, AppResult};
use crate::models::job::{result_image_path, JobStatus, Transition, TryOnJob};
use crate::models::tryon::{OutputImage, ProviderCallback, ResolvedResult};
use crate::services::storage::ObjectStore;

pub const UNKNOWN_UPSTREAM_ERROR: &str = "Unknown upstream error";
pub const FETCH_FAILED_MESSAGE: &str = "Failed to download result image";
pub const PERSIST_FAILED_MESSAGE: &str = "Failed to store result image";
pub const STALE_JOB_MESSAGE: &str = "Timed out waiting for the generation provider";

/// What a callback did to the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    Completed,
    Failed(String),
    /// The job was already terminal; nothing was written.
    AlreadyTerminal,
}

impl CallbackOutcome {
    pub fn as_label(&self) -> &'static str {
        match self {
            CallbackOutcome::Completed => "completed",
            CallbackOutcome::Failed(_) => "failed",
            CallbackOutcome::AlreadyTerminal => "duplicate",
        }
    }
}

/// Apply an authenticated provider callback to `job_id`.
///
/// Errors are limited to "job not found" and a store that cannot even record
/// a failure; every other problem ends with the job `FAILED`.
pub async fn apply_callback(
    state: &AppState,
    job_id: Uuid,
    callback: &ProviderCallback,
) -> AppResult<CallbackOutcome> {
    let job = state
        .store
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".to_string()))?;

    if job.status.is_terminal() {
        tracing::info!(
            job_id = %job_id,
            status = %job.status,
            request_id = callback.request_id.as_deref().unwrap_or(""),
            "Ignoring callback for terminal job"
        );
        return Ok(CallbackOutcome::AlreadyTerminal);
    }

    let image = match callback.output_image() {
        Some(image) if callback.is_ok() => image,
        _ => {
            let message = callback
                .error_message()
                .unwrap_or_else(|| UNKNOWN_UPSTREAM_ERROR.to_string());
            tracing::warn!(job_id = %job_id, error = %message, "Provider reported failure");
            return record_failure(state.store.as_ref(), job_id, &message).await;
        }
    };

    match persist_result(state, &job, image).await {
        Ok(Transition::Applied) => {
            metrics::counter!("tryon_jobs_completed_total").increment(1);
            tracing::info!(job_id = %job_id, user_id = %job.user_id, "Job completed");
            Ok(CallbackOutcome::Completed)
        }
        Ok(Transition::AlreadyTerminal) => {
            tracing::info!(job_id = %job_id, "Job finished concurrently, result not recorded");
            Ok(CallbackOutcome::AlreadyTerminal)
        }
        Err(err) => {
            tracing::error!(job_id = %job_id, error = %err, "Failed to persist result");
            let message = match err {
                AppError::UpstreamFetchFailed(_) => FETCH_FAILED_MESSAGE,
                _ => PERSIST_FAILED_MESSAGE,
            };
            record_failure(state.store.as_ref(), job_id, message).await
        }
    }
}

/// Download the output image, store it under the owner's prefix and mark the
/// job completed.
async fn persist_result(
    state: &AppState,
    job: &TryOnJob,
    image: OutputImage<'_>,
) -> AppResult<Transition> {
    tracing::debug!(job_id = %job.id, url = %image.url, "Downloading provider output");
    let fetched = state
        .fetcher
        .fetch(image.url)
        .await
        .map_err(|e| AppError::UpstreamFetchFailed(e.to_string()))?;

    let path = result_image_path(job.user_id, job.id);
    let content_type = fetched.resolve_content_type(image.content_type);

    state
        .storage
        .upload(&path, &fetched.bytes, &content_type, true)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    tracing::debug!(job_id = %job.id, path = %path, bytes = fetched.bytes.len(), "Result uploaded");

    Ok(state.store.complete_job(job.id, job.user_id, &path).await?)
}

async fn record_failure(
    store: &dyn JobStore,
    job_id: Uuid,
    message: &str,
) -> AppResult<CallbackOutcome> {
    match store.fail_job(job_id, message).await? {
        Transition::Applied => {
            metrics::counter!("tryon_jobs_failed_total").increment(1);
            Ok(CallbackOutcome::Failed(message.to_string()))
        }
        Transition::AlreadyTerminal => Ok(CallbackOutcome::AlreadyTerminal),
    }
}

/// Viewable URL of a job's output, if it has one.
///
/// A URL stored directly on the job wins; otherwise the result record's path
/// is turned into a public URL.
pub async fn resolve_result(
    store: &dyn JobStore,
    storage: &dyn ObjectStore,
    job: &TryOnJob,
) -> Result<Option<ResolvedResult>, StoreError> {
    if job.status != JobStatus::Completed {
        return Ok(None);
    }

    if let Some(url) = job.result_image_url.as_deref().filter(|u| !u.is_empty()) {
        return Ok(Some(ResolvedResult {
            image_url: url.to_string(),
        }));
    }

    Ok(store.get_result(job.id).await?.map(|r| ResolvedResult {
        image_url: storage.public_url(&r.result_image_path),
    }))
}

/// Fail every job that has been `PENDING` for longer than `max_age`.
pub async fn sweep_stale_jobs(
    store: &dyn JobStore,
    max_age: chrono::Duration,
) -> Result<Vec<Uuid>, StoreError> {
    let cutoff = Utc::now() - max_age;
    let swept = store.fail_stale_jobs(cutoff, STALE_JOB_MESSAGE).await?;
    if !swept.is_empty() {
        metrics::counter!("tryon_jobs_swept_total").increment(swept.len() as u64);
        tracing::warn!(count = swept.len(), cutoff = %cutoff, "Failed stale pending jobs");
    }
    Ok(swept)
}
