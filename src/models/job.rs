use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use uuid::Uuid;

/// Lifecycle status of a try-on job.
///
/// `Pending` is set by the submitter; the webhook moves a job to one of the
/// two terminal states and never back.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::Pending)
    }
}

/// A row of `tryon_jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryOnJob {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: JobStatus,
    pub result_image_url: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A row of `tryon_results`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TryOnResult {
    pub job_id: Uuid,
    pub user_id: Uuid,
    pub result_image_path: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of a conditional status update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The job was `PENDING` and now holds the requested terminal state.
    Applied,
    /// The job had already left `PENDING`; nothing was written.
    AlreadyTerminal,
}

/// Storage path of a job's output image, namespaced per user and per job.
pub fn result_image_path(user_id: Uuid, job_id: Uuid) -> String {
    format!("{}/{}/result.jpg", user_id, job_id)
}
