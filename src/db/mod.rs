use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use uuid::Uuid;

use crate::models::job::{Transition, TryOnJob, TryOnResult};

/// Initialize PostgreSQL connection pool
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))
}

/// Access to the `tryon_jobs` and `tryon_results` tables.
///
/// Terminal transitions are conditional on the job still being `PENDING`,
/// so concurrent or repeated callbacks resolve to exactly one writer.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Look a job up by id alone. Only the webhook path may do this.
    async fn get_job(&self, job_id: Uuid) -> Result<Option<TryOnJob>, StoreError>;

    /// Look a job up by id, restricted to its owner.
    async fn get_job_for_user(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TryOnJob>, StoreError>;

    async fn get_result(&self, job_id: Uuid) -> Result<Option<TryOnResult>, StoreError>;

    /// Record the result and move the job to `COMPLETED` atomically.
    async fn complete_job(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        result_image_path: &str,
    ) -> Result<Transition, StoreError>;

    /// Move the job to `FAILED` with the given message.
    async fn fail_job(&self, job_id: Uuid, error_message: &str) -> Result<Transition, StoreError>;

    /// Fail every `PENDING` job created before `cutoff`. Returns the ids touched.
    async fn fail_stale_jobs(
        &self,
        cutoff: DateTime<Utc>,
        error_message: &str,
    ) -> Result<Vec<Uuid>, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

pub mod queries;

pub use queries::PgJobStore;
