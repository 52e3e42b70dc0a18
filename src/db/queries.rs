use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use std::str::FromStr;
use uuid::Uuid;

use super::{JobStore, StoreError};
use crate::models::job::{JobStatus, Transition, TryOnJob, TryOnResult};

const JOB_COLUMNS: &str =
    "id, user_id, status, result_image_url, error_message, created_at, updated_at";

/// Postgres-backed [`JobStore`].
#[derive(Clone)]
pub struct PgJobStore {
    pool: PgPool,
}

impl PgJobStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn job_from_row(row: &PgRow) -> Result<TryOnJob, StoreError> {
    let status_str: String = row.try_get("status")?;
    let status = JobStatus::from_str(&status_str)
        .map_err(|_| StoreError::Corrupt(format!("unknown job status '{}'", status_str)))?;

    Ok(TryOnJob {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        status,
        result_image_url: row.try_get("result_image_url")?,
        error_message: row.try_get("error_message")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl JobStore for PgJobStore {
    async fn get_job(&self, job_id: Uuid) -> Result<Option<TryOnJob>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM tryon_jobs WHERE id = $1"
        ))
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn get_job_for_user(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TryOnJob>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {JOB_COLUMNS} FROM tryon_jobs WHERE id = $1 AND user_id = $2"
        ))
        .bind(job_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(job_from_row).transpose()
    }

    async fn get_result(&self, job_id: Uuid) -> Result<Option<TryOnResult>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT job_id, user_id, result_image_path, created_at
            FROM tryon_results
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| {
            Ok::<_, StoreError>(TryOnResult {
                job_id: r.try_get("job_id")?,
                user_id: r.try_get("user_id")?,
                result_image_path: r.try_get("result_image_path")?,
                created_at: r.try_get("created_at")?,
            })
        })
        .transpose()
    }

    async fn complete_job(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        result_image_path: &str,
    ) -> Result<Transition, StoreError> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE tryon_jobs
            SET status = 'COMPLETED',
                error_message = NULL,
                updated_at = NOW()
            WHERE id = $1 AND status = 'PENDING'
            "#,
        )
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

        if updated.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(Transition::AlreadyTerminal);
        }

        sqlx::query(
            r#"
            INSERT INTO tryon_results (job_id, user_id, result_image_path)
            VALUES ($1, $2, $3)
            ON CONFLICT (job_id) DO UPDATE
            SET result_image_path = EXCLUDED.result_image_path
            "#,
        )
        .bind(job_id)
        .bind(user_id)
        .bind(result_image_path)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Transition::Applied)
    }

    async fn fail_job(&self, job_id: Uuid, error_message: &str) -> Result<Transition, StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE tryon_jobs
            SET status = 'FAILED',
                error_message = $1,
                updated_at = NOW()
            WHERE id = $2 AND status = 'PENDING'
            "#,
        )
        .bind(error_message)
        .bind(job_id)
        .execute(&self.pool)
        .await?;

        Ok(if updated.rows_affected() == 0 {
            Transition::AlreadyTerminal
        } else {
            Transition::Applied
        })
    }

    async fn fail_stale_jobs(
        &self,
        cutoff: DateTime<Utc>,
        error_message: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        let rows = sqlx::query(
            r#"
            UPDATE tryon_jobs
            SET status = 'FAILED',
                error_message = $1,
                updated_at = NOW()
            WHERE status = 'PENDING' AND created_at < $2
            RETURNING id
            "#,
        )
        .bind(error_message)
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| r.try_get("id").map_err(StoreError::from))
            .collect()
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
