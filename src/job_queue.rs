//! Durable queue for property fetch jobs.
//!
//! The orchestrator submits one job per pending fetch and never waits on it.
//! Workers claim jobs with `FOR UPDATE SKIP LOCKED`, so any number of worker
//! processes can drain the same table without handing one job out twice.
//! Delivery is at-least-once: a job left `running` longer than the
//! visibility timeout (its worker died or never reported back) is claimed
//! again, which the idempotent property upsert absorbs.

use crate::errors::AppError;
use crate::models::{FetchJob, JobStatus};
use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;
use uuid::Uuid;

/// How long a claimed job may stay `running` before it is handed out again.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(300);

#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Submits a job for `task_name` carrying `address`. Returns the job id.
    async fn enqueue(&self, task_name: &str, address: &str) -> Result<Uuid, AppError>;

    /// Claims the oldest pending (or stale running) job, if any, and marks
    /// it running.
    async fn claim_next(&self) -> Result<Option<FetchJob>, AppError>;

    async fn mark_completed(&self, job_id: Uuid) -> Result<(), AppError>;

    /// Records the failure. Failed jobs are not retried automatically.
    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgJobQueue {
    pool: PgPool,
    visibility_timeout: Duration,
}

impl PgJobQueue {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            visibility_timeout: DEFAULT_VISIBILITY_TIMEOUT,
        }
    }

    pub fn with_visibility_timeout(mut self, visibility_timeout: Duration) -> Self {
        self.visibility_timeout = visibility_timeout;
        self
    }

    /// Number of jobs currently in `status`.
    pub async fn count_with_status(&self, status: JobStatus) -> Result<i64, AppError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM property_fetch_jobs WHERE status = $1",
        )
        .bind(status.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn finish(
        &self,
        job_id: Uuid,
        status: JobStatus,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE property_fetch_jobs
            SET status = $2, last_error = $3, finished_at = now()
            WHERE id = $1 AND status = 'running'
            "#,
        )
        .bind(job_id)
        .bind(status.as_str())
        .bind(error)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::QueueError(format!("Failed to finish job {}: {}", job_id, e)))?;

        if result.rows_affected() == 0 {
            tracing::warn!(
                "Job {} was not running when marked {}",
                job_id,
                status.as_str()
            );
        }
        Ok(())
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, task_name: &str, address: &str) -> Result<Uuid, AppError> {
        let job_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO property_fetch_jobs (id, task_name, address, status)
            VALUES ($1, $2, $3, 'pending')
            "#,
        )
        .bind(job_id)
        .bind(task_name)
        .bind(address)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::QueueError(format!("Failed to enqueue {}: {}", task_name, e)))?;

        tracing::debug!("Enqueued {} job {} for '{}'", task_name, job_id, address);
        Ok(job_id)
    }

    async fn claim_next(&self) -> Result<Option<FetchJob>, AppError> {
        let job = sqlx::query_as::<_, FetchJob>(
            r#"
            UPDATE property_fetch_jobs
            SET status = 'running', attempts = attempts + 1, started_at = now()
            WHERE id = (
                SELECT id FROM property_fetch_jobs
                WHERE status = 'pending'
                   OR (status = 'running'
                       AND started_at < now() - make_interval(secs => $1))
                ORDER BY created_at ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, task_name, address, attempts, created_at
            "#,
        )
        .bind(self.visibility_timeout.as_secs_f64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::QueueError(format!("Failed to claim job: {}", e)))?;

        if let Some(job) = &job {
            if job.attempts > 1 {
                tracing::warn!(
                    "Reclaimed job {} for '{}' (attempt {})",
                    job.id,
                    job.address,
                    job.attempts
                );
            }
        }

        Ok(job)
    }

    async fn mark_completed(&self, job_id: Uuid) -> Result<(), AppError> {
        self.finish(job_id, JobStatus::Completed, None).await
    }

    async fn mark_failed(&self, job_id: Uuid, error: &str) -> Result<(), AppError> {
        self.finish(job_id, JobStatus::Failed, Some(error)).await
    }
}
