use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::debug;

use crate::db::models::JobRow;
use crate::queue::{Job, JobQueue, JobStatus, NewJob, QueueError};

const JOB_COLUMNS: &str = "id, profile, status, segments, error, result, submitted_at, updated_at";

/// Postgres-backed job queue
#[derive(Clone)]
pub struct PgJobQueue {
    pool: Pool<Postgres>,
}

impl PgJobQueue {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JobQueue for PgJobQueue {
    async fn enqueue(&self, job: NewJob) -> Result<Job, QueueError> {
        debug!("Enqueueing job: profile={}, segments={}", job.profile, job.segments.len());

        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            INSERT INTO jobs (profile, status, segments)
            VALUES ($1, $2, $3)
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(&job.profile)
        .bind(JobStatus::Awaiting.as_str())
        .bind(Json(&job.segments))
        .fetch_one(&self.pool)
        .await?;

        debug!("Job enqueued with id={}", row.id);
        row.try_into()
    }

    async fn acquire_next(&self) -> Result<Option<Job>, QueueError> {
        // Select and mark in one statement; SKIP LOCKED keeps concurrent
        // consumers from ever claiming the same row.
        let row = sqlx::query_as::<_, JobRow>(&format!(
            r#"
            UPDATE jobs
            SET status = $1, updated_at = NOW()
            WHERE id = (
                SELECT id FROM jobs
                WHERE status = $2
                ORDER BY submitted_at ASC, id ASC
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING {JOB_COLUMNS}
            "#
        ))
        .bind(JobStatus::Running.as_str())
        .bind(JobStatus::Awaiting.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Job::try_from).transpose()
    }

    async fn requeue_stale(&self, older_than: Duration) -> Result<u64, QueueError> {
        let requeued = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $1, updated_at = NOW()
            WHERE status = $2 AND updated_at < NOW() - make_interval(secs => $3)
            "#,
        )
        .bind(JobStatus::Awaiting.as_str())
        .bind(JobStatus::Running.as_str())
        .bind(older_than.as_secs_f64())
        .execute(&self.pool)
        .await?
        .rows_affected();

        if requeued > 0 {
            debug!("Requeued {} stale RUNNING jobs", requeued);
        }
        Ok(requeued)
    }

    async fn mark_status(
        &self,
        id: i32,
        status: JobStatus,
        error: Option<String>,
        result: Option<serde_json::Value>,
    ) -> Result<(), QueueError> {
        debug!("Marking job {} as {}", id, status);

        let updated = sqlx::query(
            r#"
            UPDATE jobs
            SET status = $2, error = $3, result = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(status.as_str())
        .bind(error)
        .bind(result)
        .execute(&self.pool)
        .await?;

        if updated.rows_affected() == 0 {
            return Err(QueueError::NotFound(id));
        }
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<Job>, QueueError> {
        let row = sqlx::query_as::<_, JobRow>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(Job::try_from).transpose()
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64, QueueError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM jobs WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}
