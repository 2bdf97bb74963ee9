#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::scrape::Segment;

/// Job status as stored in the queue
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Awaiting,
    Running,
    Done,
    /// Some segments failed, the rest were collected
    Partial,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Awaiting => "AWAITING",
            JobStatus::Running => "RUNNING",
            JobStatus::Done => "DONE",
            JobStatus::Partial => "PARTIAL",
            JobStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "AWAITING" => Ok(JobStatus::Awaiting),
            "RUNNING" => Ok(JobStatus::Running),
            "DONE" => Ok(JobStatus::Done),
            "PARTIAL" => Ok(JobStatus::Partial),
            "FAILED" => Ok(JobStatus::Failed),
            other => Err(QueueError::InvalidStatus(other.to_string())),
        }
    }
}

/// A unit of scrape work requested by a caller
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: i32,
    pub profile: String,
    pub status: JobStatus,
    /// Segments to scrape; empty means the configured default partition
    pub segments: Vec<Segment>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// Submission payload for a new job
#[derive(Debug, Clone)]
pub struct NewJob {
    pub profile: String,
    pub segments: Vec<Segment>,
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("job not found: {0}")]
    NotFound(i32),

    #[error("invalid job status '{0}'")]
    InvalidStatus(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistent job queue shared by every consumer
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// Store a new `AWAITING` job
    async fn enqueue(&self, job: NewJob) -> Result<Job, QueueError>;

    /// Atomically select the oldest `AWAITING` job and mark it `RUNNING`.
    ///
    /// Ordered by submission time, then id. Returns `None` when the queue is idle.
    /// Two concurrent callers never receive the same job.
    async fn acquire_next(&self) -> Result<Option<Job>, QueueError>;

    /// Put `RUNNING` jobs untouched for longer than `older_than` back to `AWAITING`.
    ///
    /// Recovers jobs whose consumer went away before recording a terminal
    /// status. Returns how many jobs were requeued.
    async fn requeue_stale(&self, older_than: Duration) -> Result<u64, QueueError>;

    /// Record a status transition along with the failure reason or result
    async fn mark_status(
        &self,
        id: i32,
        status: JobStatus,
        error: Option<String>,
        result: Option<serde_json::Value>,
    ) -> Result<(), QueueError>;

    async fn get(&self, id: i32) -> Result<Option<Job>, QueueError>;

    async fn count_by_status(&self, status: JobStatus) -> Result<i64, QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_round_trips_through_its_wire_name() {
        for status in [
            JobStatus::Awaiting,
            JobStatus::Running,
            JobStatus::Done,
            JobStatus::Partial,
            JobStatus::Failed,
        ] {
            assert_eq!(status.as_str().parse::<JobStatus>().unwrap(), status);
            assert_eq!(serde_json::to_value(status).unwrap(), status.as_str());
        }
        assert!(matches!("done".parse::<JobStatus>(), Err(QueueError::InvalidStatus(_))));
    }
}
