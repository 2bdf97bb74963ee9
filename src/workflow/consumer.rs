use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

use super::orchestrator::{JobReport, Orchestrator, SegmentStatus};
use crate::queue::{Job, JobQueue, JobStatus, QueueError};

/// Result of one consumed job
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub job_id: i32,
    pub duration_seconds: f64,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<JobReport>,
}

/// How long past the job deadline a `RUNNING` job may go untouched before it is requeued
const RECLAIM_GRACE: Duration = Duration::from_secs(60);

/// Pulls jobs off the queue and drives them through the orchestrator
#[derive(Clone)]
pub struct JobConsumer {
    queue: Arc<dyn JobQueue>,
    orchestrator: Arc<Orchestrator>,
}

impl JobConsumer {
    pub fn new(queue: Arc<dyn JobQueue>, orchestrator: Arc<Orchestrator>) -> Self {
        Self { queue, orchestrator }
    }

    /// Oldest `AWAITING` job, already marked `RUNNING`; `None` when idle
    pub async fn select_next_job(&self) -> Result<Option<Job>, QueueError> {
        self.queue.acquire_next().await
    }

    /// Orchestrate a job and record its terminal status.
    ///
    /// Orchestration failures end up as `FAILED` with a reason; only queue
    /// errors are returned as `Err`.
    pub async fn run_job(&self, job: &Job) -> Result<RunSummary, QueueError> {
        let started = Instant::now();
        let outcome = self.orchestrator.run(job).await;
        let duration_seconds = started.elapsed().as_secs_f64();

        let summary = match outcome {
            Ok(report) => {
                let status = report.outcome.job_status();
                let error = failed_segments(&report);
                self.queue
                    .mark_status(job.id, status, error.clone(), Some(serde_json::to_value(&report)?))
                    .await?;

                RunSummary {
                    job_id: job.id,
                    duration_seconds,
                    status,
                    error,
                    report: Some(report),
                }
            }
            Err(e) => {
                let reason = format!("{}: {}", e.kind(), e);
                error!("Job {} failed after {:.2}s: {}", job.id, duration_seconds, reason);
                self.queue
                    .mark_status(job.id, JobStatus::Failed, Some(reason.clone()), None)
                    .await?;

                RunSummary {
                    job_id: job.id,
                    duration_seconds,
                    status: JobStatus::Failed,
                    error: Some(reason),
                    report: None,
                }
            }
        };

        info!(
            "Job {} finished: status={}, duration={:.2}s",
            summary.job_id, summary.status, summary.duration_seconds
        );
        Ok(summary)
    }

    /// One queue-consumption cycle; `None` means no job was waiting.
    ///
    /// The acquired job runs on its own task, so it still reaches a terminal
    /// status when the caller stops waiting. Jobs left `RUNNING` past the
    /// deadline by a consumer that went away are requeued first.
    pub async fn run_cycle(&self) -> Result<Option<RunSummary>, QueueError> {
        let requeued = self
            .queue
            .requeue_stale(self.orchestrator.deadline() + RECLAIM_GRACE)
            .await?;
        if requeued > 0 {
            warn!("Requeued {} abandoned RUNNING jobs", requeued);
        }

        let Some(job) = self.select_next_job().await? else {
            return Ok(None);
        };

        let job_id = job.id;
        info!("Acquired job {} for profile {}", job_id, job.profile);

        let started = Instant::now();
        let consumer = self.clone();
        let handle = tokio::spawn(async move { consumer.run_job(&job).await });

        match handle.await {
            Ok(Ok(summary)) => Ok(Some(summary)),
            Ok(Err(e)) => {
                // The job stays RUNNING until requeued if its final status cannot be written
                warn!("Job {} could not be finalised: {}", job_id, e);
                Err(e)
            }
            Err(e) => {
                let reason = format!("job task aborted: {}", e);
                error!("Job {}: {}", job_id, reason);
                self.queue
                    .mark_status(job_id, JobStatus::Failed, Some(reason.clone()), None)
                    .await?;

                Ok(Some(RunSummary {
                    job_id,
                    duration_seconds: started.elapsed().as_secs_f64(),
                    status: JobStatus::Failed,
                    error: Some(reason),
                    report: None,
                }))
            }
        }
    }
}

fn failed_segments(report: &JobReport) -> Option<String> {
    let failed: Vec<String> = report
        .segments
        .iter()
        .filter(|s| s.status == SegmentStatus::Failed)
        .map(|s| {
            let kind = s.failure.as_ref().map(|f| f.kind.as_str()).unwrap_or("unknown");
            format!("{}:{} ({})", s.leaderboard, s.stage, kind)
        })
        .collect();

    if failed.is_empty() {
        None
    } else {
        Some(format!("failed segments: {}", failed.join(", ")))
    }
}
