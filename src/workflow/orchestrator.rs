use futures_util::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

use super::dispatcher::SegmentDispatcher;
use crate::queue::{Job, JobStatus};
use crate::scrape::stats::{compute_stats, AggregateResult};
use crate::scrape::{ProfileEntry, ScrapeError, Segment, SegmentRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobOutcome {
    Complete,
    /// At least one segment failed and at least one succeeded
    Partial,
    Failed,
}

impl JobOutcome {
    pub fn job_status(self) -> JobStatus {
        match self {
            JobOutcome::Complete => JobStatus::Done,
            JobOutcome::Partial => JobStatus::Partial,
            JobOutcome::Failed => JobStatus::Failed,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SegmentStatus {
    Ok,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SegmentFailure {
    pub kind: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentReport {
    pub leaderboard: String,
    pub stage: String,
    pub status: SegmentStatus,
    pub entries: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<SegmentFailure>,
}

/// Collected result of every segment of one job
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub profile: String,
    pub outcome: JobOutcome,
    pub segments: Vec<SegmentReport>,
    pub entries: Vec<ProfileEntry>,
    pub kpis: AggregateResult,
}

/// Fans a job out into one dispatch per segment and gathers the results
pub struct Orchestrator {
    dispatcher: Arc<dyn SegmentDispatcher>,
    default_segments: Vec<Segment>,
    deadline: Duration,
}

impl Orchestrator {
    pub fn new(dispatcher: Arc<dyn SegmentDispatcher>, default_segments: Vec<Segment>, deadline: Duration) -> Self {
        Self {
            dispatcher,
            default_segments,
            deadline,
        }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// The job's own segments, or the configured partition when it has none
    pub fn partition<'a>(&'a self, job: &'a Job) -> Result<&'a [Segment], ScrapeError> {
        let segments = if job.segments.is_empty() {
            &self.default_segments
        } else {
            &job.segments
        };

        if segments.is_empty() {
            return Err(ScrapeError::MissingRequestParameters(
                "job has no segments and no default partition is configured".to_string(),
            ));
        }
        Ok(segments)
    }

    /// Dispatch every segment concurrently and wait for all of them.
    ///
    /// Segment failures are recorded in the report. Exceeding the deadline
    /// cancels every in-flight dispatch and yields `JobTimeout`.
    pub async fn run(&self, job: &Job) -> Result<JobReport, ScrapeError> {
        if job.profile.trim().is_empty() {
            return Err(ScrapeError::MissingRequestParameters("profile".to_string()));
        }
        let segments = self.partition(job)?;
        info!("Job {}: dispatching {} segments for {}", job.id, segments.len(), job.profile);

        let dispatches = segments.iter().map(|segment| {
            let request = SegmentRequest::new(job.profile.clone(), segment.clone());
            async move {
                let result = self.dispatcher.dispatch(&request).await;
                (request.segment, result)
            }
        });

        let results = tokio::time::timeout(self.deadline, join_all(dispatches))
            .await
            .map_err(|_| {
                error!("Job {} exceeded deadline of {:?}, cancelling segments", job.id, self.deadline);
                ScrapeError::JobTimeout(self.deadline)
            })?;

        let mut reports = Vec::with_capacity(results.len());
        let mut entries = Vec::new();

        for (segment, result) in results {
            match result {
                Ok(found) => {
                    reports.push(SegmentReport {
                        leaderboard: segment.leaderboard,
                        stage: segment.stage,
                        status: SegmentStatus::Ok,
                        entries: found.len(),
                        failure: None,
                    });
                    entries.extend(found);
                }
                Err(e) => {
                    warn!("Job {}: segment {} failed: {}", job.id, segment, e);
                    reports.push(SegmentReport {
                        leaderboard: segment.leaderboard,
                        stage: segment.stage,
                        status: SegmentStatus::Failed,
                        entries: 0,
                        failure: Some(SegmentFailure {
                            kind: e.kind().to_string(),
                            reason: e.to_string(),
                        }),
                    });
                }
            }
        }

        let failed = reports
            .iter()
            .filter(|r| r.status == SegmentStatus::Failed)
            .count();
        let outcome = match failed {
            0 => JobOutcome::Complete,
            n if n == reports.len() => JobOutcome::Failed,
            _ => JobOutcome::Partial,
        };

        info!(
            "Job {}: {:?} with {} entries, {}/{} segments failed",
            job.id,
            outcome,
            entries.len(),
            failed,
            reports.len()
        );

        Ok(JobReport {
            profile: job.profile.clone(),
            outcome,
            segments: reports,
            kpis: compute_stats(&entries),
            entries,
        })
    }
}
