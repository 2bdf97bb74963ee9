use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::{Job, JobQueue, JobStatus, NewJob, QueueError};

/// Queue held in process memory; a single lock makes acquisition atomic
#[derive(Default)]
pub struct InMemoryJobQueue {
    jobs: Mutex<Vec<Job>>,
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue with an explicit submission time
    pub async fn enqueue_at(&self, job: NewJob, submitted_at: DateTime<Utc>) -> Job {
        let mut jobs = self.jobs.lock().await;
        let job = Job {
            id: jobs.len() as i32 + 1,
            profile: job.profile,
            status: JobStatus::Awaiting,
            segments: job.segments,
            submitted_at,
            updated_at: submitted_at,
            error: None,
            result: None,
        };
        jobs.push(job.clone());
        job
    }

    /// Pretend the job was last touched `by` earlier than it was
    pub async fn backdate(&self, id: i32, by: chrono::Duration) {
        let mut jobs = self.jobs.lock().await;
        if let Some(job) = jobs.iter_mut().find(|job| job.id == id) {
            job.updated_at -= by;
        }
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job: NewJob) -> Result<Job, QueueError> {
        Ok(self.enqueue_at(job, Utc::now()).await)
    }

    async fn acquire_next(&self) -> Result<Option<Job>, QueueError> {
        let mut jobs = self.jobs.lock().await;
        let next = jobs
            .iter_mut()
            .filter(|job| job.status == JobStatus::Awaiting)
            .min_by_key(|job| (job.submitted_at, job.id));

        Ok(next.map(|job| {
            job.status = JobStatus::Running;
            job.updated_at = Utc::now();
            job.clone()
        }))
    }

    async fn requeue_stale(&self, older_than: std::time::Duration) -> Result<u64, QueueError> {
        let Some(cutoff) = chrono::Duration::from_std(older_than)
            .ok()
            .and_then(|lease| Utc::now().checked_sub_signed(lease))
        else {
            return Ok(0);
        };

        let mut jobs = self.jobs.lock().await;
        let mut requeued = 0;
        for job in jobs
            .iter_mut()
            .filter(|job| job.status == JobStatus::Running && job.updated_at < cutoff)
        {
            job.status = JobStatus::Awaiting;
            job.updated_at = Utc::now();
            requeued += 1;
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
        let mut jobs = self.jobs.lock().await;
        let job = jobs
            .iter_mut()
            .find(|job| job.id == id)
            .ok_or(QueueError::NotFound(id))?;

        job.status = status;
        job.updated_at = Utc::now();
        job.error = error;
        job.result = result;
        Ok(())
    }

    async fn get(&self, id: i32) -> Result<Option<Job>, QueueError> {
        Ok(self.jobs.lock().await.iter().find(|job| job.id == id).cloned())
    }

    async fn count_by_status(&self, status: JobStatus) -> Result<i64, QueueError> {
        Ok(self
            .jobs
            .lock()
            .await
            .iter()
            .filter(|job| job.status == status)
            .count() as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashSet;
    use std::sync::Arc;

    fn new_job(profile: &str) -> NewJob {
        NewJob {
            profile: profile.to_string(),
            segments: Vec::new(),
        }
    }

    #[tokio::test]
    async fn acquires_oldest_awaiting_job_first() {
        let queue = InMemoryJobQueue::new();
        let now = Utc::now();
        queue.enqueue_at(new_job("late"), now).await;
        queue.enqueue_at(new_job("early"), now - Duration::minutes(5)).await;
        let running = queue.enqueue_at(new_job("oldest-but-running"), now - Duration::hours(1)).await;
        queue
            .mark_status(running.id, JobStatus::Running, None, None)
            .await
            .unwrap();

        let job = queue.acquire_next().await.unwrap().unwrap();

        assert_eq!(job.profile, "early");
        assert_eq!(job.status, JobStatus::Running);
        assert_eq!(queue.get(job.id).await.unwrap().unwrap().status, JobStatus::Running);
    }

    #[tokio::test]
    async fn equal_timestamps_fall_back_to_insertion_order() {
        let queue = InMemoryJobQueue::new();
        let now = Utc::now();
        queue.enqueue_at(new_job("first"), now).await;
        queue.enqueue_at(new_job("second"), now).await;

        assert_eq!(queue.acquire_next().await.unwrap().unwrap().profile, "first");
        assert_eq!(queue.acquire_next().await.unwrap().unwrap().profile, "second");
        assert!(queue.acquire_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn never_returns_done_or_failed_jobs() {
        let queue = InMemoryJobQueue::new();
        let done = queue.enqueue(new_job("done")).await.unwrap();
        let failed = queue.enqueue(new_job("failed")).await.unwrap();
        queue.mark_status(done.id, JobStatus::Done, None, None).await.unwrap();
        queue
            .mark_status(failed.id, JobStatus::Failed, Some("boom".into()), None)
            .await
            .unwrap();

        assert!(queue.acquire_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn concurrent_acquires_never_share_a_job() {
        let queue = Arc::new(InMemoryJobQueue::new());
        for i in 0..10 {
            queue.enqueue(new_job(&format!("p{i}"))).await.unwrap();
        }

        let handles: Vec<_> = (0..25)
            .map(|_| {
                let queue = queue.clone();
                tokio::spawn(async move { queue.acquire_next().await.unwrap() })
            })
            .collect();

        let mut acquired = Vec::new();
        for handle in handles {
            if let Some(job) = handle.await.unwrap() {
                acquired.push(job.id);
            }
        }

        let unique: HashSet<_> = acquired.iter().collect();
        assert_eq!(acquired.len(), 10);
        assert_eq!(unique.len(), 10);
        assert_eq!(queue.count_by_status(JobStatus::Running).await.unwrap(), 10);
    }

    #[tokio::test]
    async fn stale_running_jobs_are_requeued() {
        let queue = InMemoryJobQueue::new();
        let abandoned = queue.enqueue(new_job("abandoned")).await.unwrap();
        let busy = queue.enqueue(new_job("busy")).await.unwrap();
        queue.acquire_next().await.unwrap();
        queue.acquire_next().await.unwrap();
        queue.backdate(abandoned.id, Duration::hours(2)).await;

        let requeued = queue.requeue_stale(std::time::Duration::from_secs(3600)).await.unwrap();

        assert_eq!(requeued, 1);
        assert_eq!(queue.get(busy.id).await.unwrap().unwrap().status, JobStatus::Running);
        let again = queue.acquire_next().await.unwrap().unwrap();
        assert_eq!(again.id, abandoned.id);
    }

    #[tokio::test]
    async fn finished_jobs_are_never_requeued() {
        let queue = InMemoryJobQueue::new();
        let done = queue.enqueue(new_job("done")).await.unwrap();
        queue.mark_status(done.id, JobStatus::Done, None, None).await.unwrap();
        queue.backdate(done.id, Duration::hours(2)).await;

        assert_eq!(queue.requeue_stale(std::time::Duration::from_secs(60)).await.unwrap(), 0);
        assert!(queue.acquire_next().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn marking_unknown_job_is_not_found() {
        let queue = InMemoryJobQueue::new();

        let err = queue.mark_status(42, JobStatus::Done, None, None).await.unwrap_err();

        assert!(matches!(err, QueueError::NotFound(42)));
    }
}
