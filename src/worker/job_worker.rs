use rand::Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Semaphore};
use tokio::time::sleep;
use tracing::{error, info};

use crate::workflow::JobConsumer;

/// Upper bound of the random delay added to idle sleeps
const IDLE_JITTER_MS: u64 = 500;

/// Background worker polling the queue through the consumer
pub struct JobWorker {
    consumer: Arc<JobConsumer>,
    poll_interval: Duration,
}

impl JobWorker {
    /// Create a new JobWorker instance
    pub fn new(consumer: Arc<JobConsumer>, poll_interval: Duration) -> Self {
        Self {
            consumer,
            poll_interval,
        }
    }

    /// Run consumer cycles until shutdown is signalled
    ///
    /// # Concurrency Model
    /// - A semaphore permit is held for the whole cycle, bounding jobs in
    ///   progress across all workers
    /// - Acquisition is atomic at the queue, so workers never share a job
    /// - When idle, sleeps `poll_interval` plus a little jitter so workers
    ///   do not poll in lockstep
    /// - A job in progress is finished before the shutdown signal is honoured
    pub async fn run(&self, worker_id: u32, semaphore: Arc<Semaphore>, mut shutdown_rx: watch::Receiver<bool>) {
        info!("Worker {} started", worker_id);

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let permit = tokio::select! {
                permit = semaphore.clone().acquire_owned() => permit,
                _ = shutdown_rx.changed() => break,
            };
            let Ok(permit) = permit else {
                error!("Worker {} semaphore closed", worker_id);
                break;
            };

            let idle = match self.consumer.run_cycle().await {
                Ok(Some(summary)) => {
                    info!(
                        "Worker {} finished job {} ({}) in {:.2}s",
                        worker_id, summary.job_id, summary.status, summary.duration_seconds
                    );
                    None
                }
                Ok(None) => {
                    let jitter = rand::thread_rng().gen_range(0..=IDLE_JITTER_MS);
                    Some(self.poll_interval + Duration::from_millis(jitter))
                }
                Err(e) => {
                    error!("Worker {} encountered queue error: {:?}", worker_id, e);
                    Some(Duration::from_secs(1))
                }
            };
            drop(permit);

            if let Some(pause) = idle {
                tokio::select! {
                    _ = sleep(pause) => {}
                    _ = shutdown_rx.changed() => break,
                }
            }
        }

        info!("Worker {} stopped", worker_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::memory::InMemoryJobQueue;
    use crate::queue::{JobQueue, JobStatus, NewJob};
    use crate::scrape::Segment;
    use crate::workflow::orchestrator::tests::{entry, ScriptedDispatcher};
    use crate::workflow::Orchestrator;

    #[tokio::test(start_paused = true)]
    async fn drains_queue_and_stops_on_shutdown() {
        let queue = Arc::new(InMemoryJobQueue::new());
        let segment = Segment::new("daily", "1");
        let dispatcher = ScriptedDispatcher::new(vec![(segment.clone(), Ok(vec![entry("Ana", 4)]))]);
        let orchestrator = Orchestrator::new(Arc::new(dispatcher), vec![segment], Duration::from_secs(60));
        let consumer = Arc::new(JobConsumer::new(queue.clone(), Arc::new(orchestrator)));
        for profile in ["Ana", "Ana", "Ana"] {
            queue
                .enqueue(NewJob {
                    profile: profile.into(),
                    segments: Vec::new(),
                })
                .await
                .unwrap();
        }

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = JobWorker::new(consumer, Duration::from_secs(5));
        let handle = tokio::spawn(async move {
            worker.run(1, Arc::new(Semaphore::new(1)), shutdown_rx).await;
        });

        sleep(Duration::from_secs(2)).await;
        assert_eq!(queue.count_by_status(JobStatus::Done).await.unwrap(), 3);

        shutdown_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
