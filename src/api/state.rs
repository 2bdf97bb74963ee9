use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::config::ScrapeConfig;
use crate::queue::JobQueue;
use crate::scrape::{HttpPageFetcher, LeaderboardParser, ScrapeError, ScrapePipeline};
use crate::workflow::{JobConsumer, LocalDispatcher, Orchestrator, RemoteDispatcher, SegmentDispatcher};

/// Components shared by every HTTP worker
#[derive(Clone)]
pub struct AppState {
    pub queue: Arc<dyn JobQueue>,
    pub consumer: Arc<JobConsumer>,
    pub pipeline: Arc<ScrapePipeline>,
    /// Ceiling for a direct `/scrape` call
    pub scrape_deadline: Duration,
}

impl AppState {
    /// Wire fetcher, parser, pipeline, dispatcher, orchestrator and consumer from configuration
    pub fn build(config: &ScrapeConfig, queue: Arc<dyn JobQueue>) -> Result<Self, ScrapeError> {
        let fetcher = Arc::new(HttpPageFetcher::new(&config.leaderboard_url, config.request_timeout)?);
        let pipeline = Arc::new(ScrapePipeline::new(
            fetcher,
            LeaderboardParser::new()?,
            config.pipeline_settings(),
        ));

        let dispatcher: Arc<dyn SegmentDispatcher> = match &config.internal_service_url {
            Some(url) => {
                info!("Segments will be dispatched to {}", url);
                // A remote segment spans many page fetches, so REQUEST_TIMEOUT_SECS
                // does not apply here; the job deadline bounds the call
                Arc::new(RemoteDispatcher::new(url, None)?)
            }
            None => {
                info!("Segments will be scraped in-process");
                Arc::new(LocalDispatcher::new(pipeline.clone()))
            }
        };

        let orchestrator = Orchestrator::new(dispatcher, config.default_segments.clone(), config.job_deadline);
        let consumer = JobConsumer::new(queue.clone(), Arc::new(orchestrator));

        Ok(Self {
            queue,
            consumer: Arc::new(consumer),
            pipeline,
            scrape_deadline: config.job_deadline,
        })
    }
}
