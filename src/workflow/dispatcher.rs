use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::scrape::stats::AggregateResult;
use crate::scrape::{ProfileEntry, ScrapeError, ScrapePipeline, SegmentRequest};

/// Body of a `/scrape` reply, shared by the endpoint and the remote dispatcher
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentReply {
    pub msg: String,
    pub source_data: Vec<ProfileEntry>,
    pub kpis: AggregateResult,
}

#[derive(Debug, Deserialize)]
struct ErrorReply {
    msg: String,
}

/// Runs the scrape pipeline for one segment, in-process or on another worker
#[async_trait]
pub trait SegmentDispatcher: Send + Sync {
    async fn dispatch(&self, request: &SegmentRequest) -> Result<Vec<ProfileEntry>, ScrapeError>;
}

/// Executes segments on this process
pub struct LocalDispatcher {
    pipeline: Arc<ScrapePipeline>,
}

impl LocalDispatcher {
    pub fn new(pipeline: Arc<ScrapePipeline>) -> Self {
        Self { pipeline }
    }
}

#[async_trait]
impl SegmentDispatcher for LocalDispatcher {
    async fn dispatch(&self, request: &SegmentRequest) -> Result<Vec<ProfileEntry>, ScrapeError> {
        self.pipeline.scrape(request).await
    }
}

/// Sends each segment to `POST {base_url}/scrape` on a sibling worker
pub struct RemoteDispatcher {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteDispatcher {
    /// `timeout` of `None` waits as long as the job deadline allows
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ScrapeError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl SegmentDispatcher for RemoteDispatcher {
    async fn dispatch(&self, request: &SegmentRequest) -> Result<Vec<ProfileEntry>, ScrapeError> {
        let url = format!("{}/scrape", self.base_url);
        debug!("Dispatching {} for {} to {}", request.segment, request.profile, url);

        let response = self
            .client
            .post(&url)
            .query(&[("profile", request.profile.as_str())])
            .json(&request.segment)
            .send()
            .await
            .map_err(|e| ScrapeError::Dispatch(format!("{}: {}", url, e)))?;

        let status = response.status();
        if status.is_success() {
            let reply: SegmentReply = response
                .json()
                .await
                .map_err(|e| ScrapeError::Dispatch(format!("unreadable reply from {}: {}", url, e)))?;
            return Ok(reply.source_data);
        }

        let msg = response
            .json::<ErrorReply>()
            .await
            .map(|reply| reply.msg)
            .unwrap_or_else(|_| status.to_string());
        warn!("Remote scrape of {} answered {}: {}", request.segment, status, msg);

        // Keep the worker's structure verdict distinct from transport failures
        match status {
            StatusCode::UNPROCESSABLE_ENTITY => Err(ScrapeError::ParseStructure(msg)),
            _ => Err(ScrapeError::Dispatch(format!("{} answered {}: {}", url, status, msg))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::stats::compute_stats;
    use crate::scrape::Segment;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn entry(rank: u32) -> ProfileEntry {
        ProfileEntry {
            rank,
            date: "2025-03-01".into(),
            name: "Ana".into(),
            vehicle: "Car".into(),
            input_device: "Pad".into(),
            tyre: "Hard".into(),
            lap_time: "1:30.000".into(),
            fastest_lap: false,
        }
    }

    fn request() -> SegmentRequest {
        SegmentRequest::new("Ana", Segment::new("weekly", "4"))
    }

    #[tokio::test]
    async fn remote_dispatch_posts_segment_and_returns_source_data() {
        let server = MockServer::start().await;
        let entries = vec![entry(3), entry(9)];
        let reply = SegmentReply {
            msg: "Scrape complete".into(),
            kpis: compute_stats(&entries),
            source_data: entries.clone(),
        };
        Mock::given(method("POST"))
            .and(path("/scrape"))
            .and(query_param("profile", "Ana"))
            .and(body_json(serde_json::json!({"leaderboard": "weekly", "stage": "4"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(&reply))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = RemoteDispatcher::new(format!("{}/", server.uri()), None).unwrap();

        assert_eq!(dispatcher.dispatch(&request()).await.unwrap(), entries);
    }

    #[tokio::test]
    async fn remote_structure_error_keeps_its_kind() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(422)
                    .set_body_json(serde_json::json!({"msg": "no leaderboard table", "error": "ParseStructureError"})),
            )
            .mount(&server)
            .await;

        let dispatcher = RemoteDispatcher::new(server.uri(), None).unwrap();
        let err = dispatcher.dispatch(&request()).await.unwrap_err();

        assert!(matches!(err, ScrapeError::ParseStructure(ref msg) if msg == "no leaderboard table"));
    }

    #[tokio::test]
    async fn remote_server_error_is_a_dispatch_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
            .mount(&server)
            .await;

        let dispatcher = RemoteDispatcher::new(server.uri(), None).unwrap();
        let err = dispatcher.dispatch(&request()).await.unwrap_err();

        assert_eq!(err.kind(), "SegmentDispatchFailure");
    }

    #[tokio::test]
    async fn unreachable_worker_is_a_dispatch_failure() {
        // Nothing listens on port 9 of localhost
        let dispatcher = RemoteDispatcher::new("http://127.0.0.1:9", Some(Duration::from_secs(2))).unwrap();

        let err = dispatcher.dispatch(&request()).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Dispatch(_)));
    }
}
