use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use super::{ScrapeError, Segment};

/// Source of raw leaderboard markup
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch the markup for one page of a segment
    async fn fetch_page(&self, segment: &Segment, page: u32) -> Result<String, ScrapeError>;
}

/// Fetches leaderboard pages over HTTP with `GET {base_url}?leaderboard=..&stage=..&page=..`
pub struct HttpPageFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPageFetcher {
    /// Build a fetcher; `timeout` of `None` means no per-request timeout
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, ScrapeError> {
        let mut builder = reqwest::Client::builder()
            .user_agent(concat!("leaderboard-scraper/", env!("CARGO_PKG_VERSION")));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch_page(&self, segment: &Segment, page: u32) -> Result<String, ScrapeError> {
        debug!("Fetching {} page {}", segment, page);

        let page = page.to_string();
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("leaderboard", segment.leaderboard.as_str()),
                ("stage", segment.stage.as_str()),
                ("page", page.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::UnexpectedStatus {
                status: status.as_u16(),
                url: response.url().to_string(),
            });
        }

        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn sends_segment_and_page_as_query_parameters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/leaderboard"))
            .and(query_param("leaderboard", "weekly"))
            .and(query_param("stage", "2"))
            .and(query_param("page", "3"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<table></table>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(format!("{}/leaderboard", server.uri()), None).unwrap();
        let body = fetcher.fetch_page(&Segment::new("weekly", "2"), 3).await.unwrap();

        assert_eq!(body, "<table></table>");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(server.uri(), None).unwrap();
        let err = fetcher.fetch_page(&Segment::new("weekly", "2"), 0).await.unwrap_err();

        assert!(matches!(err, ScrapeError::UnexpectedStatus { status: 503, .. }));
        assert_eq!(err.kind(), "FetchFailure");
    }

    #[tokio::test]
    async fn per_request_timeout_is_applied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let fetcher = HttpPageFetcher::new(server.uri(), Some(Duration::from_millis(50))).unwrap();
        let err = fetcher.fetch_page(&Segment::new("weekly", "2"), 0).await.unwrap_err();

        assert!(matches!(err, ScrapeError::Fetch(ref e) if e.is_timeout()));
    }
}
