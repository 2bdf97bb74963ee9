use std::time::Duration;
use thiserror::Error;

/// Failures raised while scraping, dispatching or orchestrating segments
#[derive(Error, Debug)]
pub enum ScrapeError {
    /// Caller omitted the profile or segment details
    #[error("missing request parameters: {0}")]
    MissingRequestParameters(String),

    /// Leaderboard markup no longer matches the expected structure
    #[error("leaderboard markup does not match expected structure: {0}")]
    ParseStructure(String),

    /// Network-level failure talking to the leaderboard source
    #[error("leaderboard request failed: {0}")]
    Fetch(#[from] reqwest::Error),

    /// Leaderboard source answered with a non-success status
    #[error("leaderboard returned HTTP {status} for {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// A sub-job call to another worker failed
    #[error("segment dispatch failed: {0}")]
    Dispatch(String),

    /// The overall job deadline was exceeded
    #[error("job exceeded its deadline of {0:?}")]
    JobTimeout(Duration),

    /// A markup selector failed to compile
    #[error("invalid selector '{selector}': {reason}")]
    Selector { selector: String, reason: String },
}

impl ScrapeError {
    /// Stable taxonomy name reported in job results and error bodies
    pub fn kind(&self) -> &'static str {
        match self {
            ScrapeError::MissingRequestParameters(_) => "MissingRequestParameters",
            ScrapeError::ParseStructure(_) => "ParseStructureError",
            ScrapeError::Fetch(_) | ScrapeError::UnexpectedStatus { .. } => "FetchFailure",
            ScrapeError::Dispatch(_) => "SegmentDispatchFailure",
            ScrapeError::JobTimeout(_) => "JobTimeout",
            ScrapeError::Selector { .. } => "SelectorError",
        }
    }
}
