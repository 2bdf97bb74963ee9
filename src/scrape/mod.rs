pub mod error;
pub mod fetcher;
pub mod parser;
pub mod pipeline;
pub mod stats;

use serde::{Deserialize, Serialize};
use validator::Validate;

pub use error::ScrapeError;
pub use fetcher::{HttpPageFetcher, PageFetcher};
pub use parser::LeaderboardParser;
pub use pipeline::ScrapePipeline;

/// One (leaderboard, stage) pair scraped independently
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize, Validate)]
pub struct Segment {
    #[validate(length(min = 1, message = "leaderboard must not be empty"))]
    pub leaderboard: String,
    #[validate(length(min = 1, message = "stage must not be empty"))]
    pub stage: String,
}

impl Segment {
    pub fn new(leaderboard: impl Into<String>, stage: impl Into<String>) -> Self {
        Self {
            leaderboard: leaderboard.into(),
            stage: stage.into(),
        }
    }
}

impl std::fmt::Display for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.leaderboard, self.stage)
    }
}

impl std::str::FromStr for Segment {
    type Err = String;

    /// Parses the `leaderboard:stage` form used by the CLI and `DEFAULT_SEGMENTS`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once(':') {
            Some((leaderboard, stage)) if !leaderboard.trim().is_empty() && !stage.trim().is_empty() => {
                Ok(Segment::new(leaderboard.trim(), stage.trim()))
            }
            _ => Err(format!("invalid segment '{}', expected leaderboard:stage", s)),
        }
    }
}

/// A segment paired with the profile whose rows should be extracted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentRequest {
    pub profile: String,
    pub segment: Segment,
}

impl SegmentRequest {
    pub fn new(profile: impl Into<String>, segment: Segment) -> Self {
        Self {
            profile: profile.into(),
            segment,
        }
    }
}

/// A single leaderboard row belonging to the requested profile
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileEntry {
    pub rank: u32,
    pub date: String,
    pub name: String,
    pub vehicle: String,
    pub input_device: String,
    pub tyre: String,
    pub lap_time: String,
    pub fastest_lap: bool,
}
