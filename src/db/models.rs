use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;

use crate::queue::{Job, QueueError};
use crate::scrape::Segment;

/// Database representation of a job with all fields
#[derive(Debug, FromRow)]
pub struct JobRow {
    pub id: i32,
    pub profile: String,
    pub status: String,
    pub segments: Json<Vec<Segment>>,
    pub error: Option<String>,
    pub result: Option<serde_json::Value>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = QueueError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: row.id,
            profile: row.profile,
            status: row.status.parse()?,
            segments: row.segments.0,
            submitted_at: row.submitted_at,
            updated_at: row.updated_at,
            error: row.error,
            result: row.result,
        })
    }
}
