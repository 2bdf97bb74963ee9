use actix_web::{get, post, web, HttpResponse};
use actix_web_validator::Json;
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::api::{error::ApiError, state::AppState};
use crate::queue::{Job, NewJob, QueueError};
use crate::scrape::{ScrapeError, Segment};

/// Submission body for a scrape job
#[derive(Deserialize, Debug, Validate)]
pub struct SubmitJob {
    #[validate(length(
        min = 1,
        max = 64,
        message = "Profile must be between 1 and 64 characters"
    ))]
    pub profile: String,
    /// Leave empty to use the configured default partition
    #[serde(default)]
    #[validate(nested)]
    pub segments: Vec<Segment>,
}

#[derive(Serialize)]
struct JobResponse {
    msg: String,
    job: Job,
}

#[post("")]
async fn submit_job(state: web::Data<AppState>, body: Json<SubmitJob>) -> Result<HttpResponse, ApiError> {
    let SubmitJob { profile, segments } = body.into_inner();
    if profile.trim().is_empty() {
        return Err(ScrapeError::MissingRequestParameters("profile".to_string()).into());
    }

    let job = state.queue.enqueue(NewJob { profile, segments }).await?;
    info!("Job {} queued for profile {}", job.id, job.profile);

    Ok(HttpResponse::Created().json(JobResponse {
        msg: "Job queued".to_string(),
        job,
    }))
}

#[get("/{id}")]
async fn get_job(state: web::Data<AppState>, id: web::Path<i32>) -> Result<HttpResponse, ApiError> {
    let id = id.into_inner();
    let job = state.queue.get(id).await?.ok_or(QueueError::NotFound(id))?;

    Ok(HttpResponse::Ok().json(JobResponse {
        msg: format!("Job is {}", job.status),
        job,
    }))
}

pub fn job_config(config: &mut web::ServiceConfig) {
    config.service(web::scope("jobs").service(submit_job).service(get_job));
}
