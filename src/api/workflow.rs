use actix_web::{get, web, HttpResponse};
use serde::Serialize;

use crate::api::{error::ApiError, state::AppState};
use crate::queue::JobStatus;
use crate::workflow::JobReport;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkflowResponse {
    msg: String,
    job_id: Option<i32>,
    duration: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<JobStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<JobReport>,
}

/// Run one queue-consumption cycle
///
/// An empty queue is a normal idle state and answers 200 with a null job id.
#[get("/workflow")]
async fn run_workflow(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let Some(summary) = state.consumer.run_cycle().await? else {
        return Ok(HttpResponse::Ok().json(WorkflowResponse {
            msg: "No job available".to_string(),
            job_id: None,
            duration: 0.0,
            status: None,
            error: None,
            result: None,
        }));
    };

    let msg = match summary.status {
        JobStatus::Done => "Job completed",
        JobStatus::Partial => "Job partially completed, some segments failed",
        _ => "Job failed",
    };

    Ok(HttpResponse::Ok().json(WorkflowResponse {
        msg: msg.to_string(),
        job_id: Some(summary.job_id),
        duration: summary.duration_seconds,
        status: Some(summary.status),
        error: summary.error,
        result: summary.report,
    }))
}

pub fn workflow_config(config: &mut web::ServiceConfig) {
    config.service(run_workflow);
}
