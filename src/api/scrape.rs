use actix_web::{post, web, HttpResponse};
use actix_web_validator::Json;
use serde::Deserialize;
use tracing::info;

use crate::api::{error::ApiError, state::AppState};
use crate::scrape::stats::compute_stats;
use crate::scrape::{ScrapeError, Segment, SegmentRequest};
use crate::workflow::SegmentReply;

#[derive(Deserialize)]
struct ScrapeQuery {
    profile: Option<String>,
}

/// Scrape one segment directly; also the target of remote dispatch
#[post("/scrape")]
async fn scrape_segment(
    state: web::Data<AppState>,
    query: web::Query<ScrapeQuery>,
    segment: Json<Segment>,
) -> Result<HttpResponse, ApiError> {
    let profile = query
        .into_inner()
        .profile
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| ScrapeError::MissingRequestParameters("profile query parameter is required".to_string()))?;

    let request = SegmentRequest::new(profile, segment.into_inner());
    info!("Direct scrape of {} for {}", request.segment, request.profile);

    let entries = tokio::time::timeout(state.scrape_deadline, state.pipeline.scrape(&request))
        .await
        .map_err(|_| ScrapeError::JobTimeout(state.scrape_deadline))??;

    let msg = if entries.is_empty() {
        format!("Profile {} not found on {}", request.profile, request.segment)
    } else {
        format!("Scraped {} entries for {} on {}", entries.len(), request.profile, request.segment)
    };

    Ok(HttpResponse::Ok().json(SegmentReply {
        msg,
        kpis: compute_stats(&entries),
        source_data: entries,
    }))
}

pub fn scrape_config(config: &mut web::ServiceConfig) {
    config.service(scrape_segment);
}
