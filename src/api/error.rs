use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;
use tracing::{error, warn};

use crate::api::validation::ErrorResponse;
use crate::queue::QueueError;
use crate::scrape::ScrapeError;

/// Errors surfaced by the HTTP handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Scrape(#[from] ScrapeError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

impl ApiError {
    fn kind(&self) -> &'static str {
        match self {
            ApiError::Scrape(e) => e.kind(),
            ApiError::Queue(QueueError::NotFound(_)) => "NotFound",
            ApiError::Queue(_) => "QueueError",
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Scrape(ScrapeError::MissingRequestParameters(_)) => StatusCode::BAD_REQUEST,
            ApiError::Scrape(ScrapeError::ParseStructure(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Scrape(ScrapeError::Fetch(_))
            | ApiError::Scrape(ScrapeError::UnexpectedStatus { .. })
            | ApiError::Scrape(ScrapeError::Dispatch(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Scrape(ScrapeError::JobTimeout(_)) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Scrape(ScrapeError::Selector { .. }) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Queue(QueueError::NotFound(_)) => StatusCode::NOT_FOUND,
            ApiError::Queue(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        let msg = match self {
            // Keep database details out of responses
            ApiError::Queue(e) if status.is_server_error() => {
                error!("Queue error: {:?}", e);
                "Failed to process request".to_string()
            }
            other => {
                warn!("Request failed ({}): {}", status, other);
                other.to_string()
            }
        };

        HttpResponse::build(status).json(ErrorResponse::new(msg, self.kind()))
    }
}
