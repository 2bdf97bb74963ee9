pub mod error;
pub mod health;
pub mod jobs;
pub mod scrape;
pub mod state;
pub mod validation;
pub mod workflow;

pub use state::AppState;

use actix_web::web;

/// Register every route of the service
pub fn routes(config: &mut web::ServiceConfig) {
    config
        .configure(health::health_config)
        .configure(workflow::workflow_config)
        .configure(scrape::scrape_config)
        .configure(jobs::job_config);
}
