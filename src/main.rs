use actix_web::{web, App, HttpServer};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::info;

mod api;
mod cli;
mod config;
mod db;
mod logging;
mod queue;
mod scrape;
mod shutdown;
mod worker;
mod workflow;

use crate::api::AppState;
use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::queue::JobQueue;
use crate::shutdown::ShutdownCoordinator;
use crate::worker::JobWorker;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()
        .expect("Failed to load configuration");

    logging::init(&config.log_dir);

    info!("Starting leaderboard-scraper");
    info!("Configuration loaded successfully:");
    info!("  - Leaderboard URL: {}", config.scrape.leaderboard_url);
    info!("  - Entries per page: {}", config.scrape.entries_per_page);
    info!("  - Pages per leaderboard: {}", config.scrape.pages_per_leaderboard);
    info!("  - Default segments: {}", config.scrape.default_segments.len());
    info!("  - Job deadline: {:?}", config.scrape.job_deadline);
    info!("  - Request timeout: {:?}", config.scrape.request_timeout);
    info!("  - Polling workers: {}", config.num_workers);

    let pool = db::connection::get_connection(&config.database_url, config.max_db_connections)
        .await
        .expect("Failed to connect to database");
    info!("Database connection pool established");

    db::migrations::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    let queue: Arc<dyn JobQueue> = Arc::new(db::PgJobQueue::new(pool.clone()));
    let state = AppState::build(&config.scrape, queue)
        .expect("Failed to build scrape components");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, state, pool).await,
        command => {
            let result = cli::run(command, &state).await;
            pool.close().await;
            result
        }
    }
}

async fn serve(config: Config, state: AppState, pool: sqlx::PgPool) -> std::io::Result<()> {
    // watch channel so every worker sees the same shutdown flag
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs));
    let mut worker_handles = Vec::new();

    for worker_id in 1..=config.num_workers {
        let worker = JobWorker::new(state.consumer.clone(), config.poll_interval);
        let worker_semaphore = semaphore.clone();
        let worker_shutdown_rx = shutdown_rx.clone();

        worker_handles.push(tokio::spawn(async move {
            worker.run(worker_id, worker_semaphore, worker_shutdown_rx).await;
        }));
        info!("Spawned worker {}", worker_id);
    }
    drop(shutdown_rx);

    let max_payload_size = config.max_payload_size;
    let data = web::Data::new(state);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .app_data(web::PayloadConfig::default().limit(max_payload_size))
            .app_data(api::validation::json_config(max_payload_size))
            .configure(api::routes)
    });

    info!("Server starting on http://{}:{}", config.bind_addr, config.port);
    let server = server
        .bind((config.bind_addr.as_str(), config.port))?
        .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    ShutdownCoordinator::new(server_handle, server_task, worker_handles, shutdown_tx, pool)
        .wait_for_shutdown()
        .await
}
