use actix_web::dev::ServerHandle;
use sqlx::{Pool, Postgres};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Graceful shutdown sequence for the scrape service
///
/// On SIGINT or SIGTERM: stop accepting requests, tell the polling workers to
/// stop after their current job, wait for them, then close the pool. A job
/// started by `GET /workflow` that is still running when the HTTP workers
/// are torn down stays `RUNNING` and is requeued by the next consumption
/// cycle once it is past the job deadline.
pub struct ShutdownCoordinator {
    server_handle: ServerHandle,
    server_task: JoinHandle<Result<(), std::io::Error>>,
    worker_handles: Vec<JoinHandle<()>>,
    shutdown_tx: watch::Sender<bool>,
    pool: Pool<Postgres>,
}

impl ShutdownCoordinator {
    pub fn new(
        server_handle: ServerHandle,
        server_task: JoinHandle<Result<(), std::io::Error>>,
        worker_handles: Vec<JoinHandle<()>>,
        shutdown_tx: watch::Sender<bool>,
        pool: Pool<Postgres>,
    ) -> Self {
        Self {
            server_handle,
            server_task,
            worker_handles,
            shutdown_tx,
            pool,
        }
    }

    /// Block until a shutdown signal arrives, then shut everything down
    pub async fn wait_for_shutdown(self) -> Result<(), std::io::Error> {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to install CTRL+C signal handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("Failed to install SIGTERM signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => info!("Received CTRL+C, shutting down"),
            _ = terminate => info!("Received SIGTERM, shutting down"),
        }

        self.shutdown().await
    }

    async fn shutdown(self) -> Result<(), std::io::Error> {
        self.server_handle.stop(true).await;
        info!("HTTP server stopped accepting requests");

        if self.shutdown_tx.send(true).is_err() {
            warn!("No polling workers were listening for shutdown");
        }

        let total = self.worker_handles.len();
        for (i, handle) in self.worker_handles.into_iter().enumerate() {
            if let Err(e) = handle.await {
                error!("Worker {} did not stop cleanly: {:?}", i + 1, e);
            }
        }
        info!("{} polling workers stopped", total);

        let result = match self.server_task.await {
            Ok(result) => result,
            Err(e) => {
                error!("HTTP server task panicked: {:?}", e);
                Ok(())
            }
        };

        self.pool.close().await;
        info!("Database connections closed, shutdown complete");
        result
    }
}
