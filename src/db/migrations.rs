use sqlx::{Pool, Postgres};
use tracing::info;

/// Create or upgrade the `jobs` table and its dequeue index.
///
/// The scripts in `migrations/` are embedded in the binary; both `serve` and
/// the `migrate` command run this before touching the queue.
pub async fn run_migrations(pool: &Pool<Postgres>) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Applying job queue migrations");

    sqlx::migrate!("./migrations").run(pool).await?;

    info!("Job queue schema is up to date");
    Ok(())
}
