use sqlx::{postgres::PgPoolOptions, Error, Pool, Postgres};

/// Pool backing the job queue.
///
/// Every consumer cycle, health check and job submission borrows from the
/// same pool, so `max_connections` (`MAX_DB_CONNECTIONS`) should cover the
/// polling workers plus expected HTTP concurrency.
pub async fn get_connection(database_url: &str, max_connections: u32) -> Result<Pool<Postgres>, Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
}
