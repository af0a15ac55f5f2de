use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Connections a worker loop can hold at once: its dequeue transaction plus
/// the catalog read issued while the claim is still open.
pub const CONNECTIONS_PER_WORKER: u32 = 2;

/// Create the PostgreSQL pool shared by `workers` worker loops.
///
/// Fails up front when the pool is too small to serve every loop at once;
/// otherwise loops holding a claim would time out waiting for their own
/// catalog reads.
pub async fn create_pool(
    database_url: &str,
    max_connections: u32,
    workers: usize,
) -> anyhow::Result<PgPool> {
    check_pool_size(max_connections, workers)?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(database_url)
        .await?;

    tracing::info!(max_connections, workers, "Connected to PostgreSQL");
    Ok(pool)
}

/// Check that `max_connections` covers `workers` concurrent loops.
pub fn check_pool_size(max_connections: u32, workers: usize) -> anyhow::Result<()> {
    let required = u32::try_from(workers)
        .unwrap_or(u32::MAX)
        .saturating_mul(CONNECTIONS_PER_WORKER);
    if max_connections < required {
        anyhow::bail!(
            "DB_MAX_CONNECTIONS ({}) must be at least {} to run {} notifier workers",
            max_connections,
            required,
            workers
        );
    }
    Ok(())
}
