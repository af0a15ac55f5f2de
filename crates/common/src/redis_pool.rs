use redis::Client;
use redis::aio::ConnectionManager;

/// Create a Redis connection manager for async operations.
///
/// Only the redis payload cache backend needs one; the in-memory backend
/// never connects. The address is logged without credentials.
pub async fn create_redis_pool(redis_url: &str) -> anyhow::Result<ConnectionManager> {
    let client = Client::open(redis_url)?;
    let addr = client.get_connection_info().addr.to_string();
    let manager = ConnectionManager::new(client).await?;

    tracing::info!(addr = %addr, "Connected to Redis payload cache");
    Ok(manager)
}
