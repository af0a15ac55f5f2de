use std::str::FromStr;

/// Where derived notification payload data is cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    /// Per-process cache, shared by the worker loops of one instance.
    Memory,
    /// Redis cache, shared by every instance pointing at the same server.
    Redis,
}

impl FromStr for CacheBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(CacheBackend::Memory),
            "redis" => Ok(CacheBackend::Redis),
            other => Err(anyhow::anyhow!(
                "NOTIFIER_CACHE_BACKEND must be 'memory' or 'redis', got '{}'",
                other
            )),
        }
    }
}

/// Global application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL connection string
    pub database_url: String,

    /// Maximum number of PostgreSQL connections in the pool (default: 20)
    pub db_max_connections: u32,

    /// Redis connection string, only used by the redis cache backend
    pub redis_url: String,

    /// Public site URL used to build package links (default: https://artifacthub.io)
    pub base_url: String,

    /// Number of worker loops run by one notifier process (default: 2)
    pub notifier_workers: usize,

    /// Payload cache backend (default: memory)
    pub notifier_cache_backend: CacheBackend,

    /// Fixed payload cache expiration in seconds (default: 300)
    pub notifier_cache_ttl_secs: u64,

    /// Timeout applied to outbound webhook and email requests (default: 10)
    pub notifier_http_timeout_secs: u64,

    /// Pause after finding the queue empty, in seconds (default: 30)
    pub notifier_empty_queue_pause_secs: u64,

    /// Pause after a failed iteration, in seconds (default: 10)
    pub notifier_error_pause_secs: u64,

    /// Resend API key for email delivery
    pub resend_api_key: Option<String>,

    /// Email sender address
    pub email_from: Option<String>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?,
            db_max_connections: std::env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "20".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("DB_MAX_CONNECTIONS must be a valid u32"))?,
            redis_url: std::env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            base_url: std::env::var("BASE_URL")
                .unwrap_or_else(|_| "https://artifacthub.io".to_string())
                .trim_end_matches('/')
                .to_string(),
            notifier_workers: std::env::var("NOTIFIER_WORKERS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("NOTIFIER_WORKERS must be a valid usize"))?,
            notifier_cache_backend: std::env::var("NOTIFIER_CACHE_BACKEND")
                .unwrap_or_else(|_| "memory".to_string())
                .parse()?,
            notifier_cache_ttl_secs: std::env::var("NOTIFIER_CACHE_TTL_SECS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("NOTIFIER_CACHE_TTL_SECS must be a valid u64"))?,
            notifier_http_timeout_secs: std::env::var("NOTIFIER_HTTP_TIMEOUT_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("NOTIFIER_HTTP_TIMEOUT_SECS must be a valid u64"))?,
            notifier_empty_queue_pause_secs: std::env::var("NOTIFIER_EMPTY_QUEUE_PAUSE_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .map_err(|_| {
                    anyhow::anyhow!("NOTIFIER_EMPTY_QUEUE_PAUSE_SECS must be a valid u64")
                })?,
            notifier_error_pause_secs: std::env::var("NOTIFIER_ERROR_PAUSE_SECS")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("NOTIFIER_ERROR_PAUSE_SECS must be a valid u64"))?,
            resend_api_key: std::env::var("RESEND_API_KEY").ok().filter(|k| !k.is_empty()),
            email_from: std::env::var("EMAIL_FROM").ok().filter(|f| !f.is_empty()),
        })
    }
}
