use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use hub_common::config::{AppConfig, CacheBackend};
use hub_common::{db, redis_pool};
use hub_notifier::cache::{MemoryPayloadCache, PayloadCache, RedisPayloadCache};
use hub_notifier::channels::{EmailChannel, EmailSender, ResendSender, WebhookChannel};
use hub_notifier::render::TemplateRenderer;
use hub_notifier::store::{PgCatalog, PgNotificationStore};
use hub_notifier::{Worker, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hub_notifier=info,hub_common=info".into()),
        )
        .json()
        .init();

    tracing::info!("Notification worker starting...");

    // Load configuration
    let config = AppConfig::from_env()?;
    let workers = config.notifier_workers.max(1);

    // Connect to database
    let pool = db::create_pool(&config.database_url, config.db_max_connections, workers).await?;

    // Run migrations
    sqlx::migrate!("../../migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    let ttl = Duration::from_secs(config.notifier_cache_ttl_secs);
    let cache: Arc<dyn PayloadCache> = match config.notifier_cache_backend {
        CacheBackend::Memory => Arc::new(MemoryPayloadCache::new(ttl)),
        CacheBackend::Redis => {
            let redis = redis_pool::create_redis_pool(&config.redis_url).await?;
            Arc::new(RedisPayloadCache::new(redis, ttl))
        }
    };

    let http_timeout = Duration::from_secs(config.notifier_http_timeout_secs);
    let email = match (&config.resend_api_key, &config.email_from) {
        (Some(api_key), Some(from)) => {
            let sender: Arc<dyn EmailSender> =
                Arc::new(ResendSender::new(api_key.clone(), from.clone(), http_timeout)?);
            EmailChannel::new(Some(sender))
        }
        (Some(_), None) => {
            anyhow::bail!("EMAIL_FROM is required when RESEND_API_KEY is set");
        }
        _ => {
            tracing::warn!("No email sender configured, email notifications will fail");
            EmailChannel::new(None)
        }
    };
    let webhook = WebhookChannel::new(http_timeout)?;

    let store = Arc::new(PgNotificationStore::new(pool.clone()));
    let catalog = Arc::new(PgCatalog::new(pool));
    let renderer = Arc::new(TemplateRenderer::new(
        config.base_url.clone(),
        cache,
        catalog.clone(),
        catalog,
    )?);
    let worker_config = WorkerConfig {
        empty_queue_pause: Duration::from_secs(config.notifier_empty_queue_pause_secs),
        error_pause: Duration::from_secs(config.notifier_error_pause_secs),
    };

    // Start workers
    let cancel = CancellationToken::new();
    let tracker = TaskTracker::new();
    for id in 0..workers {
        let worker = Worker::new(
            id,
            store.clone(),
            renderer.clone(),
            email.clone(),
            webhook.clone(),
            worker_config,
        );
        let cancel = cancel.clone();
        tracker.spawn(async move { worker.run(cancel).await });
    }
    tracker.close();

    tracing::info!(
        workers,
        cache_backend = ?config.notifier_cache_backend,
        "Notification workers running"
    );

    shutdown_signal().await;
    tracing::info!("Received shutdown signal, waiting for in-flight deliveries...");

    cancel.cancel();
    tracker.wait().await;

    tracing::info!("Notification worker stopped.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
