use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vitals_backend::config::{CacheDriver, Config};
use vitals_backend::database;
use vitals_backend::health::{Dependencies, HealthAggregator};
use vitals_backend::services::{
    ActivityLogger, ArrayCache, AuditService, DatabaseCache, KeyValueCache, LocalStorage,
    RedisCache, TracingSink, TrustedProxies,
};
use vitals_backend::{build_router, AppState};

fn build_cache(config: &Config, db_pool: &sqlx::PgPool) -> anyhow::Result<Arc<dyn KeyValueCache>> {
    let cache: Arc<dyn KeyValueCache> = match config.cache_driver {
        CacheDriver::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| anyhow::anyhow!("CACHE_DRIVER=redis requires REDIS_URL"))?;
            Arc::new(RedisCache::open(url)?)
        }
        CacheDriver::Database => Arc::new(DatabaseCache::new(db_pool.clone())),
        CacheDriver::Array => Arc::new(ArrayCache::new()),
    };

    Ok(cache)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let db_pool = database::create_pool(&config.database_url, database::PoolConfig::from_env())?;

    // The service must come up even when the database is down, so it can report that.
    if config.needs_migrations() {
        if let Err(e) = database::migrate(&db_pool).await {
            tracing::warn!("Database migrations did not run: {}", e);
        }
    }

    let storage = LocalStorage::new(&config.storage_root);
    tracing::info!(
        "Cache driver: {}, storage root: {}, queue: {}",
        config.cache_driver.as_str(),
        storage.root().display(),
        config.queue_connection.as_deref().unwrap_or("<not configured>")
    );

    let dependencies = Dependencies {
        database: Arc::new(db_pool.clone()),
        cache: build_cache(&config, &db_pool)?,
        storage: Arc::new(storage),
        queue_connection: config.queue_connection.clone(),
    };

    let mut activity = ActivityLogger::new(&config.app, Arc::new(TracingSink));
    if config.store_activity_logs {
        activity = activity.with_store(Arc::new(AuditService::new(db_pool.clone())));
    }

    let app_state = Arc::new(AppState {
        health: HealthAggregator::new(dependencies, config.app.clone(), config.probe_timeout),
        activity,
        trusted_proxies: TrustedProxies::new(config.trusted_proxies.iter().copied()),
    });

    let app = build_router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.server_addr).await?;
    tracing::info!("Server running on {}", config.server_addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
