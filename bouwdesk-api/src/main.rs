/// BouwDesk API server entrypoint
use bouwdesk_api::{
    app::{build_router, AppState},
    config::Config,
};
use bouwdesk_shared::db::{migrations::run_migrations, pool::create_pool};
use bouwdesk_shared::gateway::rate_limit::{
    CounterStore, MemoryCounterStore, RateLimiter, RedisCounterStore,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "bouwdesk_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = create_pool(bouwdesk_shared::db::pool::DatabaseConfig {
        url: config.database.url.clone(),
        max_connections: config.database.max_connections,
        ..Default::default()
    })
    .await?;

    run_migrations(&pool).await?;

    let rate_limiter = Arc::new(RateLimiter::new(build_counter_store(&config).await));
    let state = AppState::with_rate_limiter(pool, config.clone(), rate_limiter);

    let app = build_router(state);

    let bind_address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!(%bind_address, "BouwDesk API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Redis-backed counters when configured, in-process counters otherwise
///
/// The in-process store only limits correctly on a single instance;
/// multi-instance deployments must set REDIS_URL.
async fn build_counter_store(config: &Config) -> Arc<dyn CounterStore> {
    let Some(redis_url) = &config.redis.url else {
        tracing::warn!("REDIS_URL not set, using in-process rate limit counters");
        return Arc::new(MemoryCounterStore::new());
    };

    match redis_connection(redis_url).await {
        Ok(store) => {
            tracing::info!("rate limiting backed by Redis");
            Arc::new(store)
        }
        Err(err) => {
            tracing::warn!(error = %err, "Redis unavailable, using in-process rate limit counters");
            Arc::new(MemoryCounterStore::new())
        }
    }
}

async fn redis_connection(url: &str) -> Result<RedisCounterStore, redis::RedisError> {
    let client = redis::Client::open(url)?;
    let manager = redis::aio::ConnectionManager::new(client).await?;
    Ok(RedisCounterStore::new(manager))
}
