use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use trellis::analytics::AnalyticsAggregator;
use trellis::api::{create_router, AppState};
use trellis::auth::AuthService;
use trellis::billing::SubscriptionReconciler;
use trellis::config::Config;
use trellis::ingest::{CountryResolver, HttpGeoIpResolver, IngestPipeline, NoopResolver, RateLimiter};
use trellis::storage::{SqliteStorage, Storage};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Loaded configuration");

    // Initialize storage
    info!("Using SQLite storage: {}", config.database.url);
    let storage: Arc<dyn Storage> = Arc::new(
        SqliteStorage::new(&config.database.url, config.database.max_connections).await?,
    );
    storage.init().await?;
    info!("Database initialized successfully");

    // Geo-IP resolver for country enrichment
    let resolver: Arc<dyn CountryResolver> = match config.geoip.endpoint.clone() {
        Some(endpoint) => {
            info!("Geo-IP enrichment via {}", endpoint);
            Arc::new(HttpGeoIpResolver::new(endpoint))
        }
        None => Arc::new(NoopResolver),
    };

    // Ingestion rate limiter, injected rather than global
    let limiter = Arc::new(RateLimiter::new(&config.rate_limit));
    info!(
        "Ingestion rate limit: {} requests per {}s window",
        config.rate_limit.max_requests, config.rate_limit.window_secs
    );

    let pipeline = IngestPipeline::new(Arc::clone(&storage), limiter, resolver);
    let aggregator = AnalyticsAggregator::new(Arc::clone(&storage));
    let reconciler = SubscriptionReconciler::new(Arc::clone(&storage));

    let auth_service = Arc::new(AuthService::new(Arc::clone(&storage)));

    let state = Arc::new(AppState {
        storage,
        pipeline,
        aggregator,
        reconciler,
        webhook_secret: config.billing.webhook_secret.clone(),
        plans: config.plans.clone(),
    });

    let router = create_router(state, auth_service);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("🚀 Trellis listening on http://{}", addr);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
