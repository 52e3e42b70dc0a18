use axum::{routing::get, Router};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

use tryon_edge::{
    app_state::AppState,
    config::AppConfig,
    db::{self, PgJobStore},
    routes,
    services::{
        auth::JwtVerifier, fetch::HttpImageFetcher, provider::ReplicateClient, storage::R2Client,
    },
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing tryon-edge server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);

    metrics::describe_counter!(
        "tryon_generations_total",
        "Synchronous try-on generations by outcome"
    );
    metrics::describe_histogram!(
        "tryon_provider_seconds",
        "Latency of synchronous provider calls"
    );
    metrics::describe_counter!(
        "tryon_webhooks_total",
        "Provider callbacks received, by outcome"
    );
    metrics::describe_counter!(
        "tryon_jobs_completed_total",
        "Jobs moved to COMPLETED by a callback"
    );
    metrics::describe_counter!("tryon_jobs_failed_total", "Jobs moved to FAILED by a callback");

    tracing::info!("Connecting to PostgreSQL database");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");

    if config.run_migrations {
        tracing::info!("Running database migrations");
        db::run_migrations(&db_pool)
            .await
            .expect("Failed to run database migrations");
    }

    tracing::info!(bucket = %config.r2_bucket, "Initializing R2 storage client");
    let r2_client = R2Client::new(
        &config.r2_bucket,
        &config.r2_endpoint,
        &config.r2_access_key,
        &config.r2_secret_key,
        &config.r2_public_url,
    )
    .expect("Failed to initialize R2 client");

    tracing::info!(model = %config.provider_model, "Initializing image provider client");
    let provider = ReplicateClient::new(
        &config.provider_base_url,
        &config.provider_model,
        &config.provider_api_token,
        Duration::from_secs(config.provider_timeout_secs),
    )
    .expect("Failed to initialize provider client");

    let fetcher = HttpImageFetcher::new(Duration::from_secs(config.fetch_timeout_secs))
        .expect("Failed to initialize image fetcher");

    let identity = JwtVerifier::new(&config.jwt_secret, &config.jwt_audience);

    let bind_addr = config.bind_addr.clone();
    let state = AppState::new(
        config,
        PgJobStore::new(db_pool),
        r2_client,
        provider,
        fetcher,
        identity,
    );

    let app = Router::new()
        .route(
            "/metrics",
            get(routes::metrics::prometheus_metrics).with_state(prometheus_handle),
        )
        .merge(routes::build_router(state));

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app).await.expect("Server error");
}
