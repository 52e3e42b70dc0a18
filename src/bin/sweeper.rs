use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;
use tryon_edge::{
    config::AppConfig,
    db::{self, PgJobStore},
    services::jobs,
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

    tracing::info!("Starting stale job sweeper");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    // The server never sweeps, so the sweeper exports its own counters.
    let metrics_addr: SocketAddr = config
        .sweeper_metrics_addr
        .parse()
        .expect("Invalid SWEEPER_METRICS_ADDR");
    PrometheusBuilder::new()
        .with_http_listener(metrics_addr)
        .install()
        .expect("Failed to install Prometheus exporter");
    metrics::describe_counter!(
        "tryon_jobs_swept_total",
        "PENDING jobs failed by the sweeper after their callback never arrived"
    );
    tracing::info!(addr = %metrics_addr, "Serving sweeper metrics");

    tracing::info!("Connecting to PostgreSQL");
    let db_pool = db::init_pool(&config.database_url)
        .await
        .expect("Failed to connect to database");
    let store = PgJobStore::new(db_pool);

    let max_age = chrono::Duration::minutes(config.stale_job_minutes);
    let interval = Duration::from_secs(config.sweep_interval_secs);

    tracing::info!(
        stale_job_minutes = config.stale_job_minutes,
        interval_secs = config.sweep_interval_secs,
        "Sweeper ready"
    );

    loop {
        match jobs::sweep_stale_jobs(&store, max_age).await {
            Ok(swept) if swept.is_empty() => {
                tracing::trace!("No stale jobs, sleeping");
            }
            Ok(swept) => {
                for job_id in &swept {
                    tracing::info!(job_id = %job_id, "Marked stale job as failed");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Sweep failed, will retry");
            }
        }
        sleep(interval).await;
    }
}
