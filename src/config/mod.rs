use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:3000"). Optional for the sweeper.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// PostgreSQL connection string
    pub database_url: String,

    /// Apply the bundled migrations on startup (local development only)
    #[serde(default)]
    pub run_migrations: bool,

    /// API token for the image-generation provider
    pub provider_api_token: String,

    /// Provider REST base URL
    #[serde(default = "default_provider_base_url")]
    pub provider_base_url: String,

    /// Provider model identifier, reported back to callers
    #[serde(default = "default_provider_model")]
    pub provider_model: String,

    /// Upper bound for a synchronous generation call
    #[serde(default = "default_provider_timeout_secs")]
    pub provider_timeout_secs: u64,

    /// Upper bound for downloading the provider's output image
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// Shared secret the provider echoes back in the webhook query string
    pub webhook_secret: String,

    /// HS256 secret used to verify end-user bearer tokens
    pub jwt_secret: String,

    /// Expected `aud` claim of end-user bearer tokens
    #[serde(default = "default_jwt_audience")]
    pub jwt_audience: String,

    /// R2 bucket holding try-on results
    #[serde(default = "default_r2_bucket")]
    pub r2_bucket: String,

    /// R2 access key ID (S3-compatible)
    pub r2_access_key: String,

    /// R2 secret access key (S3-compatible)
    pub r2_secret_key: String,

    /// R2 endpoint URL
    pub r2_endpoint: String,

    /// Public base URL the results bucket is served from
    pub r2_public_url: String,

    /// Age after which a PENDING job is considered abandoned
    #[serde(default = "default_stale_job_minutes")]
    pub stale_job_minutes: i64,

    /// Sweeper poll interval
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Address the sweeper serves its own Prometheus metrics on
    #[serde(default = "default_sweeper_metrics_addr")]
    pub sweeper_metrics_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:3000".to_string()
}

fn default_provider_base_url() -> String {
    "https://api.replicate.com/v1".to_string()
}

fn default_provider_model() -> String {
    "google/nano-banana".to_string()
}

fn default_provider_timeout_secs() -> u64 {
    300
}

fn default_fetch_timeout_secs() -> u64 {
    60
}

fn default_jwt_audience() -> String {
    "authenticated".to_string()
}

fn default_r2_bucket() -> String {
    "tryon-results".to_string()
}

fn default_stale_job_minutes() -> i64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_sweeper_metrics_addr() -> String {
    "0.0.0.0:9091".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn required_vars() -> Vec<(String, String)> {
        [
            ("DATABASE_URL", "postgres://localhost/tryon"),
            ("PROVIDER_API_TOKEN", "r8_token"),
            ("WEBHOOK_SECRET", "hook-secret"),
            ("JWT_SECRET", "jwt-secret"),
            ("R2_ACCESS_KEY", "access"),
            ("R2_SECRET_KEY", "secret"),
            ("R2_ENDPOINT", "https://account.r2.cloudflarestorage.com"),
            ("R2_PUBLIC_URL", "https://cdn.example.com"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    #[test]
    fn test_defaults_applied() {
        let config: AppConfig = envy::from_iter(required_vars()).unwrap();
        assert_eq!(config.bind_addr, "0.0.0.0:3000");
        assert_eq!(config.provider_model, "google/nano-banana");
        assert_eq!(config.provider_timeout_secs, 300);
        assert_eq!(config.jwt_audience, "authenticated");
        assert_eq!(config.r2_bucket, "tryon-results");
        assert!(!config.run_migrations);
        assert_eq!(config.sweeper_metrics_addr, "0.0.0.0:9091");
    }

    #[test]
    fn test_missing_secret_rejected() {
        let vars: Vec<_> = required_vars()
            .into_iter()
            .filter(|(k, _)| k != "WEBHOOK_SECRET")
            .collect();
        assert!(envy::from_iter::<_, AppConfig>(vars).is_err());
    }
}
