//! In-memory collaborators and request helpers for router-level tests.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Utc};
use http_body_util::BodyExt;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;
use uuid::Uuid;

use tryon_edge::{
    app_state::AppState,
    config::AppConfig,
    db::{JobStore, StoreError},
    models::job::{JobStatus, Transition, TryOnJob, TryOnResult},
    routes,
    services::{
        auth::{AuthError, IdentityResolver},
        fetch::{FetchError, FetchedImage, ImageFetcher},
        provider::{ProviderError, TryOnProvider},
        storage::{ObjectStore, StorageError},
    },
};

pub const WEBHOOK_SECRET: &str = "hook-secret";
pub const PUBLIC_BASE: &str = "https://cdn.test";
pub const MODEL: &str = "google/nano-banana";
pub const ALICE_TOKEN: &str = "token-alice";
pub const BOB_TOKEN: &str = "token-bob";

pub fn test_config() -> AppConfig {
    AppConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        database_url: "postgres://localhost/tryon_test".to_string(),
        run_migrations: false,
        provider_api_token: "r8_test".to_string(),
        provider_base_url: "http://provider.invalid/v1".to_string(),
        provider_model: MODEL.to_string(),
        provider_timeout_secs: 5,
        fetch_timeout_secs: 5,
        webhook_secret: WEBHOOK_SECRET.to_string(),
        jwt_secret: "jwt-secret".to_string(),
        jwt_audience: "authenticated".to_string(),
        r2_bucket: "tryon-results".to_string(),
        r2_access_key: "access".to_string(),
        r2_secret_key: "secret".to_string(),
        r2_endpoint: "http://r2.invalid".to_string(),
        r2_public_url: PUBLIC_BASE.to_string(),
        stale_job_minutes: 30,
        sweep_interval_secs: 60,
        sweeper_metrics_addr: "127.0.0.1:9091".to_string(),
    }
}

// =============================================================================
// Job store
// =============================================================================

#[derive(Default)]
struct StoreState {
    jobs: HashMap<Uuid, TryOnJob>,
    results: Vec<TryOnResult>,
    fail_completions: bool,
}

#[derive(Clone, Default)]
pub struct MemoryJobStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryJobStore {
    pub fn insert_job(&self, user_id: Uuid, status: JobStatus, created_at: DateTime<Utc>) -> Uuid {
        let job = TryOnJob {
            id: Uuid::new_v4(),
            user_id,
            status,
            result_image_url: None,
            error_message: None,
            created_at,
            updated_at: created_at,
        };
        let id = job.id;
        self.state.lock().unwrap().jobs.insert(id, job);
        id
    }

    pub fn pending_job(&self, user_id: Uuid) -> Uuid {
        self.insert_job(user_id, JobStatus::Pending, Utc::now())
    }

    pub fn job(&self, job_id: Uuid) -> TryOnJob {
        self.state.lock().unwrap().jobs[&job_id].clone()
    }

    pub fn results_for(&self, job_id: Uuid) -> Vec<TryOnResult> {
        self.state
            .lock()
            .unwrap()
            .results
            .iter()
            .filter(|r| r.job_id == job_id)
            .cloned()
            .collect()
    }

    pub fn set_direct_url(&self, job_id: Uuid, url: &str) {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.result_image_url = Some(url.to_string());
        }
    }

    pub fn set_status(&self, job_id: Uuid, status: JobStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(job) = state.jobs.get_mut(&job_id) {
            job.status = status;
        }
    }

    pub fn add_result(&self, job_id: Uuid, user_id: Uuid, path: &str) {
        self.state.lock().unwrap().results.push(TryOnResult {
            job_id,
            user_id,
            result_image_path: path.to_string(),
            created_at: Utc::now(),
        });
    }

    pub fn fail_completions(&self, fail: bool) {
        self.state.lock().unwrap().fail_completions = fail;
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn get_job(&self, job_id: Uuid) -> Result<Option<TryOnJob>, StoreError> {
        Ok(self.state.lock().unwrap().jobs.get(&job_id).cloned())
    }

    async fn get_job_for_user(
        &self,
        job_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<TryOnJob>, StoreError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .jobs
            .get(&job_id)
            .filter(|j| j.user_id == user_id)
            .cloned())
    }

    async fn get_result(&self, job_id: Uuid) -> Result<Option<TryOnResult>, StoreError> {
        Ok(self.results_for(job_id).into_iter().next())
    }

    async fn complete_job(
        &self,
        job_id: Uuid,
        user_id: Uuid,
        result_image_path: &str,
    ) -> Result<Transition, StoreError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_completions {
            return Err(StoreError::Database(sqlx::Error::PoolTimedOut));
        }
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        if job.status != JobStatus::Pending {
            return Ok(Transition::AlreadyTerminal);
        }
        job.status = JobStatus::Completed;
        job.updated_at = Utc::now();
        state.results.push(TryOnResult {
            job_id,
            user_id,
            result_image_path: result_image_path.to_string(),
            created_at: Utc::now(),
        });
        Ok(Transition::Applied)
    }

    async fn fail_job(&self, job_id: Uuid, error_message: &str) -> Result<Transition, StoreError> {
        let mut state = self.state.lock().unwrap();
        let job = state
            .jobs
            .get_mut(&job_id)
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))?;
        if job.status != JobStatus::Pending {
            return Ok(Transition::AlreadyTerminal);
        }
        job.status = JobStatus::Failed;
        job.error_message = Some(error_message.to_string());
        Ok(Transition::Applied)
    }

    async fn fail_stale_jobs(
        &self,
        cutoff: DateTime<Utc>,
        error_message: &str,
    ) -> Result<Vec<Uuid>, StoreError> {
        let mut state = self.state.lock().unwrap();
        let mut swept = Vec::new();
        for job in state.jobs.values_mut() {
            if job.status == JobStatus::Pending && job.created_at < cutoff {
                job.status = JobStatus::Failed;
                job.error_message = Some(error_message.to_string());
                swept.push(job.id);
            }
        }
        Ok(swept)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

// =============================================================================
// Object store
// =============================================================================

#[derive(Debug, Clone)]
pub struct Upload {
    pub path: String,
    pub size: usize,
    pub content_type: String,
}

#[derive(Clone, Default)]
pub struct MemoryObjectStore {
    uploads: Arc<Mutex<Vec<Upload>>>,
    fail: Arc<Mutex<bool>>,
}

impl MemoryObjectStore {
    pub fn uploads(&self) -> Vec<Upload> {
        self.uploads.lock().unwrap().clone()
    }

    pub fn fail_uploads(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn upload(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError> {
        if *self.fail.lock().unwrap() {
            return Err(StorageError::Status(503));
        }
        let mut uploads = self.uploads.lock().unwrap();
        if !upsert && uploads.iter().any(|u| u.path == path) {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }
        uploads.push(Upload {
            path: path.to_string(),
            size: data.len(),
            content_type: content_type.to_string(),
        });
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", PUBLIC_BASE, path)
    }
}

// =============================================================================
// Provider
// =============================================================================

#[derive(Debug, Clone)]
pub enum StubOutcome {
    Url(String),
    Rejected(String),
    Unavailable,
    Empty,
}

#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub prompt: String,
    pub image_urls: Vec<String>,
}

#[derive(Clone)]
pub struct StubProvider {
    outcome: Arc<Mutex<StubOutcome>>,
    calls: Arc<Mutex<Vec<ProviderCall>>>,
}

impl Default for StubProvider {
    fn default() -> Self {
        Self {
            outcome: Arc::new(Mutex::new(StubOutcome::Url(
                "https://replicate.delivery/out.jpg".to_string(),
            ))),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl StubProvider {
    pub fn set_outcome(&self, outcome: StubOutcome) {
        *self.outcome.lock().unwrap() = outcome;
    }

    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TryOnProvider for StubProvider {
    fn model(&self) -> &str {
        MODEL
    }

    async fn generate(&self, prompt: &str, image_urls: &[String]) -> Result<String, ProviderError> {
        self.calls.lock().unwrap().push(ProviderCall {
            prompt: prompt.to_string(),
            image_urls: image_urls.to_vec(),
        });
        let outcome = self.outcome.lock().unwrap().clone();
        match outcome {
            StubOutcome::Url(url) => Ok(url),
            StubOutcome::Rejected(message) => Err(ProviderError::Rejected {
                status: 422,
                message,
            }),
            StubOutcome::Unavailable => Err(ProviderError::Unavailable {
                status: 503,
                message: "model overloaded".to_string(),
            }),
            StubOutcome::Empty => Err(ProviderError::EmptyResult),
        }
    }
}

// =============================================================================
// Image fetcher
// =============================================================================

#[derive(Clone, Default)]
pub struct StubFetcher {
    fail: Arc<Mutex<bool>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl StubFetcher {
    pub fn fail_fetches(&self, fail: bool) {
        *self.fail.lock().unwrap() = fail;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageFetcher for StubFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        self.calls.lock().unwrap().push(url.to_string());
        if *self.fail.lock().unwrap() {
            return Err(FetchError::Status(404));
        }
        Ok(FetchedImage {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10],
            content_type: Some("image/jpeg".to_string()),
        })
    }
}

// =============================================================================
// Identity
// =============================================================================

#[derive(Clone)]
pub struct StaticIdentity {
    users: HashMap<String, Uuid>,
}

#[async_trait]
impl IdentityResolver for StaticIdentity {
    async fn resolve(&self, token: &str) -> Result<Uuid, AuthError> {
        self.users
            .get(token)
            .copied()
            .ok_or(AuthError::InvalidSubject)
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub store: MemoryJobStore,
    pub storage: MemoryObjectStore,
    pub provider: StubProvider,
    pub fetcher: StubFetcher,
    pub alice: Uuid,
    pub bob: Uuid,
    state: AppState,
}

impl Harness {
    pub fn new() -> Self {
        let store = MemoryJobStore::default();
        let storage = MemoryObjectStore::default();
        let provider = StubProvider::default();
        let fetcher = StubFetcher::default();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let identity = StaticIdentity {
            users: HashMap::from([
                (ALICE_TOKEN.to_string(), alice),
                (BOB_TOKEN.to_string(), bob),
            ]),
        };

        let state = AppState::new(
            test_config(),
            store.clone(),
            storage.clone(),
            provider.clone(),
            fetcher.clone(),
            identity,
        );

        Self {
            store,
            storage,
            provider,
            fetcher,
            alice,
            bob,
            state,
        }
    }

    pub fn app(&self) -> Router {
        routes::build_router(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, body)
    }
}

pub fn post_json(uri: &str, body: &Value, bearer: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = bearer {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn webhook_uri(secret: Option<&str>, job_id: Option<Uuid>) -> String {
    let mut params = Vec::new();
    if let Some(secret) = secret {
        params.push(format!("secret={}", secret));
    }
    if let Some(job_id) = job_id {
        params.push(format!("job_id={}", job_id));
    }
    format!("{}?{}", routes::WEBHOOK_PATH, params.join("&"))
}

pub fn ok_callback(image_url: &str) -> Value {
    serde_json::json!({
        "request_id": "req-123",
        "status": "OK",
        "payload": {
            "image": {
                "url": image_url,
                "width": 768,
                "height": 1024,
                "content_type": "image/jpeg"
            }
        }
    })
}

pub fn error_callback(error: &str) -> Value {
    serde_json::json!({
        "request_id": "req-123",
        "status": "ERROR",
        "error": error
    })
}
