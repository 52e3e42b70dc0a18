use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Image model that composites garments onto a subject photo.
#[async_trait]
pub trait TryOnProvider: Send + Sync {
    /// Model identifier reported back to callers.
    fn model(&self) -> &str;

    /// Run one generation and return the output image URL.
    ///
    /// `image_urls[0]` is the subject; the rest are garments in order.
    async fn generate(&self, prompt: &str, image_urls: &[String]) -> Result<String, ProviderError>;
}

/// Client for a Replicate-style predictions API, called in blocking
/// ("Prefer: wait") mode.
pub struct ReplicateClient {
    http: Client,
    base_url: String,
    model: String,
    api_token: String,
}

#[derive(Deserialize)]
struct PredictionResponse {
    status: Option<String>,
    #[serde(default)]
    output: serde_json::Value,
    #[serde(default)]
    error: serde_json::Value,
}

impl ReplicateClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_token: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(ProviderError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_token: api_token.to_string(),
        })
    }
}

#[async_trait]
impl TryOnProvider for ReplicateClient {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str, image_urls: &[String]) -> Result<String, ProviderError> {
        let url = format!("{}/models/{}/predictions", self.base_url, self.model);

        let request_body = serde_json::json!({
            "input": {
                "prompt": prompt,
                "image_input": image_urls,
                "output_format": "jpg"
            }
        });

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&request_body)
            .send()
            .await
            .map_err(ProviderError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }

        let prediction: PredictionResponse = response.json().await.map_err(ProviderError::Http)?;

        if let Some(message) = payload_error(&prediction.error) {
            return Err(ProviderError::Failed(message));
        }
        if matches!(prediction.status.as_deref(), Some("failed") | Some("canceled")) {
            return Err(ProviderError::Failed(format!(
                "Prediction {}",
                prediction.status.unwrap_or_default()
            )));
        }

        first_output(&prediction.output).ok_or(ProviderError::EmptyResult)
    }
}

/// Output may be a single URL or a list of URLs; the first one wins.
pub fn first_output(output: &serde_json::Value) -> Option<String> {
    match output {
        serde_json::Value::String(url) if !url.is_empty() => Some(url.clone()),
        serde_json::Value::Array(items) => items.iter().find_map(first_output),
        _ => None,
    }
}

fn payload_error(error: &serde_json::Value) -> Option<String> {
    match error {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) if s.is_empty() => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Pull a readable message out of an error body (`detail`, `error` or raw).
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            ["detail", "error", "title"]
                .iter()
                .find_map(|key| v.get(*key).and_then(|d| d.as_str()).map(str::to_string))
        })
        .unwrap_or_else(|| body.chars().take(500).collect())
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Provider unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Generation failed: {0}")]
    Failed(String),

    #[error("No image returned from model")]
    EmptyResult,
}

impl ProviderError {
    fn from_status(status: StatusCode, body: &str) -> Self {
        let message = error_detail(body);
        if status.is_client_error() {
            ProviderError::Rejected {
                status: status.as_u16(),
                message,
            }
        } else {
            ProviderError::Unavailable {
                status: status.as_u16(),
                message,
            }
        }
    }
}
