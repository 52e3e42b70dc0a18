use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// Downloaded image bytes plus whatever content type the server declared.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl FetchedImage {
    /// Best-known content type: the given hint, the server header, or the
    /// format sniffed from the bytes. Falls back to JPEG.
    pub fn resolve_content_type(&self, hint: Option<&str>) -> String {
        hint.filter(|h| h.starts_with("image/"))
            .map(str::to_string)
            .or_else(|| {
                self.content_type
                    .clone()
                    .filter(|c| c.starts_with("image/"))
            })
            .or_else(|| {
                image::guess_format(&self.bytes)
                    .ok()
                    .map(|f| f.to_mime_type().to_string())
            })
            .unwrap_or_else(|| "image/jpeg".to_string())
    }
}

/// Fetches provider output images.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError>;
}

pub struct HttpImageFetcher {
    http: Client,
}

impl HttpImageFetcher {
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Http)?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedImage, FetchError> {
        let response = self.http.get(url).send().await.map_err(FetchError::Http)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_string());

        let bytes = response.bytes().await.map_err(FetchError::Http)?;
        if bytes.is_empty() {
            return Err(FetchError::Empty);
        }

        Ok(FetchedImage {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Image download returned status {0}")]
    Status(u16),

    #[error("Image download returned no bytes")]
    Empty,
}
