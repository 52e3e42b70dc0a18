use garde::Validate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::job::JobStatus;

/// Body of `POST /functions/v1/tryon-generate`.
///
/// Accepts either a single `garmentUrl` or an ordered `garmentUrls` list;
/// the list wins when both are present and it is non-empty.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[garde(length(max = 2048))]
    pub user_photo_url: Option<String>,

    #[garde(length(max = 2048))]
    pub garment_url: Option<String>,

    #[garde(length(max = 8))]
    pub garment_urls: Option<Vec<String>>,

    #[garde(length(max = 4000))]
    pub prompt: Option<String>,

    #[garde(length(max = 8))]
    pub categories: Option<Vec<String>>,
}

/// A generation request after validation and normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct TryOnInput {
    pub user_photo_url: String,
    pub garment_urls: Vec<String>,
    pub prompt: Option<String>,
    pub categories: Vec<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl GenerateRequest {
    pub fn into_input(self) -> Result<TryOnInput, AppError> {
        self.validate()
            .map_err(|report| AppError::InvalidRequest(report.to_string()))?;

        let user_photo_url = non_blank(self.user_photo_url)
            .ok_or_else(|| AppError::InvalidRequest("userPhotoUrl is required".to_string()))?;

        // Tags stay paired with their garment when blank entries are dropped.
        let categories = self.categories.unwrap_or_default();
        let (garment_urls, categories): (Vec<String>, Vec<String>) = match self.garment_urls {
            Some(urls) if !urls.is_empty() => {
                let mut tags = categories.into_iter();
                urls.into_iter()
                    .filter_map(|url| {
                        let tag = tags.next().unwrap_or_default();
                        non_blank(Some(url)).map(|url| (url, tag))
                    })
                    .unzip()
            }
            _ => (non_blank(self.garment_url).into_iter().collect(), categories),
        };

        if garment_urls.is_empty() {
            return Err(AppError::InvalidRequest(
                "At least one garment image is required".to_string(),
            ));
        }

        Ok(TryOnInput {
            user_photo_url,
            garment_urls,
            prompt: self.prompt.filter(|p| !p.trim().is_empty()),
            categories,
        })
    }
}

/// Successful generation response.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub result_image_url: String,
    pub model: String,
    pub garment_count: usize,
}

/// Query string of the provider callback.
#[derive(Debug, Default, Deserialize)]
pub struct WebhookQuery {
    pub secret: Option<String>,
    pub job_id: Option<String>,
}

/// Provider-reported outcome of a generation request.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum CallbackStatus {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ERROR")]
    Error,
}

/// Reads a field, treating a value of the wrong shape as absent.
///
/// An authenticated callback must always settle its job, so a payload the
/// provider shaped unexpectedly degrades to "no image" instead of a 400.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Output image as described by the provider.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageDescriptor {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub width: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub height: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub content_type: Option<String>,
}

impl ImageDescriptor {
    fn output(&self) -> Option<OutputImage<'_>> {
        let url = self.url.as_deref().map(str::trim).filter(|u| !u.is_empty())?;
        Some(OutputImage {
            url,
            content_type: self.content_type.as_deref(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackPayload {
    #[serde(default, deserialize_with = "lenient")]
    pub image: Option<ImageDescriptor>,
    /// Some models report a list of images instead of a single one.
    #[serde(default, deserialize_with = "lenient")]
    pub images: Option<Vec<ImageDescriptor>>,
}

/// The image a callback delivered, ready to download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputImage<'a> {
    pub url: &'a str,
    pub content_type: Option<&'a str>,
}

/// Body of the provider callback.
///
/// Only a body that is not a JSON object is rejected; any missing or odd field
/// leaves the callback without a status or image, which fails the job.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderCallback {
    #[serde(default, deserialize_with = "lenient")]
    pub request_id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<CallbackStatus>,
    #[serde(default, deserialize_with = "lenient")]
    pub payload: Option<CallbackPayload>,
    #[serde(default)]
    pub error: Option<serde_json::Value>,
}

impl ProviderCallback {
    pub fn is_ok(&self) -> bool {
        self.status == Some(CallbackStatus::Ok)
    }

    /// The image to persist, if the provider delivered one.
    pub fn output_image(&self) -> Option<OutputImage<'_>> {
        let payload = self.payload.as_ref()?;
        payload
            .image
            .as_ref()
            .and_then(ImageDescriptor::output)
            .or_else(|| payload.images.iter().flatten().find_map(ImageDescriptor::output))
    }

    /// Provider error text, flattened to a string.
    pub fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            serde_json::Value::Null => None,
            serde_json::Value::String(s) if s.trim().is_empty() => None,
            serde_json::Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Acknowledgement sent back to the provider.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub success: bool,
}

/// Body of `POST /functions/v1/tryon-status`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusRequest {
    pub job_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedResult {
    pub image_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub result: Option<ResolvedResult>,
}
