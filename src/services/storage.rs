use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

/// Object store holding generated try-on images.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `data` at `path`. With `upsert == false` an existing object is
    /// left untouched and [`StorageError::AlreadyExists`] is returned.
    async fn upload(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError>;

    /// Publicly addressable URL for `path`.
    fn public_url(&self, path: &str) -> String;
}

/// Client for Cloudflare R2 object storage (S3-compatible).
pub struct R2Client {
    bucket: Box<Bucket>,
    public_base_url: String,
}

impl R2Client {
    pub fn new(
        bucket_name: &str,
        endpoint: &str,
        access_key: &str,
        secret_key: &str,
        public_base_url: &str,
    ) -> Result<Self, StorageError> {
        let region = Region::Custom {
            region: "auto".to_string(),
            endpoint: endpoint.to_string(),
        };

        let credentials =
            Credentials::new(Some(access_key), Some(secret_key), None, None, None)
                .map_err(|e| StorageError::Config(e.to_string()))?;

        let bucket = Bucket::new(bucket_name, region, credentials)
            .map_err(|e| StorageError::Config(e.to_string()))?;

        Ok(Self {
            bucket,
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        match self.bucket.head_object(path).await {
            Ok((_, code)) => Ok((200..300).contains(&code)),
            Err(S3Error::HttpFailWithBody(404, _)) => Ok(false),
            Err(e) => Err(StorageError::S3(e)),
        }
    }
}

#[async_trait]
impl ObjectStore for R2Client {
    async fn upload(
        &self,
        path: &str,
        data: &[u8],
        content_type: &str,
        upsert: bool,
    ) -> Result<(), StorageError> {
        if !upsert && self.exists(path).await? {
            return Err(StorageError::AlreadyExists(path.to_string()));
        }

        let response = self
            .bucket
            .put_object_with_content_type(path, data, content_type)
            .await
            .map_err(StorageError::S3)?;

        let code = response.status_code();
        if !(200..300).contains(&code) {
            return Err(StorageError::Status(code));
        }
        Ok(())
    }

    fn public_url(&self, path: &str) -> String {
        format!("{}/{}", self.public_base_url, path.trim_start_matches('/'))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("S3 operation failed: {0}")]
    S3(#[from] S3Error),

    #[error("Object store returned status {0}")]
    Status(u16),

    #[error("Object already exists: {0}")]
    AlreadyExists(String),

    #[error("Storage configuration error: {0}")]
    Config(String),
}
