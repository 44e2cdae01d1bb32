//! S3-compatible storage implementation using MinIO client
//!
//! Serves both Cloudflare R2 and AWS S3 (or MinIO) sources. Each source reads
//! its credentials from environment variables sharing a prefix, e.g.
//! `R2_BUCKET` or `S3_BUCKET`.

use async_trait::async_trait;
use bytes::Bytes;
use minio::s3::{
    client::Client, creds::StaticProvider, http::BaseUrl, segmented_bytes::SegmentedBytes,
    types::S3Api,
};
use std::str::FromStr;

use crate::storage::blob_storage::{BlobStorage, StorageError};

/// S3-compatible storage implementation using MinIO client
pub struct S3Storage {
    client: Client,
    endpoint: String,
    bucket: String,
    public_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3 storage instance
    pub fn new(client: Client, endpoint: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            bucket: bucket.into(),
            public_url: None,
        }
    }

    /// Attach the public URL template under which uploaded objects are served
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    /// Create S3 storage from `S3_*` environment variables
    pub async fn from_env() -> Result<Self, StorageError> {
        Self::from_env_with_prefix("S3").await
    }

    /// Create storage from environment variables sharing `prefix`
    ///
    /// Expects:
    /// - `<prefix>_ACCESS_KEY_ID`
    /// - `<prefix>_SECRET_ACCESS_KEY`
    /// - `<prefix>_ENDPOINT_URL`
    /// - `<prefix>_BUCKET`
    /// - `<prefix>_PUBLIC_URL` (optional)
    pub async fn from_env_with_prefix(prefix: &str) -> Result<Self, StorageError> {
        let var = |name: &str| {
            let key = format!("{}_{}", prefix, name);
            std::env::var(&key).map_err(|_| {
                StorageError::Backend(format!("{} environment variable not set", key))
            })
        };

        let bucket = var("BUCKET")?;
        let access_key = var("ACCESS_KEY_ID")?;
        let secret_key = var("SECRET_ACCESS_KEY")?;
        let endpoint_url = var("ENDPOINT_URL")?;
        let public_url = var("PUBLIC_URL").ok();

        let base_url = BaseUrl::from_str(&endpoint_url).map_err(|e| {
            StorageError::Backend(format!("Invalid {}_ENDPOINT_URL: {}", prefix, e))
        })?;

        let creds_provider = StaticProvider::new(&access_key, &secret_key, None);

        let client = Client::new(
            base_url,
            Some(Box::new(creds_provider)),
            None, // Default region
            None, // No custom HTTP client
        )
        .map_err(|e| StorageError::Backend(format!("Failed to create S3 client: {}", e)))?;

        let storage = Self::new(client, endpoint_url, bucket);
        Ok(match public_url {
            Some(url) => storage.with_public_url(url),
            None => storage,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn public_url(&self) -> Option<&str> {
        self.public_url.as_deref()
    }

    /// Ensure bucket exists (create if it doesn't)
    pub async fn ensure_bucket(&self) -> Result<(), StorageError> {
        let response = self
            .client
            .bucket_exists(&self.bucket)
            .send()
            .await
            .map_err(|e| {
                StorageError::Backend(format!("Failed to check bucket '{}': {}", self.bucket, e))
            })?;

        if response.exists {
            return Ok(());
        }

        self.client
            .create_bucket(&self.bucket)
            .send()
            .await
            .map(|_| ())
            .map_err(|e| {
                StorageError::Backend(format!("Failed to create bucket '{}': {}", self.bucket, e))
            })
    }

    /// Path-style location of an object
    fn location(&self, key: &str) -> String {
        format!("{}/{}/{}", self.endpoint, self.bucket, key)
    }

    /// Validate S3 key format
    fn validate_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.len() > 1024 {
            return Err(StorageError::InvalidKey(
                "Key must be between 1 and 1024 characters".into(),
            ));
        }

        if key.starts_with('/') || key.ends_with('/') {
            return Err(StorageError::InvalidKey(
                "Key cannot start or end with '/'".into(),
            ));
        }

        Ok(())
    }

    fn is_not_found(e: &impl std::fmt::Display) -> bool {
        let msg = e.to_string();
        msg.contains("NoSuchKey") || msg.contains("404")
    }
}

#[async_trait]
impl BlobStorage for S3Storage {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<String, StorageError> {
        Self::validate_key(key)?;

        let bytes = SegmentedBytes::from(Bytes::from(data));

        self.client
            .put_object(&self.bucket, key, bytes)
            .send()
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to put file '{}': {}", key, e)))?;

        Ok(self.location(key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        Self::validate_key(key)?;

        let response = self
            .client
            .get_object(&self.bucket, key)
            .send()
            .await
            .map_err(|e| {
                if Self::is_not_found(&e) {
                    StorageError::NotFound(key.to_string())
                } else {
                    StorageError::Backend(format!("Failed to get file '{}': {}", key, e))
                }
            })?;

        let content = response.content.to_segmented_bytes().await.map_err(|e| {
            StorageError::Backend(format!("Failed to read file '{}' content: {}", key, e))
        })?;

        Ok(content.to_bytes().to_vec())
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        Self::validate_key(key)?;

        match self.client.stat_object(&self.bucket, key).send().await {
            Ok(_) => Ok(true),
            Err(e) if Self::is_not_found(&e) => Ok(false),
            Err(e) => Err(StorageError::Backend(format!(
                "Failed to check existence of file '{}': {}",
                key, e
            ))),
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        Self::validate_key(key)?;

        self.client
            .delete_object(&self.bucket, key)
            .send()
            .await
            .map_err(|e| {
                StorageError::Backend(format!("Failed to delete file '{}': {}", key, e))
            })?;

        Ok(())
    }
}
