//! Content upload to a resolved storage backend

use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    error::{RegistryError, Result},
    source::StorageBackend,
};

/// Length of the random token appended to uploaded file stems
const SUFFIX_LEN: usize = 10;

/// An object written to a backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Key relative to the bucket, recorded as the version's source path
    pub key: String,
    /// Location string returned by the backend
    pub location: String,
}

/// Uploads version content under collision-resistant keys
#[derive(Debug, Clone)]
pub struct ContentUploader {
    timeout: Duration,
}

impl ContentUploader {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Upload `content` once. Backend errors and timeouts become
    /// `UploadFailed`; retrying is left to the caller.
    pub async fn upload(
        &self,
        backend: &StorageBackend,
        content: Vec<u8>,
        original_filename: &str,
    ) -> Result<StoredObject> {
        let key = storage_key(original_filename);
        let size = content.len();
        debug!(source = %backend.source_type.name, key = %key, size, "uploading content");

        let location = tokio::time::timeout(self.timeout, backend.client.put(&key, content))
            .await
            .map_err(|_| {
                warn!(source = %backend.source_type.name, key = %key, "upload timed out");
                RegistryError::UploadFailed(format!(
                    "upload of '{}' to {} timed out after {:?}",
                    key, backend.source_type.name, self.timeout
                ))
            })??;

        // Endpoints mounted under a path prefix yield locations whose
        // derived key is not the one written
        match object_key(&location) {
            Some(derived) if derived != key => {
                warn!(location = %location, derived = %derived, key = %key, "location does not match written key");
            }
            None => {
                debug!(location = %location, key = %key, "location carries no object key");
            }
            Some(_) => {}
        }
        Ok(StoredObject { key, location })
    }
}

/// Build `<stem>-<suffix>.<ext>` from a client-supplied file name
pub fn storage_key(original_filename: &str) -> String {
    let name = original_filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let (stem, ext) = match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && !ext.is_empty() => (stem, Some(ext)),
        _ => (name, None),
    };
    let stem = if stem.is_empty() { "file" } else { stem };

    let suffix = random_suffix();
    match ext {
        Some(ext) => format!("{}-{}.{}", stem, suffix, ext),
        None => format!("{}-{}", stem, suffix),
    }
}

fn random_suffix() -> String {
    Uuid::new_v4().simple().to_string()[..SUFFIX_LEN].to_string()
}

/// Object key of a backend location
///
/// Drops the scheme and authority; for path-style URLs
/// (`https://host/bucket/key`) the bucket segment is dropped as well.
/// Virtual-hosted URLs (`https://bucket.host/key`) keep their whole path.
/// Returns `None` when the location has no key segment.
pub fn object_key(location: &str) -> Option<String> {
    let without_scheme = location
        .split_once("://")
        .map(|(_, rest)| rest)
        .unwrap_or(location);
    let (_, path) = without_scheme.split_once('/')?;
    let path = path.split(['?', '#']).next().unwrap_or_default();

    let key = match path.split_once('/') {
        Some((_bucket, key)) if !key.is_empty() => key,
        _ => path,
    };

    if key.is_empty() {
        None
    } else {
        Some(key.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::SourceType;
    use crate::storage::{BlobStorage, MemoryStorage, StorageError};
    use async_trait::async_trait;
    use std::sync::Arc;

    fn split_key(key: &str) -> (&str, &str) {
        key.rsplit_once('-').unwrap()
    }

    #[test]
    fn test_storage_key_keeps_stem_and_extension() {
        let key = storage_key("weights.bin");
        let (stem, rest) = split_key(&key);
        assert_eq!(stem, "weights");
        let (suffix, ext) = rest.split_once('.').unwrap();
        assert_eq!(suffix.len(), SUFFIX_LEN);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(ext, "bin");
    }

    #[test]
    fn test_storage_key_is_unique_per_upload() {
        assert_ne!(storage_key("weights.bin"), storage_key("weights.bin"));
    }

    #[test]
    fn test_storage_key_edge_cases() {
        assert!(storage_key("model.tar.gz").starts_with("model.tar-"));
        assert!(storage_key("model.tar.gz").ends_with(".gz"));

        let no_ext = storage_key("Makefile");
        assert!(no_ext.starts_with("Makefile-"));
        assert!(!no_ext.contains('.'));

        assert!(storage_key("../../etc/passwd").starts_with("passwd-"));
        assert!(storage_key("C:\\data\\train.csv").starts_with("train-"));
        assert!(storage_key("").starts_with("file-"));
        assert!(storage_key(".env").starts_with(".env-"));
    }

    #[test]
    fn test_object_key_from_locations() {
        assert_eq!(
            object_key("https://acct.r2.cloudflarestorage.com/models/weights-abc.bin").as_deref(),
            Some("weights-abc.bin")
        );
        assert_eq!(
            object_key("https://models.s3.amazonaws.com/weights-abc.bin").as_deref(),
            Some("weights-abc.bin")
        );
        assert_eq!(
            object_key("memory://memory/weights-abc.bin").as_deref(),
            Some("weights-abc.bin")
        );
        assert_eq!(
            object_key("https://host/bucket/weights-abc.bin?x-id=PutObject").as_deref(),
            Some("weights-abc.bin")
        );
        assert_eq!(object_key("https://host/"), None);
        assert_eq!(object_key("https://host"), None);
    }

    struct StalledStorage;

    #[async_trait]
    impl BlobStorage for StalledStorage {
        async fn put(&self, _key: &str, _data: Vec<u8>) -> std::result::Result<String, StorageError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("never".into())
        }

        async fn get(&self, key: &str) -> std::result::Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn exists(&self, _key: &str) -> std::result::Result<bool, StorageError> {
            Ok(false)
        }

        async fn delete(&self, _key: &str) -> std::result::Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_upload_returns_relative_key() {
        let storage = Arc::new(MemoryStorage::with_bucket("models"));
        let backend = StorageBackend {
            source_type: SourceType::new("MEMORY", None),
            client: storage.clone(),
        };

        let uploader = ContentUploader::new(Duration::from_secs(5));
        let stored = uploader
            .upload(&backend, b"weights".to_vec(), "weights.bin")
            .await
            .unwrap();

        assert!(stored.key.starts_with("weights-"));
        assert_eq!(stored.location, format!("memory://models/{}", stored.key));
        assert_eq!(storage.get(&stored.key).await.unwrap(), b"weights".to_vec());
    }

    /// Backend behind a reverse proxy that mounts the bucket under `/minio`
    struct PrefixedStorage;

    #[async_trait]
    impl BlobStorage for PrefixedStorage {
        async fn put(&self, key: &str, _data: Vec<u8>) -> std::result::Result<String, StorageError> {
            Ok(format!("http://host/minio/models/{}", key))
        }

        async fn get(&self, key: &str) -> std::result::Result<Vec<u8>, StorageError> {
            Err(StorageError::NotFound(key.to_string()))
        }

        async fn exists(&self, _key: &str) -> std::result::Result<bool, StorageError> {
            Ok(true)
        }

        async fn delete(&self, _key: &str) -> std::result::Result<(), StorageError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_upload_keeps_written_key_under_path_prefix() {
        let backend = StorageBackend {
            source_type: SourceType::new("S3", None),
            client: Arc::new(PrefixedStorage),
        };

        let uploader = ContentUploader::new(Duration::from_secs(5));
        let stored = uploader
            .upload(&backend, b"weights".to_vec(), "weights.bin")
            .await
            .unwrap();

        assert!(stored.key.starts_with("weights-"));
        assert!(!stored.key.contains('/'));
        assert_eq!(stored.location, format!("http://host/minio/models/{}", stored.key));
    }

    #[tokio::test]
    async fn test_upload_timeout_is_upload_failed() {
        let backend = StorageBackend {
            source_type: SourceType::new("SLOW", None),
            client: Arc::new(StalledStorage),
        };

        let uploader = ContentUploader::new(Duration::from_millis(20));
        match uploader.upload(&backend, b"x".to_vec(), "x.bin").await {
            Err(RegistryError::UploadFailed(msg)) => assert!(msg.contains("timed out")),
            other => panic!("Expected UploadFailed, got {:?}", other),
        }
    }
}
