//! Blob storage abstraction for artifact content
//!
//! This module provides the object-store trait and an in-memory implementation
//! for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Key not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Storage backend error: {0}")]
    Backend(String),

    #[error("Invalid key format: {0}")]
    InvalidKey(String),
}

/// Abstraction for object storage backends
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Store data at the given key, returning the backend's location for it
    /// (typically a URL whose last path segments are the key)
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<String, StorageError>;

    /// Retrieve data by key
    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError>;

    /// Check if key exists
    async fn exists(&self, key: &str) -> Result<bool, StorageError>;

    /// Delete data by key
    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage implementation for testing
#[derive(Debug)]
pub struct MemoryStorage {
    bucket: String,
    data: Mutex<HashMap<String, Vec<u8>>>,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::with_bucket("memory")
    }

    pub fn with_bucket(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            data: Mutex::new(HashMap::new()),
        }
    }

    /// Get all stored keys (useful for testing)
    pub fn keys(&self) -> Vec<String> {
        self.data
            .lock()
            .map(|data| data.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Get number of stored items
    pub fn len(&self) -> usize {
        self.data.lock().map(|data| data.len()).unwrap_or(0)
    }

    /// Check if storage is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStorage for MemoryStorage {
    async fn put(&self, key: &str, data: Vec<u8>) -> Result<String, StorageError> {
        if key.is_empty() {
            return Err(StorageError::InvalidKey("Key cannot be empty".into()));
        }

        let mut storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;

        storage.insert(key.to_string(), data);
        Ok(format!("memory://{}/{}", self.bucket, key))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, StorageError> {
        let storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;

        storage
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        let storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;

        Ok(storage.contains_key(key))
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut storage = self
            .data
            .lock()
            .map_err(|_| StorageError::Backend("Lock poisoned".into()))?;

        storage.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_storage_basic_operations() {
        let storage = MemoryStorage::with_bucket("models");
        let key = "weights-0a1b2c3d4e.bin";
        let data = b"\x00\x01\x02".to_vec();

        let location = storage.put(key, data.clone()).await.unwrap();
        assert_eq!(location, "memory://models/weights-0a1b2c3d4e.bin");

        let retrieved = storage.get(key).await.unwrap();
        assert_eq!(data, retrieved);

        assert!(storage.exists(key).await.unwrap());
        assert!(!storage.exists("nonexistent").await.unwrap());

        storage.delete(key).await.unwrap();
        assert!(!storage.exists(key).await.unwrap());
        assert!(storage.get(key).await.is_err());
    }

    #[tokio::test]
    async fn test_memory_storage_not_found() {
        let storage = MemoryStorage::new();
        let result = storage.get("nonexistent").await;

        match result {
            Err(StorageError::NotFound(key)) => assert_eq!(key, "nonexistent"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[tokio::test]
    async fn test_memory_storage_rejects_empty_key() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.put("", b"x".to_vec()).await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(storage.is_empty());
    }
}
