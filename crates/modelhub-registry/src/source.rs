//! Storage location resolution
//!
//! A source name such as "R2" resolves to the blob client registered for it
//! and to its `source_types` row, which carries the public URL template.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::{
    entities::SourceType,
    error::{RegistryError, Result},
    storage::{BlobStorage, MetadataStore},
};

/// A resolved source: where to upload and how the result is published
#[derive(Clone)]
pub struct StorageBackend {
    pub source_type: SourceType,
    pub client: Arc<dyn BlobStorage>,
}

impl fmt::Debug for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageBackend")
            .field("source_type", &self.source_type)
            .finish_non_exhaustive()
    }
}

/// Maps source names to blob storage clients
#[derive(Default, Clone)]
pub struct SourceResolver {
    clients: HashMap<String, Arc<dyn BlobStorage>>,
}

impl SourceResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the client serving `name`. Replaces any previous client.
    pub fn register(&mut self, name: impl Into<String>, client: Arc<dyn BlobStorage>) {
        self.clients.insert(name.into(), client);
    }

    /// Names with a registered client, sorted
    pub fn source_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.clients.keys().cloned().collect();
        names.sort();
        names
    }

    /// Resolve `name` against the registered clients and the reference table
    pub async fn resolve(&self, store: &dyn MetadataStore, name: &str) -> Result<StorageBackend> {
        let client = self
            .clients
            .get(name)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownSource(name.to_string()))?;

        let source_type = store
            .get_source_type(name)
            .await?
            .ok_or_else(|| RegistryError::UnknownSource(name.to_string()))?;

        Ok(StorageBackend {
            source_type,
            client,
        })
    }
}
