//! # Modelhub Registry
//!
//! Versioned storage of machine-learning artifacts (models and datasets):
//! - Artifacts own named branches, one of which is the default
//! - Each branch carries an append-only sequence of versions labeled `v1`, `v2`, ...
//! - Version content is uploaded to a named storage source (R2, S3, ...) and
//!   the resulting object key is recorded alongside a client-supplied hash
//! - Dataset versions may carry lineage text; any version can collect logs
//!
//! ## Core Concepts
//!
//! - **Sources** map a name to a blob client and a `source_types` row
//! - **Registration** uploads first, then commits path, version and lineage
//!   in one metadata transaction
//! - **Labels** are assigned per branch under a branch lock and guarded by
//!   unique constraints, so concurrent registrations never share a label
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use modelhub_registry::*;
//! use std::sync::Arc;
//!
//! # async fn example() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let store = SqliteStore::new("sqlite:./data/modelhub.db").await?;
//! let mut registry = Registry::new(Arc::new(store), RegistryConfig::default());
//! registry
//!     .register_source("MEMORY", None, Arc::new(MemoryStorage::new()))
//!     .await?;
//!
//! let artifact = registry
//!     .create_artifact(ArtifactKind::Model, "acme".into(), "resnet", "", "alice".into())
//!     .await?;
//! let main = registry.get_branch_by_name(artifact.id, "main").await?;
//!
//! let content = b"weights".to_vec();
//! let version = registry
//!     .register_version(RegisterVersion {
//!         branch_id: main.id,
//!         hash: ContentDigest::compute(&content),
//!         content,
//!         filename: "weights.bin".to_string(),
//!         source: "MEMORY".to_string(),
//!         lineage: None,
//!     })
//!     .await?;
//!
//! println!("Registered {} at {}", version.label, version.path.source_path);
//! # Ok(())
//! # }
//! ```

pub mod activity;
pub mod branches;
pub mod config;
pub mod digest;
pub mod entities;
pub mod error;
pub mod locks;
pub mod registry;
pub mod sequencer;
pub mod source;
pub mod storage;
pub mod upload;

pub use config::RegistryConfig;
pub use digest::ContentDigest;
pub use entities::*;
pub use error::{RegistryError, Result};
pub use registry::{RegisterVersion, Registry};
pub use sequencer::VersionLabel;
pub use storage::{BlobStorage, MemoryStorage, MetadataStore, StorageError};

#[cfg(feature = "s3")]
pub use storage::s3_storage::S3Storage;

#[cfg(feature = "sqlite")]
pub use storage::sqlite_storage::SqliteStore;
