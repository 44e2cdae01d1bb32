//! Storage abstractions for registry metadata and artifact content

use async_trait::async_trait;
use uuid::Uuid;

use crate::{entities::*, error::Result};

pub mod blob_storage;

pub use blob_storage::{BlobStorage, MemoryStorage, StorageError};

// S3 implementation
#[cfg(feature = "s3")]
pub mod s3_storage;

#[cfg(feature = "sqlite")]
pub mod sqlite_storage;

/// Durable, transactional storage of artifacts, branches and versions
///
/// Lookups return `Ok(None)` for missing rows; the registry decides which
/// error a missing row becomes. Every method that writes more than one row
/// commits all of them or none.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    // === Source types ===

    /// Insert or replace a source type row (startup seeding only)
    async fn save_source_type(&self, source_type: &SourceType) -> Result<()>;

    async fn get_source_type(&self, name: &str) -> Result<Option<SourceType>>;

    async fn list_source_types(&self) -> Result<Vec<SourceType>>;

    // === Artifacts ===

    /// Persist a new artifact together with its initial default branch
    async fn create_artifact(&self, artifact: &Artifact, initial_branch: &Branch) -> Result<()>;

    async fn get_artifact(&self, id: Uuid) -> Result<Option<Artifact>>;

    async fn find_artifact(
        &self,
        organization_id: &OrgId,
        kind: ArtifactKind,
        name: &str,
    ) -> Result<Option<Artifact>>;

    async fn list_artifacts(
        &self,
        organization_id: &OrgId,
        kind: ArtifactKind,
    ) -> Result<Vec<Artifact>>;

    /// Overwrite the mutable metadata of an existing artifact
    async fn update_artifact(&self, artifact: &Artifact) -> Result<()>;

    // === Branches ===

    /// Persist a new branch. A default branch displaces the current default
    /// within the same transaction.
    async fn create_branch(&self, branch: &Branch) -> Result<()>;

    async fn get_branch(&self, id: Uuid) -> Result<Option<Branch>>;

    async fn find_branch(&self, artifact_id: Uuid, name: &str) -> Result<Option<Branch>>;

    /// Branches of an artifact in creation order
    async fn list_branches(&self, artifact_id: Uuid) -> Result<Vec<Branch>>;

    /// Atomically move the default flag to `branch_id`
    async fn set_default_branch(&self, artifact_id: Uuid, branch_id: Uuid) -> Result<Branch>;

    /// Delete a branch with its versions, paths, lineage and logs
    async fn delete_branch(&self, branch_id: Uuid) -> Result<()>;

    // === Versions ===

    /// Label of the most recent version on the branch
    async fn latest_label(&self, branch_id: Uuid) -> Result<Option<String>>;

    /// Insert path, sequenced version and lineage in one transaction
    async fn commit_version(&self, pending: &PendingVersion) -> Result<Version>;

    async fn has_version_with_hash(&self, branch_id: Uuid, hash: &str) -> Result<bool>;

    async fn get_version(&self, id: Uuid) -> Result<Option<VersionDetails>>;

    async fn find_version(&self, branch_id: Uuid, label: &str) -> Result<Option<VersionDetails>>;

    /// Versions of a branch ordered by label number
    async fn list_branch_versions(&self, branch_id: Uuid) -> Result<Vec<VersionDetails>>;

    /// Versions across all branches of an artifact
    async fn list_artifact_versions(&self, artifact_id: Uuid) -> Result<Vec<VersionDetails>>;

    // === Lineage and logs ===

    async fn get_lineage(&self, version_id: Uuid) -> Result<Option<Lineage>>;

    /// Append a log; fails with `VersionNotFound` for an unknown version
    async fn append_log(&self, log: &Log) -> Result<()>;

    /// Logs of a version in creation order
    async fn list_logs(&self, version_id: Uuid) -> Result<Vec<Log>>;
}
