//! High-level registry interface for artifacts and their versions

use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    config::RegistryConfig,
    entities::*,
    error::{RegistryError, Result},
    locks::BranchLocks,
    sequencer::{self, VersionLabel},
    source::{SourceResolver, StorageBackend},
    storage::{BlobStorage, MetadataStore},
    upload::ContentUploader,
};

/// Input of a version registration
#[derive(Debug, Clone)]
pub struct RegisterVersion {
    pub branch_id: Uuid,
    pub content: Vec<u8>,
    /// Client-supplied file name; only its stem and extension are kept
    pub filename: String,
    pub hash: String,
    /// Name of a registered storage source, e.g. "R2"
    pub source: String,
    /// Provenance text, stored for dataset versions only
    pub lineage: Option<String>,
}

/// Artifact registry backed by a metadata store and named blob sources
pub struct Registry {
    pub(crate) store: Arc<dyn MetadataStore>,
    sources: SourceResolver,
    uploader: ContentUploader,
    locks: BranchLocks,
    pub(crate) config: RegistryConfig,
}

impl Registry {
    /// Create a registry with no storage sources registered
    pub fn new(store: Arc<dyn MetadataStore>, config: RegistryConfig) -> Self {
        Self {
            store,
            sources: SourceResolver::new(),
            uploader: ContentUploader::new(config.upload_timeout),
            locks: BranchLocks::new(),
            config,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MetadataStore> {
        &self.store
    }

    // === Sources ===

    /// Record a source type and the client that serves it
    pub async fn register_source(
        &mut self,
        name: &str,
        public_url: Option<String>,
        client: Arc<dyn BlobStorage>,
    ) -> Result<()> {
        self.store
            .save_source_type(&SourceType::new(name, public_url))
            .await?;
        self.sources.register(name, client);
        info!(source = name, "registered storage source");
        Ok(())
    }

    pub async fn resolve_source(&self, name: &str) -> Result<StorageBackend> {
        self.sources.resolve(self.store.as_ref(), name).await
    }

    pub async fn list_sources(&self) -> Result<Vec<SourceType>> {
        let names = self.sources.source_names();
        let types = self.store.list_source_types().await?;
        Ok(types
            .into_iter()
            .filter(|source| names.contains(&source.name))
            .collect())
    }

    // === Artifacts ===

    /// Create an artifact together with its default branch
    pub async fn create_artifact(
        &self,
        kind: ArtifactKind,
        organization_id: OrgId,
        name: &str,
        wiki: &str,
        user: UserId,
    ) -> Result<Artifact> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::Validation(
                "artifact name must not be empty".to_string(),
            ));
        }

        let artifact = Artifact::new(kind, organization_id, name, wiki, user);
        let branch = Branch::initial(artifact.id, self.config.default_branch.as_str());
        self.store.create_artifact(&artifact, &branch).await?;

        info!(
            artifact_id = %artifact.id,
            kind = %artifact.kind,
            name = %artifact.name,
            "created artifact"
        );
        Ok(artifact)
    }

    pub async fn get_artifact(&self, id: Uuid) -> Result<Artifact> {
        self.store
            .get_artifact(id)
            .await?
            .ok_or_else(|| RegistryError::not_found("artifact", id))
    }

    pub async fn get_artifact_by_name(
        &self,
        organization_id: &OrgId,
        kind: ArtifactKind,
        name: &str,
    ) -> Result<Artifact> {
        self.store
            .find_artifact(organization_id, kind, name)
            .await?
            .ok_or_else(|| RegistryError::not_found(kind.as_str(), name))
    }

    pub async fn list_artifacts(
        &self,
        organization_id: &OrgId,
        kind: ArtifactKind,
    ) -> Result<Vec<Artifact>> {
        self.store.list_artifacts(organization_id, kind).await
    }

    pub async fn update_artifact(
        &self,
        id: Uuid,
        update: ArtifactUpdate,
        user: UserId,
    ) -> Result<Artifact> {
        let mut artifact = self.get_artifact(id).await?;
        artifact.apply(update, user);
        self.store.update_artifact(&artifact).await?;
        debug!(artifact_id = %id, "updated artifact");
        Ok(artifact)
    }

    // === Versions ===

    /// Upload content and commit it as the next version of a branch
    ///
    /// The upload happens before the metadata transaction. If the commit
    /// fails the uploaded object is left in place.
    pub async fn register_version(&self, request: RegisterVersion) -> Result<VersionDetails> {
        let branch = self.get_branch(request.branch_id).await?;
        let artifact = self.get_artifact(branch.artifact_id).await?;
        let backend = self.resolve_source(&request.source).await?;

        let lineage = match request.lineage {
            Some(text) if artifact.kind.supports_lineage() => Some(text),
            Some(_) => {
                warn!(
                    artifact_id = %artifact.id,
                    kind = %artifact.kind,
                    "ignoring lineage for non-dataset artifact"
                );
                None
            }
            None => None,
        };

        let stored = self
            .uploader
            .upload(&backend, request.content, &request.filename)
            .await?;

        let pending = PendingVersion {
            branch_id: branch.id,
            hash: request.hash,
            source_path: stored.key,
            source_type: backend.source_type.name.clone(),
            lineage,
        };

        let version = {
            let _guard = self.locks.acquire(branch.id).await;
            self.store.commit_version(&pending).await
        }
        .map_err(|e| {
            error!(
                branch_id = %branch.id,
                location = %stored.location,
                error = %e,
                "version commit failed, uploaded object left orphaned"
            );
            e
        })?;

        info!(
            artifact_id = %artifact.id,
            branch = %branch.name,
            label = %version.label,
            source = %pending.source_type,
            "registered version"
        );

        self.store
            .get_version(version.id)
            .await?
            .ok_or_else(|| RegistryError::VersionNotFound(version.id.to_string()))
    }

    /// Label the next registration on the branch would receive
    pub async fn next_label(&self, branch_id: Uuid) -> Result<VersionLabel> {
        self.get_branch(branch_id).await?;
        sequencer::peek_next_label(self.store.as_ref(), branch_id).await
    }

    /// Whether any version on the branch carries `hash`
    pub async fn has_version_with_hash(&self, branch_id: Uuid, hash: &str) -> Result<bool> {
        self.store.has_version_with_hash(branch_id, hash).await
    }

    pub async fn get_version(&self, version_id: Uuid) -> Result<VersionDetails> {
        self.store
            .get_version(version_id)
            .await?
            .ok_or_else(|| RegistryError::VersionNotFound(version_id.to_string()))
    }

    pub async fn get_version_by_label(
        &self,
        branch_id: Uuid,
        label: &str,
    ) -> Result<VersionDetails> {
        let branch = self.get_branch(branch_id).await?;
        self.store
            .find_version(branch.id, label)
            .await?
            .ok_or_else(|| RegistryError::VersionNotFound(format!("{}@{}", label, branch.name)))
    }

    /// Most recent version of a branch
    pub async fn latest_version(&self, branch_id: Uuid) -> Result<VersionDetails> {
        let branch = self.get_branch(branch_id).await?;
        let label = self
            .store
            .latest_label(branch.id)
            .await?
            .ok_or_else(|| RegistryError::VersionNotFound(format!("latest@{}", branch.name)))?;
        self.get_version_by_label(branch.id, &label).await
    }

    pub async fn list_branch_versions(&self, branch_id: Uuid) -> Result<Vec<VersionDetails>> {
        let branch = self.get_branch(branch_id).await?;
        self.store.list_branch_versions(branch.id).await
    }

    pub async fn list_artifact_versions(&self, artifact_id: Uuid) -> Result<Vec<VersionDetails>> {
        let artifact = self.get_artifact(artifact_id).await?;
        self.store.list_artifact_versions(artifact.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStorage, sqlite_storage::SqliteStore};
    use tempfile::{TempDir, tempdir};

    async fn create_test_registry() -> (Registry, TempDir) {
        let dir = tempdir().unwrap();
        let url = format!("sqlite:{}/registry.db", dir.path().display());
        let store = SqliteStore::new(&url).await.unwrap();
        let mut registry = Registry::new(Arc::new(store), RegistryConfig::default());
        registry
            .register_source("MEMORY", None, Arc::new(MemoryStorage::new()))
            .await
            .unwrap();
        (registry, dir)
    }

    #[tokio::test]
    async fn test_create_artifact_with_default_branch() {
        let (registry, _dir) = create_test_registry().await;
        let artifact = registry
            .create_artifact(ArtifactKind::Model, "acme".into(), "resnet", "", "alice".into())
            .await
            .unwrap();

        let branches = registry.list_branches(artifact.id).await.unwrap();
        assert_eq!(branches.len(), 1);
        assert_eq!(branches[0].name, "main");
        assert!(branches[0].is_default);
    }

    #[tokio::test]
    async fn test_blank_artifact_name_is_rejected() {
        let (registry, _dir) = create_test_registry().await;
        let result = registry
            .create_artifact(ArtifactKind::Dataset, "acme".into(), "  ", "", "alice".into())
            .await;
        assert!(matches!(result, Err(RegistryError::Validation(_))));
    }

    #[tokio::test]
    async fn test_next_label_peeks_without_claiming() {
        let (registry, _dir) = create_test_registry().await;
        let artifact = registry
            .create_artifact(ArtifactKind::Model, "acme".into(), "resnet", "", "alice".into())
            .await
            .unwrap();
        let main = registry.get_branch_by_name(artifact.id, "main").await.unwrap();

        assert_eq!(registry.next_label(main.id).await.unwrap().to_string(), "v1");
        assert_eq!(registry.next_label(main.id).await.unwrap().to_string(), "v1");
        assert!(matches!(
            registry.latest_version(main.id).await,
            Err(RegistryError::VersionNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_sources_only_reports_served_sources() {
        let (registry, _dir) = create_test_registry().await;
        registry
            .store()
            .save_source_type(&SourceType::new("S3", None))
            .await
            .unwrap();

        let names: Vec<_> = registry
            .list_sources()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["MEMORY".to_string()]);
    }
}
