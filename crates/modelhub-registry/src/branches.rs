//! Branch management

use tracing::info;
use uuid::Uuid;

use crate::{
    entities::Branch,
    error::{RegistryError, Result},
    registry::Registry,
};

impl Registry {
    /// Create a non-default branch under an existing artifact
    pub async fn create_branch(&self, artifact_id: Uuid, name: &str) -> Result<Branch> {
        let name = name.trim();
        if name.is_empty() {
            return Err(RegistryError::Validation(
                "branch name must not be empty".to_string(),
            ));
        }

        let artifact = self.get_artifact(artifact_id).await?;
        let branch = Branch::new(artifact.id, name);
        self.store.create_branch(&branch).await?;

        info!(artifact_id = %artifact.id, branch = %branch.name, "created branch");
        Ok(branch)
    }

    /// Create several branches in order, stopping at the first failure
    ///
    /// Branches created before the failure are kept.
    pub async fn create_branches<S: AsRef<str>>(
        &self,
        artifact_id: Uuid,
        names: &[S],
    ) -> Result<Vec<Branch>> {
        let mut branches = Vec::with_capacity(names.len());
        for name in names {
            branches.push(self.create_branch(artifact_id, name.as_ref()).await?);
        }
        Ok(branches)
    }

    pub async fn get_branch(&self, branch_id: Uuid) -> Result<Branch> {
        self.store
            .get_branch(branch_id)
            .await?
            .ok_or_else(|| RegistryError::not_found("branch", branch_id))
    }

    pub async fn get_branch_by_name(&self, artifact_id: Uuid, name: &str) -> Result<Branch> {
        self.store
            .find_branch(artifact_id, name)
            .await?
            .ok_or_else(|| RegistryError::not_found("branch", name))
    }

    /// Branches of an artifact in creation order
    pub async fn list_branches(&self, artifact_id: Uuid) -> Result<Vec<Branch>> {
        let artifact = self.get_artifact(artifact_id).await?;
        self.store.list_branches(artifact.id).await
    }

    /// The branch currently flagged as default
    pub async fn default_branch(&self, artifact_id: Uuid) -> Result<Branch> {
        self.list_branches(artifact_id)
            .await?
            .into_iter()
            .find(|branch| branch.is_default)
            .ok_or_else(|| RegistryError::not_found("default branch of artifact", artifact_id))
    }

    /// Make `branch_id` the artifact's only default branch
    pub async fn set_default_branch(&self, artifact_id: Uuid, branch_id: Uuid) -> Result<Branch> {
        let branch = self.store.set_default_branch(artifact_id, branch_id).await?;
        info!(artifact_id = %artifact_id, branch = %branch.name, "switched default branch");
        Ok(branch)
    }

    /// Delete a branch with all of its versions, paths, lineage and logs
    ///
    /// Stored objects are not removed. The default branch cannot be deleted;
    /// move the flag with [`Registry::set_default_branch`] first.
    pub async fn delete_branch(&self, branch_id: Uuid) -> Result<()> {
        let branch = self.get_branch(branch_id).await?;
        if branch.is_default {
            return Err(RegistryError::Validation(format!(
                "branch '{}' is the default branch and cannot be deleted",
                branch.name
            )));
        }
        self.store.delete_branch(branch.id).await?;
        info!(artifact_id = %branch.artifact_id, branch = %branch.name, "deleted branch");
        Ok(())
    }
}
