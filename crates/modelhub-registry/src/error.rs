//! Error types for the modelhub registry

use thiserror::Error;

use crate::storage::blob_storage::StorageError;

/// Registry-specific errors
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Unknown storage source: {0}")]
    UnknownSource(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Branch '{name}' already exists for artifact {artifact_id}")]
    DuplicateBranchName { artifact_id: String, name: String },

    #[error("Artifact '{name}' already exists in organization {organization_id}")]
    DuplicateArtifactName {
        organization_id: String,
        name: String,
    },

    #[error("Version {label} was already committed on branch {branch_id}")]
    DuplicateLabel { branch_id: String, label: String },

    #[error("Malformed version label: {0}")]
    MalformedLabel(String),

    #[error("Version not found: {0}")]
    VersionNotFound(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RegistryError {
    /// Whether retrying the same operation can succeed.
    ///
    /// Only a lost sequencing race qualifies: a fresh attempt reads the new
    /// latest label and computes the next free one.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryError::DuplicateLabel { .. })
    }

    pub(crate) fn not_found(what: &str, id: impl std::fmt::Display) -> Self {
        RegistryError::NotFound(format!("{} {}", what, id))
    }
}

impl From<StorageError> for RegistryError {
    fn from(err: StorageError) -> Self {
        RegistryError::UploadFailed(err.to_string())
    }
}

/// Result type for registry operations
pub type Result<T> = std::result::Result<T, RegistryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_duplicate_label_is_retryable() {
        let race = RegistryError::DuplicateLabel {
            branch_id: "b".into(),
            label: "v2".into(),
        };
        assert!(race.is_retryable());

        let dup_branch = RegistryError::DuplicateBranchName {
            artifact_id: "a".into(),
            name: "main".into(),
        };
        assert!(!dup_branch.is_retryable());
        assert!(!RegistryError::Persistence("disk full".into()).is_retryable());
    }

    #[test]
    fn test_storage_error_becomes_upload_failed() {
        let err: RegistryError = StorageError::Backend("connection reset".into()).into();
        match err {
            RegistryError::UploadFailed(msg) => assert!(msg.contains("connection reset")),
            other => panic!("Expected UploadFailed, got {:?}", other),
        }
    }
}
