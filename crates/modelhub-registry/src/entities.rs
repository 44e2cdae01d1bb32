//! Core data structures for the modelhub registry

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::error::RegistryError;

/// Opaque identifier of the caller, issued by the authentication layer
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

impl From<String> for UserId {
    fn from(s: String) -> Self {
        UserId(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

impl AsRef<str> for UserId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Identifier of the organization owning an artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrgId(pub String);

impl From<String> for OrgId {
    fn from(s: String) -> Self {
        OrgId(s)
    }
}

impl From<&str> for OrgId {
    fn from(s: &str) -> Self {
        OrgId(s.to_string())
    }
}

impl AsRef<str> for OrgId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The two families of artifacts the registry tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Model,
    Dataset,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArtifactKind::Model => "model",
            ArtifactKind::Dataset => "dataset",
        }
    }

    /// Only dataset versions carry lineage
    pub fn supports_lineage(&self) -> bool {
        matches!(self, ArtifactKind::Dataset)
    }
}

impl fmt::Display for ArtifactKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ArtifactKind {
    type Err = RegistryError;

    /// Accepts singular and plural forms, as they appear in routes ("models")
    /// and in storage ("model").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "model" | "models" => Ok(ArtifactKind::Model),
            "dataset" | "datasets" => Ok(ArtifactKind::Dataset),
            other => Err(RegistryError::NotFound(format!("artifact kind '{}'", other))),
        }
    }
}

/// A named model or dataset owned by an organization
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub id: Uuid,

    pub kind: ArtifactKind,

    pub organization_id: OrgId,

    /// Unique within the organization and kind
    pub name: String,

    /// Free-form readme text
    pub wiki: String,

    pub created_by: UserId,

    pub updated_by: UserId,

    pub is_public: bool,

    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,

    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Artifact {
    /// Create a new private artifact with a generated ID
    pub fn new(
        kind: ArtifactKind,
        organization_id: impl Into<OrgId>,
        name: impl Into<String>,
        wiki: impl Into<String>,
        created_by: impl Into<UserId>,
    ) -> Self {
        let now = OffsetDateTime::now_utc();
        let created_by = created_by.into();
        Self {
            id: Uuid::new_v4(),
            kind,
            organization_id: organization_id.into(),
            name: name.into(),
            wiki: wiki.into(),
            updated_by: created_by.clone(),
            created_by,
            is_public: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a metadata update on behalf of `user`
    pub fn apply(&mut self, update: ArtifactUpdate, user: UserId) {
        if let Some(wiki) = update.wiki {
            self.wiki = wiki;
        }
        if let Some(is_public) = update.is_public {
            self.is_public = is_public;
        }
        self.updated_by = user;
        self.updated_at = OffsetDateTime::now_utc();
    }
}

/// Mutable artifact metadata
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ArtifactUpdate {
    pub wiki: Option<String>,
    pub is_public: Option<bool>,
}

/// A named, independently versioned line of history within an artifact
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Branch {
    pub id: Uuid,
    pub artifact_id: Uuid,
    pub name: String,
    pub is_default: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Branch {
    pub fn new(artifact_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            artifact_id,
            name: name.into(),
            is_default: false,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    /// The branch created together with a fresh artifact
    pub fn initial(artifact_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            is_default: true,
            ..Self::new(artifact_id, name)
        }
    }
}

/// Reference row describing a storage source such as "R2" or "S3"
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceType {
    pub name: String,

    /// Public URL template. `{key}` is replaced by the object key; without the
    /// placeholder the key is appended as a path segment.
    pub public_url: Option<String>,
}

impl SourceType {
    pub fn new(name: impl Into<String>, public_url: Option<String>) -> Self {
        Self {
            name: name.into(),
            public_url,
        }
    }

    /// Public URL of an object stored under `key`, if the source exposes one
    pub fn public_url_for(&self, key: &str) -> Option<String> {
        let template = self.public_url.as_deref()?;
        if template.contains("{key}") {
            Some(template.replace("{key}", key))
        } else {
            Some(format!("{}/{}", template.trim_end_matches('/'), key))
        }
    }
}

/// External storage location of a version's content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Path {
    pub id: Uuid,
    pub source_path: String,
    pub source_type: String,
}

/// An immutable, sequentially labeled snapshot on a branch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: Uuid,
    pub branch_id: Uuid,
    /// "v1", "v2", ...
    pub label: String,
    pub hash: String,
    pub path_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Everything needed to commit a version once its content is uploaded
#[derive(Debug, Clone)]
pub struct PendingVersion {
    pub branch_id: Uuid,
    pub hash: String,
    /// Object key returned by the uploader
    pub source_path: String,
    pub source_type: String,
    /// Only set for dataset versions
    pub lineage: Option<String>,
}

/// Free-form provenance text attached to a dataset version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineage {
    pub id: Uuid,
    pub version_id: Uuid,
    pub lineage: String,
}

/// Append-only activity record of a version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Log {
    pub id: Uuid,
    pub version_id: Uuid,
    pub data: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Log {
    pub fn new(version_id: Uuid, data: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            version_id,
            data: data.into(),
            created_at: OffsetDateTime::now_utc(),
        }
    }
}

/// Branch summary embedded in version views
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BranchRef {
    pub id: Uuid,
    pub name: String,
}

/// Path with its resolved source type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathDetails {
    pub id: Uuid,
    pub source_path: String,
    pub source_type: SourceType,
}

/// A version joined with its branch, path, source type and lineage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionDetails {
    pub id: Uuid,
    pub hash: String,
    pub label: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub branch: BranchRef,
    pub path: PathDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Lineage>,
}

impl VersionDetails {
    /// Public download URL of the version's content, if its source has one
    pub fn public_url(&self) -> Option<String> {
        self.path
            .source_type
            .public_url_for(&self.path.source_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_kind_parsing() {
        assert_eq!("models".parse::<ArtifactKind>().unwrap(), ArtifactKind::Model);
        assert_eq!("Dataset".parse::<ArtifactKind>().unwrap(), ArtifactKind::Dataset);
        assert!("pipelines".parse::<ArtifactKind>().is_err());
        assert!(ArtifactKind::Dataset.supports_lineage());
        assert!(!ArtifactKind::Model.supports_lineage());
    }

    #[test]
    fn test_artifact_update_tracks_user() {
        let mut artifact = Artifact::new(ArtifactKind::Model, "acme", "resnet", "", "alice");
        assert!(!artifact.is_public);

        artifact.apply(
            ArtifactUpdate {
                wiki: Some("# ResNet".into()),
                is_public: Some(true),
            },
            UserId::from("bob"),
        );

        assert_eq!(artifact.wiki, "# ResNet");
        assert!(artifact.is_public);
        assert_eq!(artifact.created_by, UserId::from("alice"));
        assert_eq!(artifact.updated_by, UserId::from("bob"));
    }

    #[test]
    fn test_public_url_template() {
        let with_placeholder = SourceType::new("R2", Some("https://pub.example.dev/{key}?dl=1".into()));
        assert_eq!(
            with_placeholder.public_url_for("weights-abc.bin").as_deref(),
            Some("https://pub.example.dev/weights-abc.bin?dl=1")
        );

        let prefix = SourceType::new("S3", Some("https://cdn.example.com/models/".into()));
        assert_eq!(
            prefix.public_url_for("weights-abc.bin").as_deref(),
            Some("https://cdn.example.com/models/weights-abc.bin")
        );

        assert_eq!(SourceType::new("MEMORY", None).public_url_for("k"), None);
    }

    #[test]
    fn test_initial_branch_is_default() {
        let artifact_id = Uuid::new_v4();
        assert!(Branch::initial(artifact_id, "main").is_default);
        assert!(!Branch::new(artifact_id, "dev").is_default);
    }
}
