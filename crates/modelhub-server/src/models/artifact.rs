//! Artifact and branch models

use modelhub_registry::ArtifactUpdate;
use serde::Deserialize;

/// Request to create a model or dataset
#[derive(Debug, Deserialize)]
pub struct CreateArtifactRequest {
    pub name: String,

    #[serde(default)]
    pub wiki: String,

    #[serde(default)]
    pub is_public: bool,
}

/// Partial update of an artifact's metadata
#[derive(Debug, Deserialize)]
pub struct UpdateArtifactRequest {
    pub wiki: Option<String>,
    pub is_public: Option<bool>,
}

impl From<UpdateArtifactRequest> for ArtifactUpdate {
    fn from(request: UpdateArtifactRequest) -> Self {
        ArtifactUpdate {
            wiki: request.wiki,
            is_public: request.is_public,
        }
    }
}

/// Request to create one branch
#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub name: String,
}

/// Request to create several branches at once
#[derive(Debug, Deserialize)]
pub struct CreateBranchesRequest {
    pub names: Vec<String>,
}
