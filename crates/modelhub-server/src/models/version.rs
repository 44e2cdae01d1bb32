//! Version registration and activity models

use base64::Engine;
use modelhub_registry::{ContentDigest, RegisterVersion, VersionDetails};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{ApiError, Result};

/// Request to upload content and register it as the next version
#[derive(Debug, Deserialize)]
pub struct RegisterVersionRequest {
    /// Base64 encoded file content
    pub file_content: String,

    pub filename: String,

    /// Client-computed content hash; `sha256:<hex>` of the content when omitted.
    /// Hashes in `sha256:` form are checked against the content.
    pub hash: Option<String>,

    /// Storage source name, e.g. "R2" or "S3"
    pub source: String,

    /// Provenance text (datasets only)
    pub lineage: Option<String>,
}

impl RegisterVersionRequest {
    /// Decode the content and build the registry input for `branch_id`
    pub fn into_registration(self, branch_id: Uuid) -> Result<RegisterVersion> {
        let content = base64::engine::general_purpose::STANDARD
            .decode(self.file_content.trim())
            .map_err(|e| ApiError::bad_request(&format!("Invalid base64 file_content: {}", e)))?;

        if self.filename.trim().is_empty() {
            return Err(ApiError::validation("filename must not be empty"));
        }

        let hash = match self.hash.map(|h| h.trim().to_string()) {
            Some(hash) if ContentDigest::is_digest(&hash) => {
                if !ContentDigest::is_valid(&hash) {
                    return Err(ApiError::validation("hash is not a valid sha256 digest"));
                }
                if !ContentDigest::verify(&content, &hash) {
                    return Err(ApiError::bad_request("hash does not match file_content"));
                }
                hash
            }
            Some(hash) if !hash.is_empty() => hash,
            _ => ContentDigest::compute(&content),
        };

        Ok(RegisterVersion {
            branch_id,
            content,
            filename: self.filename,
            hash,
            source: self.source,
            lineage: self.lineage.filter(|l| !l.trim().is_empty()),
        })
    }
}

/// Hash lookup on a branch
#[derive(Debug, Deserialize)]
pub struct HashStatusRequest {
    pub hash: String,
}

#[derive(Debug, Serialize)]
pub struct HashStatusResponse {
    pub exists: bool,
}

/// Log entry to append to a version
#[derive(Debug, Deserialize)]
pub struct LogRequest {
    pub data: String,
}

/// Version details plus the public download URL of its content
#[derive(Debug, Serialize)]
pub struct VersionResponse {
    #[serde(flatten)]
    pub version: VersionDetails,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_url: Option<String>,
}

impl From<VersionDetails> for VersionResponse {
    fn from(version: VersionDetails) -> Self {
        let public_url = version.public_url();
        Self {
            version,
            public_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(content: &str, hash: Option<&str>) -> RegisterVersionRequest {
        RegisterVersionRequest {
            file_content: content.to_string(),
            filename: "weights.bin".to_string(),
            hash: hash.map(str::to_string),
            source: "R2".to_string(),
            lineage: Some("  ".to_string()),
        }
    }

    #[test]
    fn test_registration_decodes_content_and_computes_hash() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"hello");
        let branch_id = Uuid::new_v4();
        let registration = request(&encoded, None).into_registration(branch_id).unwrap();

        assert_eq!(registration.branch_id, branch_id);
        assert_eq!(registration.content, b"hello".to_vec());
        assert_eq!(registration.hash, ContentDigest::compute(b"hello"));
        assert!(registration.lineage.is_none());
    }

    #[test]
    fn test_client_hash_is_kept() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"hello");
        let registration = request(&encoded, Some("h1"))
            .into_registration(Uuid::new_v4())
            .unwrap();
        assert_eq!(registration.hash, "h1");
    }

    #[test]
    fn test_sha256_client_hash_is_checked() {
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"hello");
        let digest = ContentDigest::compute(b"hello");
        let registration = request(&encoded, Some(&digest))
            .into_registration(Uuid::new_v4())
            .unwrap();
        assert_eq!(registration.hash, digest);

        let other = ContentDigest::compute(b"goodbye");
        let result = request(&encoded, Some(&other)).into_registration(Uuid::new_v4());
        assert!(matches!(result, Err(ApiError::BadRequest(_))));

        let result = request(&encoded, Some("sha256:abc")).into_registration(Uuid::new_v4());
        assert!(matches!(result, Err(ApiError::Validation(_))));
    }

    #[test]
    fn test_invalid_base64_is_bad_request() {
        let result = request("not base64!!", None).into_registration(Uuid::new_v4());
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }
}
