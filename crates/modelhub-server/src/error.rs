//! Error handling for the API server

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use modelhub_registry::RegistryError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Result type for API operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// API error types
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Registry(#[from] RegistryError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Missing caller identity: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Registry(e) => match e {
                RegistryError::NotFound(_) | RegistryError::VersionNotFound(_) => {
                    StatusCode::NOT_FOUND
                }
                RegistryError::DuplicateBranchName { .. }
                | RegistryError::DuplicateArtifactName { .. }
                | RegistryError::DuplicateLabel { .. } => StatusCode::CONFLICT,
                RegistryError::UnknownSource(_) | RegistryError::Validation(_) => {
                    StatusCode::BAD_REQUEST
                }
                RegistryError::UploadFailed(_) => StatusCode::BAD_GATEWAY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Validation(_) | ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Config(_) | ApiError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::BadRequest(msg.to_string())
    }

    pub fn validation(msg: &str) -> Self {
        Self::Validation(msg.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            error!("Request failed: {}", self);
            "Internal server error".to_string()
        } else {
            self.to_string()
        };

        let body = Json(json!({
            "error": error_message,
            "status": status.as_u16()
        }));

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: RegistryError) -> StatusCode {
        ApiError::from(err).status_code()
    }

    #[test]
    fn test_registry_error_status_mapping() {
        assert_eq!(status_of(RegistryError::NotFound("branch x".into())), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(RegistryError::VersionNotFound("v3".into())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            status_of(RegistryError::DuplicateBranchName {
                artifact_id: "a".into(),
                name: "main".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(RegistryError::DuplicateLabel {
                branch_id: "b".into(),
                label: "v2".into()
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_of(RegistryError::UnknownSource("GCS".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(RegistryError::UploadFailed("timeout".into())),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            status_of(RegistryError::Persistence("disk full".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_of(RegistryError::MalformedLabel("latest".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_api_error_status_mapping() {
        assert_eq!(ApiError::bad_request("x").status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Unauthorized("x-user-id".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Config("PORT".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
