//! HTTP routes
//!
//! Artifacts live under `/api/orgs/{org_id}/{kind}` where `kind` is
//! `models` or `datasets`.

pub mod artifacts;
pub mod branches;
pub mod sources;
pub mod versions;

use axum::Router;
use modelhub_registry::{Artifact, ArtifactKind, Branch, OrgId};
use serde::Deserialize;

use crate::{AppState, error::Result};

/// Create the API router
pub fn router() -> Router<AppState> {
    Router::new()
        .nest(
            "/orgs/{org_id}/{kind}",
            artifacts::router()
                .merge(branches::router())
                .merge(versions::router()),
        )
        .nest("/sources", sources::router())
}

/// `/orgs/{org_id}/{kind}`
#[derive(Debug, Deserialize)]
pub struct KindPath {
    pub org_id: String,
    pub kind: String,
}

impl KindPath {
    pub fn org(&self) -> OrgId {
        OrgId::from(self.org_id.as_str())
    }

    pub fn kind(&self) -> Result<ArtifactKind> {
        Ok(self.kind.parse()?)
    }
}

/// `/orgs/{org_id}/{kind}/{name}`
#[derive(Debug, Deserialize)]
pub struct ArtifactPath {
    pub org_id: String,
    pub kind: String,
    pub name: String,
}

impl ArtifactPath {
    pub async fn load(&self, state: &AppState) -> Result<Artifact> {
        let kind: ArtifactKind = self.kind.parse()?;
        let org = OrgId::from(self.org_id.as_str());
        Ok(state
            .registry
            .get_artifact_by_name(&org, kind, &self.name)
            .await?)
    }
}

/// `/orgs/{org_id}/{kind}/{name}/branches/{branch}`
#[derive(Debug, Deserialize)]
pub struct BranchPath {
    pub org_id: String,
    pub kind: String,
    pub name: String,
    pub branch: String,
}

impl BranchPath {
    pub async fn load(&self, state: &AppState) -> Result<(Artifact, Branch)> {
        let artifact = ArtifactPath {
            org_id: self.org_id.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
        }
        .load(state)
        .await?;
        let branch = state
            .registry
            .get_branch_by_name(artifact.id, &self.branch)
            .await?;
        Ok((artifact, branch))
    }
}

/// `/orgs/{org_id}/{kind}/{name}/branches/{branch}/versions/{label}`
#[derive(Debug, Deserialize)]
pub struct VersionPath {
    pub org_id: String,
    pub kind: String,
    pub name: String,
    pub branch: String,
    pub label: String,
}

impl VersionPath {
    pub fn branch_path(&self) -> BranchPath {
        BranchPath {
            org_id: self.org_id.clone(),
            kind: self.kind.clone(),
            name: self.name.clone(),
            branch: self.branch.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::ServerConfig, create_router};
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::Response,
    };
    use base64::Engine;
    use modelhub_registry::{MemoryStorage, Registry, RegistryConfig, SqliteStore};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tempfile::{TempDir, tempdir};
    use tower::ServiceExt;

    async fn create_app() -> (Router, TempDir) {
        let dir = tempdir().unwrap();
        let url = format!("sqlite:{}/server.db", dir.path().display());
        let store = SqliteStore::new(&url).await.unwrap();
        let mut registry = Registry::new(Arc::new(store), RegistryConfig::default());
        registry
            .register_source(
                "MEMORY",
                Some("https://cdn.example.dev".to_string()),
                Arc::new(MemoryStorage::new()),
            )
            .await
            .unwrap();

        let state = AppState {
            registry: Arc::new(registry),
            config: ServerConfig::default(),
        };
        (create_router(state), dir)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> Response {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", "alice");
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn encoded(content: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(content)
    }

    #[tokio::test]
    async fn test_register_and_hash_status() {
        let (app, _dir) = create_app().await;

        let response = send(
            &app,
            "POST",
            "/api/orgs/acme/models",
            Some(json!({ "name": "resnet" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CREATED);

        for hash in ["h1", "h2"] {
            let response = send(
                &app,
                "POST",
                "/api/orgs/acme/models/resnet/branches/main/register",
                Some(json!({
                    "file_content": encoded(hash.as_bytes()),
                    "filename": "weights.bin",
                    "hash": hash,
                    "source": "MEMORY"
                })),
            )
            .await;
            assert_eq!(response.status(), StatusCode::CREATED);
        }

        let response = send(
            &app,
            "GET",
            "/api/orgs/acme/models/resnet/branches/main/versions/latest",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["data"]["label"], "v2");
        assert_eq!(body["data"]["branch"]["name"], "main");
        assert!(
            body["data"]["public_url"]
                .as_str()
                .unwrap()
                .starts_with("https://cdn.example.dev/weights-")
        );

        let response = send(
            &app,
            "POST",
            "/api/orgs/acme/models/resnet/branches/main/hash-status",
            Some(json!({ "hash": "h1" })),
        )
        .await;
        assert_eq!(json_body(response).await, json!({ "exists": true }));

        let response = send(
            &app,
            "POST",
            "/api/orgs/acme/models/resnet/branches/main/hash-status",
            Some(json!({ "hash": "h3" })),
        )
        .await;
        assert_eq!(json_body(response).await, json!({ "exists": false }));
    }

    #[tokio::test]
    async fn test_error_statuses() {
        let (app, _dir) = create_app().await;
        send(
            &app,
            "POST",
            "/api/orgs/acme/datasets",
            Some(json!({ "name": "imagenet" })),
        )
        .await;

        let response = send(
            &app,
            "POST",
            "/api/orgs/acme/datasets/imagenet/branches",
            Some(json!({ "name": "main" })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = json_body(response).await;
        assert_eq!(body["status"], 409);

        let response = send(&app, "GET", "/api/orgs/acme/datasets/missing", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(
            &app,
            "POST",
            "/api/orgs/acme/datasets/imagenet/branches/main/register",
            Some(json!({
                "file_content": encoded(b"rows"),
                "filename": "train.csv",
                "source": "GCS"
            })),
        )
        .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = send(
            &app,
            "GET",
            "/api/orgs/acme/datasets/imagenet/branches/main/versions/latest",
            None,
        )
        .await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_writes_require_caller() {
        let (app, _dir) = create_app().await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/orgs/acme/models")
            .header("content-type", "application/json")
            .body(Body::from(json!({ "name": "resnet" }).to_string()))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
