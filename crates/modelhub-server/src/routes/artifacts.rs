//! Artifact management routes

use crate::{
    AppState,
    error::Result,
    models::{
        ApiResponse, Caller, CreateArtifactRequest, PaginatedResponse, PaginationQuery,
        UpdateArtifactRequest, VersionResponse,
    },
    routes::{ArtifactPath, KindPath},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};
use modelhub_registry::{Artifact, ArtifactUpdate};
use tracing::{debug, info};

/// Create artifact routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_artifacts).post(create_artifact))
        .route("/{name}", get(get_artifact).patch(update_artifact))
        .route("/{name}/versions", get(list_artifact_versions))
}

/// List artifacts of one kind in an organization
async fn list_artifacts(
    State(state): State<AppState>,
    Path(path): Path<KindPath>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<Artifact>>> {
    debug!("Listing {} of {}", path.kind, path.org_id);

    let artifacts = state
        .registry
        .list_artifacts(&path.org(), path.kind()?)
        .await?;

    Ok(Json(query.paginate(artifacts)))
}

/// Create an artifact with its default branch
async fn create_artifact(
    State(state): State<AppState>,
    Path(path): Path<KindPath>,
    Caller(user): Caller,
    Json(request): Json<CreateArtifactRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Artifact>>)> {
    let mut artifact = state
        .registry
        .create_artifact(path.kind()?, path.org(), &request.name, &request.wiki, user.clone())
        .await?;

    if request.is_public {
        artifact = state
            .registry
            .update_artifact(
                artifact.id,
                ArtifactUpdate {
                    wiki: None,
                    is_public: Some(true),
                },
                user.clone(),
            )
            .await?;
    }

    info!(
        "Created {} {}/{} for {}",
        artifact.kind,
        path.org_id,
        artifact.name,
        user.as_ref()
    );

    Ok((StatusCode::CREATED, Json(ApiResponse::new(artifact))))
}

/// Get an artifact by name
async fn get_artifact(
    State(state): State<AppState>,
    Path(path): Path<ArtifactPath>,
) -> Result<Json<ApiResponse<Artifact>>> {
    let artifact = path.load(&state).await?;
    Ok(Json(ApiResponse::new(artifact)))
}

/// Update wiki text or visibility
async fn update_artifact(
    State(state): State<AppState>,
    Path(path): Path<ArtifactPath>,
    Caller(user): Caller,
    Json(request): Json<UpdateArtifactRequest>,
) -> Result<Json<ApiResponse<Artifact>>> {
    let artifact = path.load(&state).await?;
    let updated = state
        .registry
        .update_artifact(artifact.id, request.into(), user)
        .await?;

    Ok(Json(ApiResponse::new(updated)))
}

/// List versions across every branch of an artifact
async fn list_artifact_versions(
    State(state): State<AppState>,
    Path(path): Path<ArtifactPath>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<VersionResponse>>> {
    let artifact = path.load(&state).await?;
    let versions = state
        .registry
        .list_artifact_versions(artifact.id)
        .await?
        .into_iter()
        .map(VersionResponse::from)
        .collect();

    Ok(Json(query.paginate(versions)))
}
