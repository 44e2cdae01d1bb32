//! Branch management routes

use crate::{
    AppState,
    error::Result,
    models::{ApiResponse, Caller, CreateBranchRequest, CreateBranchesRequest},
    routes::{ArtifactPath, BranchPath},
};
use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
};
use modelhub_registry::Branch;
use tracing::info;

/// Create branch routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{name}/branches", get(list_branches).post(create_branch))
        .route("/{name}/branches/batch", post(create_branches))
        .route(
            "/{name}/branches/{branch}",
            get(get_branch).delete(delete_branch),
        )
        .route("/{name}/branches/{branch}/default", put(set_default_branch))
}

async fn list_branches(
    State(state): State<AppState>,
    Path(path): Path<ArtifactPath>,
) -> Result<Json<ApiResponse<Vec<Branch>>>> {
    let artifact = path.load(&state).await?;
    let branches = state.registry.list_branches(artifact.id).await?;
    Ok(Json(ApiResponse::new(branches)))
}

async fn create_branch(
    State(state): State<AppState>,
    Path(path): Path<ArtifactPath>,
    Caller(user): Caller,
    Json(request): Json<CreateBranchRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Branch>>)> {
    let artifact = path.load(&state).await?;
    let branch = state
        .registry
        .create_branch(artifact.id, &request.name)
        .await?;

    info!("Branch {} created on {} by {}", branch.name, artifact.name, user.as_ref());
    Ok((StatusCode::CREATED, Json(ApiResponse::new(branch))))
}

/// Create several branches; stops at the first failure
async fn create_branches(
    State(state): State<AppState>,
    Path(path): Path<ArtifactPath>,
    Caller(user): Caller,
    Json(request): Json<CreateBranchesRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Vec<Branch>>>)> {
    let artifact = path.load(&state).await?;
    let branches = state
        .registry
        .create_branches(artifact.id, request.names.as_slice())
        .await?;

    info!(
        "{} branches created on {} by {}",
        branches.len(),
        artifact.name,
        user.as_ref()
    );
    Ok((StatusCode::CREATED, Json(ApiResponse::new(branches))))
}

async fn get_branch(
    State(state): State<AppState>,
    Path(path): Path<BranchPath>,
) -> Result<Json<ApiResponse<Branch>>> {
    let (_, branch) = path.load(&state).await?;
    Ok(Json(ApiResponse::new(branch)))
}

/// Delete a branch and all of its versions
async fn delete_branch(
    State(state): State<AppState>,
    Path(path): Path<BranchPath>,
    Caller(user): Caller,
) -> Result<Json<ApiResponse<Branch>>> {
    let (artifact, branch) = path.load(&state).await?;
    state.registry.delete_branch(branch.id).await?;

    info!("Branch {} deleted from {} by {}", branch.name, artifact.name, user.as_ref());
    let message = format!("Branch '{}' deleted", branch.name);
    Ok(Json(ApiResponse::with_message(branch, message)))
}

/// Make a branch the artifact's default
async fn set_default_branch(
    State(state): State<AppState>,
    Path(path): Path<BranchPath>,
    Caller(user): Caller,
) -> Result<Json<ApiResponse<Branch>>> {
    let (artifact, branch) = path.load(&state).await?;
    let branch = state
        .registry
        .set_default_branch(artifact.id, branch.id)
        .await?;

    info!("Default branch of {} set to {} by {}", artifact.name, branch.name, user.as_ref());
    Ok(Json(ApiResponse::new(branch)))
}
