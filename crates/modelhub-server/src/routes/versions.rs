//! Version registration, lookup and activity routes

use crate::{
    AppState,
    error::Result,
    models::{
        ApiResponse, Caller, HashStatusRequest, HashStatusResponse, LogRequest,
        PaginatedResponse, PaginationQuery, RegisterVersionRequest, VersionResponse,
    },
    routes::{BranchPath, VersionPath},
};
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use modelhub_registry::{Lineage, Log};
use serde_json::{Value, json};
use tracing::{debug, error, info};

/// Create version routes
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{name}/branches/{branch}/register", post(register_version))
        .route("/{name}/branches/{branch}/hash-status", post(hash_status))
        .route("/{name}/branches/{branch}/next-label", get(next_label))
        .route("/{name}/branches/{branch}/versions", get(list_versions))
        .route("/{name}/branches/{branch}/versions/latest", get(latest_version))
        .route("/{name}/branches/{branch}/versions/{label}", get(get_version))
        .route(
            "/{name}/branches/{branch}/versions/{label}/logs",
            get(list_logs).post(attach_log),
        )
        .route(
            "/{name}/branches/{branch}/versions/{label}/lineage",
            get(get_lineage),
        )
}

/// Upload content and register it as the branch's next version
async fn register_version(
    State(state): State<AppState>,
    Path(path): Path<BranchPath>,
    Caller(user): Caller,
    Json(request): Json<RegisterVersionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<VersionResponse>>)> {
    let (artifact, branch) = path.load(&state).await?;
    let registration = request.into_registration(branch.id)?;
    let size = registration.content.len();

    let version = state
        .registry
        .register_version(registration)
        .await
        .map_err(|e| {
            error!("Failed to register version on {}/{}: {}", artifact.name, branch.name, e);
            e
        })?;

    info!(
        "Registered {} {}@{} ({} bytes) for {}",
        artifact.name,
        branch.name,
        version.label,
        size,
        user.as_ref()
    );

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(VersionResponse::from(version))),
    ))
}

/// Whether a version with the given hash exists on the branch
async fn hash_status(
    State(state): State<AppState>,
    Path(path): Path<BranchPath>,
    Json(request): Json<HashStatusRequest>,
) -> Result<Json<HashStatusResponse>> {
    let (_, branch) = path.load(&state).await?;
    let exists = state
        .registry
        .has_version_with_hash(branch.id, &request.hash)
        .await?;

    debug!("Hash {} on {}: exists={}", request.hash, branch.name, exists);
    Ok(Json(HashStatusResponse { exists }))
}

/// Label the next registration would receive
async fn next_label(
    State(state): State<AppState>,
    Path(path): Path<BranchPath>,
) -> Result<Json<Value>> {
    let (_, branch) = path.load(&state).await?;
    let label = state.registry.next_label(branch.id).await?;
    Ok(Json(json!({ "label": label.to_string() })))
}

async fn list_versions(
    State(state): State<AppState>,
    Path(path): Path<BranchPath>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<PaginatedResponse<VersionResponse>>> {
    let (_, branch) = path.load(&state).await?;
    let versions = state
        .registry
        .list_branch_versions(branch.id)
        .await?
        .into_iter()
        .map(VersionResponse::from)
        .collect();

    Ok(Json(query.paginate(versions)))
}

async fn latest_version(
    State(state): State<AppState>,
    Path(path): Path<BranchPath>,
) -> Result<Json<ApiResponse<VersionResponse>>> {
    let (_, branch) = path.load(&state).await?;
    let version = state.registry.latest_version(branch.id).await?;
    Ok(Json(ApiResponse::new(version.into())))
}

async fn get_version(
    State(state): State<AppState>,
    Path(path): Path<VersionPath>,
) -> Result<Json<ApiResponse<VersionResponse>>> {
    let (_, branch) = path.branch_path().load(&state).await?;
    let version = state
        .registry
        .get_version_by_label(branch.id, &path.label)
        .await?;
    Ok(Json(ApiResponse::new(version.into())))
}

async fn list_logs(
    State(state): State<AppState>,
    Path(path): Path<VersionPath>,
) -> Result<Json<ApiResponse<Vec<Log>>>> {
    let (_, branch) = path.branch_path().load(&state).await?;
    let version = state
        .registry
        .get_version_by_label(branch.id, &path.label)
        .await?;
    let logs = state.registry.list_logs(version.id).await?;
    Ok(Json(ApiResponse::new(logs)))
}

/// Append a log entry to a version
async fn attach_log(
    State(state): State<AppState>,
    Path(path): Path<VersionPath>,
    Caller(user): Caller,
    Json(request): Json<LogRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Log>>)> {
    let (_, branch) = path.branch_path().load(&state).await?;
    let version = state
        .registry
        .get_version_by_label(branch.id, &path.label)
        .await?;
    let log = state.registry.attach_log(version.id, &request.data).await?;

    debug!("Log attached to {}@{} by {}", branch.name, version.label, user.as_ref());
    Ok((StatusCode::CREATED, Json(ApiResponse::new(log))))
}

async fn get_lineage(
    State(state): State<AppState>,
    Path(path): Path<VersionPath>,
) -> Result<Json<ApiResponse<Lineage>>> {
    let (_, branch) = path.branch_path().load(&state).await?;
    let version = state
        .registry
        .get_version_by_label(branch.id, &path.label)
        .await?;
    let lineage = state.registry.get_lineage(version.id).await?;
    Ok(Json(ApiResponse::new(lineage)))
}
