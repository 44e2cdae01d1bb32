//! Storage source routes

use crate::{AppState, error::Result, models::ApiResponse};
use axum::{Json, Router, extract::State, routing::get};
use modelhub_registry::SourceType;

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_sources))
}

/// Sources accepted by the register endpoint
async fn list_sources(State(state): State<AppState>) -> Result<Json<ApiResponse<Vec<SourceType>>>> {
    let sources = state.registry.list_sources().await?;
    Ok(Json(ApiResponse::new(sources)))
}
