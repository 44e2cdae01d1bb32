//! Modelhub HTTP API Server
//!
//! Provides REST API endpoints for registering model and dataset versions,
//! managing branches and recording version logs and lineage.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::HeaderValue,
    response::Json,
    routing::get,
};
use modelhub_registry::{
    MemoryStorage, MetadataStore, Registry, RegistryConfig, S3Storage, SqliteStore,
};
use serde_json::{Value, json};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

mod config;
mod error;
mod models;
mod routes;

use config::ServerConfig;
use error::{ApiError, Result};

/// Storage sources configured from `<PREFIX>_*` environment variables
const S3_COMPATIBLE_SOURCES: [&str; 2] = ["R2", "S3"];

/// Main application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub config: ServerConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.default_log_filter().to_string()),
        )
        .init();

    info!("Starting Modelhub Server on {}:{}", config.host, config.port);

    if std::env::var("DATABASE_URL").is_err() {
        std::fs::create_dir_all("./data")?;
    }
    let store: Arc<dyn MetadataStore> = Arc::new(SqliteStore::from_env().await?);

    let registry_config = RegistryConfig::from_env()?;
    let mut registry = Registry::new(store, registry_config);

    for prefix in S3_COMPATIBLE_SOURCES {
        if std::env::var(format!("{}_BUCKET", prefix)).is_err() {
            info!("{} source not configured, skipping", prefix);
            continue;
        }

        let storage = S3Storage::from_env_with_prefix(prefix)
            .await
            .map_err(|e| ApiError::Config(format!("Invalid {} storage settings: {}", prefix, e)))?;

        // Ensure bucket exists
        if let Err(e) = storage.ensure_bucket().await {
            error!("Failed to ensure {} bucket exists: {}", prefix, e);
        }

        let public_url = storage.public_url().map(str::to_string);
        registry
            .register_source(prefix, public_url, Arc::new(storage))
            .await?;
    }

    if config.enable_memory_source {
        warn!("MEMORY source enabled; uploaded content is lost on restart");
        registry
            .register_source("MEMORY", None, Arc::new(MemoryStorage::new()))
            .await?;
    }

    // Create application state
    let state = AppState {
        registry: Arc::new(registry),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|_| ApiError::Config(format!("Invalid bind address {}", config.host)))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the main application router
fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        // Health check
        .route("/health", get(health_check))
        // API routes
        .nest("/api", routes::router())
        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(DefaultBodyLimit::max(body_limit)),
        )
        .with_state(state)
}

fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.allows_any_origin() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Health check endpoint
async fn health_check() -> Result<Json<Value>> {
    Ok(Json(json!({
        "status": "healthy",
        "service": "modelhub-server",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": time::OffsetDateTime::now_utc()
    })))
}
