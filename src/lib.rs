//! authdesk - A small cookie-session authentication backend
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      API Layer (Axum)                        │
//! │  - /signup /login /logout                                   │
//! │  - /updateAvatar /check (require_auth)                      │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Service Layer                            │
//! │  - Validation, password hashing, avatar upload              │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Data Layer                              │
//! │  - SQLite (sqlx)                                            │
//! │  - R2 media host                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTTP handlers and DTOs
//! - `service`: Business logic layer
//! - `data`: Database layer
//! - `storage`: Media host (Cloudflare R2) and avatar decoding
//! - `auth`: Session tokens, password hashing, middleware
//! - `config`: Configuration management
//! - `error`: Error types

pub mod api;
pub mod auth;
pub mod config;
pub mod data;
pub mod error;
pub mod metrics;
pub mod service;
pub mod storage;

use std::sync::Arc;

/// Application state shared across all handlers
///
/// This struct is cloned for each request and contains
/// shared resources like the database pool and the media host.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Database connection pool
    pub db: Arc<data::Database>,

    /// Image host for avatars
    pub media: Arc<dyn storage::MediaHost>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Connect to R2 storage
    /// 2. Connect to SQLite database (see [`AppState::with_media_host`])
    ///
    /// # Errors
    /// Returns error if any initialization step fails
    pub async fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let storage = storage::MediaStorage::new(&config.storage.media, &config.cloudflare).await?;
        tracing::info!("Media storage initialized");

        Self::with_media_host(config, Arc::new(storage)).await
    }

    /// Initialize application state around an existing media host
    pub async fn with_media_host(
        config: config::AppConfig,
        media: Arc<dyn storage::MediaHost>,
    ) -> Result<Self, error::AppError> {
        let db = Arc::new(data::Database::connect(&config.database.path).await?);
        tracing::info!("Database connected");

        // Unknown-email logins verify against this; hash it before serving
        auth::password::dummy_hash(config.auth.bcrypt_cost).await?;

        let config = Arc::new(config);

        service::AccountService::new(db.clone(), media.clone(), config.clone())
            .sync_user_gauge()
            .await?;

        tracing::info!("Application state initialized successfully");

        Ok(Self { config, db, media })
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> axum::Router {
    use axum::{Router, extract::DefaultBodyLimit, middleware};
    use tower_http::{compression::CompressionLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};

    let cors_layer = build_cors_layer(&state.config.server);
    let max_body_bytes = state.config.server.max_body_bytes;

    Router::new()
        .route("/health", axum::routing::get(health_check))
        .merge(api::auth_router(state.clone()))
        .merge(api::metrics_router(state.clone()))
        .layer(middleware::from_fn(api::track_http_metrics))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(middleware::map_response(payload_too_large_as_json))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(server: &config::ServerConfig) -> tower_http::cors::CorsLayer {
    use axum::http::{HeaderValue, Method, header};
    use tower_http::cors::CorsLayer;

    if server.cors_origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = server
        .cors_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(error) => {
                tracing::error!(%error, origin = %origin, "Ignoring unparsable CORS origin");
                None
            }
        })
        .collect();

    // Credentialed CORS cannot use wildcards, so methods and headers are listed.
    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Give the body limit's plain-text 413 the `{ "message" }` error shape
async fn payload_too_large_as_json(
    response: axum::response::Response,
) -> axum::response::Response {
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;

    let is_json = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if response.status() == StatusCode::PAYLOAD_TOO_LARGE && !is_json {
        return error::AppError::PayloadTooLarge(error::PAYLOAD_TOO_LARGE_MESSAGE.to_string())
            .into_response();
    }

    response
}

async fn health_check() -> &'static str {
    "OK"
}
