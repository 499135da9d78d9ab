//! Route configuration and setup

use std::sync::Arc;

use anyhow::Result;
use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Json, Router,
};
use stowage_core::Config;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::api_doc;
use crate::handlers;
use crate::state::AppState;

/// JSON control-plane bodies only; file bytes never pass through this server.
const MAX_REQUEST_BODY_BYTES: usize = 5 * 1024 * 1024;

/// Setup all application routes
pub fn setup_routes(config: &Config, state: Arc<AppState>) -> Result<Router<()>> {
    let cors = setup_cors(config)?;

    let api_routes = Router::new()
        .route("/health", get(handlers::health::health))
        .route(
            "/api/v0/uploads/initiate",
            post(handlers::initiate::initiate_upload),
        )
        .route(
            "/api/v0/uploads/{session_id}/parts/{part_number}/url",
            post(handlers::part_url::generate_part_upload_url),
        )
        .route(
            "/api/v0/uploads/{session_id}/complete",
            post(handlers::complete::complete_multipart_upload),
        )
        .route(
            "/api/v0/uploads/{session_id}/abort",
            post(handlers::abort::abort_multipart_upload),
        )
        .route(
            "/api/v0/uploads/events",
            get(handlers::progress::upload_events),
        )
        .route(
            "/api/v0/webhooks/storage",
            post(handlers::webhook::ingest_storage_events),
        )
        .route(
            "/api/openapi.json",
            get(|| async { Json(api_doc::get_openapi_spec()) }),
        )
        .with_state(state);

    let app = api_routes
        .nest(
            "/docs",
            utoipa_rapidoc::RapiDoc::new("/api/openapi.json")
                .path("/docs")
                .into(),
        )
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    Ok(app)
}

fn setup_cors(config: &Config) -> Result<CorsLayer> {
    let cors = if config.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    } else {
        let origins: Result<Vec<HeaderValue>, _> = config
            .cors_origins
            .iter()
            .map(|origin| origin.parse::<HeaderValue>())
            .collect();
        CorsLayer::new()
            .allow_origin(origins?)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers(Any)
    };

    Ok(cors)
}
