//! Axum Router Configuration
//!
//! This module defines the complete HTTP routing for the application: the
//! health check, static files, the MCP endpoint, and the OpenAPI document.

use crate::{
    handlers,
    mcp::endpoint,
    models::{ErrorResponse, HealthResponse},
    state::AppState,
};

use axum::{
    Router,
    http::{HeaderValue, header},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::set_header::SetResponseHeaderLayer;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(handlers::health, handlers::static_file),
    components(schemas(HealthResponse, ErrorResponse)),
    tags(
        (name = "InkMatch API", description = "Tattoo design tools served over MCP")
    )
)]
pub struct ApiDoc;

/// Creates the main Axum router for the application.
pub fn create_router(app_state: Arc<AppState>) -> Router {
    // Every /mcp response is readable cross-origin, including the session header.
    let mcp_router = Router::new()
        .route(
            "/mcp",
            post(endpoint::handle_post)
                .get(endpoint::handle_get)
                .delete(endpoint::handle_delete)
                .options(endpoint::preflight)
                .fallback(handlers::not_found),
        )
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static("mcp-session-id"),
        ));

    Router::new()
        .route("/", get(handlers::health).fallback(handlers::not_found))
        .route(
            "/public/{*path}",
            get(handlers::static_file).fallback(handlers::not_found),
        )
        .merge(mcp_router)
        .fallback(handlers::not_found)
        .with_state(app_state)
}
