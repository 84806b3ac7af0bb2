//! Axum Handlers for the plain HTTP surface
//!
//! Health check, static files under `/public`, and the catch-all 404. The MCP
//! endpoint lives in `crate::mcp::endpoint`.

use axum::{
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
};
use std::{
    path::{Component, PathBuf},
    sync::Arc,
};
use tracing::{debug, error};

use crate::{
    models::{ErrorResponse, HealthResponse},
    state::AppState,
};

pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    InternalServerError(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest(message) => {
                (StatusCode::BAD_REQUEST, Json(ErrorResponse { message })).into_response()
            }
            ApiError::NotFound(message) => {
                (StatusCode::NOT_FOUND, Json(ErrorResponse { message })).into_response()
            }
            ApiError::InternalServerError(err) => {
                error!("Internal Server Error: {:?}", err);
                let message = "An internal server error occurred.".to_string();
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse { message }),
                )
                    .into_response()
            }
        }
    }
}

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self::InternalServerError(err.into())
    }
}

/// Liveness probe.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Serve a file from the public directory.
#[utoipa::path(
    get,
    path = "/public/{path}",
    responses(
        (status = 200, description = "File contents"),
        (status = 404, description = "No such file", body = ErrorResponse)
    ),
    params(
        ("path" = String, Path, description = "File path relative to the public directory")
    )
)]
pub async fn static_file(
    State(state): State<Arc<AppState>>,
    Path(path): Path<String>,
) -> Result<Response, ApiError> {
    let relative = safe_relative_path(&path).ok_or_else(not_found_error)?;
    let full_path = state.config.public_dir.join(&relative);

    let bytes = match tokio::fs::read(&full_path).await {
        Ok(bytes) => bytes,
        Err(e) => {
            debug!(path = %full_path.display(), "Static file unavailable: {}", e);
            return Err(not_found_error());
        }
    };

    Ok(([(header::CONTENT_TYPE, content_type_for(&relative))], bytes).into_response())
}

/// Fallback for every unmatched route or method.
pub async fn not_found() -> ApiError {
    not_found_error()
}

fn not_found_error() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}

/// Accepts only plain relative components, so the result cannot leave the
/// public directory.
fn safe_relative_path(path: &str) -> Option<PathBuf> {
    let candidate = std::path::Path::new(path);
    let mut relative = PathBuf::new();
    for component in candidate.components() {
        match component {
            Component::Normal(part) => relative.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!relative.as_os_str().is_empty()).then_some(relative)
}

fn content_type_for(path: &std::path::Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        _ => "text/plain",
    }
}
