//! Static frontend and operational endpoints.

use std::path::{Component, Path};

use axum::{
    extract::State,
    http::{StatusCode, Uri, header::CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use tracing::{debug, info, warn};

use crate::{AppState, error::ApiError};

fn content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "application/javascript",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("ico") => "image/x-icon",
        _ => "text/plain",
    }
}

fn file_not_found() -> ApiError {
    ApiError::not_found("File not found")
}

/// Serves files below the static directory; `/` maps to `index.html`.
///
/// Only plain path segments are accepted, so `..` cannot escape the directory.
pub async fn serve(State(state): State<AppState>, uri: Uri) -> Result<Response, ApiError> {
    let requested = uri.path().trim_start_matches('/');
    let requested = Path::new(if requested.is_empty() { "index.html" } else { requested });

    if !requested.components().all(|c| matches!(c, Component::Normal(_))) {
        warn!(path = %uri.path(), "Rejected static path outside the asset directory");
        return Err(file_not_found());
    }

    let file_path = state.static_dir.join(requested);
    debug!(?file_path, "Serving static file");

    match tokio::fs::read(&file_path).await {
        Ok(content) => Ok(([(CONTENT_TYPE, content_type(requested))], content).into_response()),
        Err(_) => Err(file_not_found()),
    }
}

pub async fn health() -> &'static str {
    info!("Health check requested");
    "OK"
}

pub async fn metrics(State(state): State<AppState>) -> Result<Response, ApiError> {
    let text = state.metrics.render().map_err(ApiError::internal)?;
    Ok((StatusCode::OK, text).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_by_extension() {
        assert_eq!(content_type(Path::new("index.html")), "text/html; charset=utf-8");
        assert_eq!(content_type(Path::new("js/app.js")), "application/javascript");
        assert_eq!(content_type(Path::new("logo.JPG")), "text/plain");
        assert_eq!(content_type(Path::new("README")), "text/plain");
    }
}
