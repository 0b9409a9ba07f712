//! File serving routes
//!
//! Maps the request path straight onto the storage root. The same handler
//! serves submission archives, task files by hash and results.

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

/// GET /*path
pub async fn serve_file(
    State(state): State<AppState>,
    Path(path): Path<String>,
) -> Result<Response> {
    let target = state
        .layout()
        .resolve(&path)
        .ok_or_else(|| AppError::NotFound(path.clone()))?;

    match tokio::fs::metadata(&target).await {
        Ok(metadata) if metadata.is_file() => {}
        _ => return Err(AppError::NotFound(path)),
    }

    let data = match tokio::fs::read(&target).await {
        Ok(data) => data,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(AppError::NotFound(path));
        }
        Err(e) => return Err(e.into()),
    };

    let content_type = mime_guess::from_path(&target).first_or_octet_stream();

    tracing::debug!(path = %path, bytes = data.len(), "Serving file");

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type.as_ref())
        .header(header::CONTENT_LENGTH, data.len())
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// GET /
pub async fn serve_root() -> AppError {
    AppError::NotFound("/".to_string())
}
