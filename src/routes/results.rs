//! Result upload routes

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
};

use crate::error::{AppError, Result};
use crate::results::ResultStore;
use crate::state::AppState;

/// PUT /results/:name
///
/// Any path not shaped exactly like `results/<name>` is refused with 403 and
/// nothing is written.
pub async fn store_result(
    State(state): State<AppState>,
    Path(path): Path<String>,
    body: Bytes,
) -> Result<StatusCode> {
    let name = ResultStore::authorize(&path)?;
    state.results().put(name, &body).await?;
    Ok(StatusCode::OK)
}

/// PUT /
pub async fn reject_result_write() -> AppError {
    AppError::Forbidden
}
