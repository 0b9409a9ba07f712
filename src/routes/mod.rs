//! Route modules for the file exchange server
//!
//! - `POST /`              submit a job, responds with its id
//! - `PUT /results/<name>` store a worker result
//! - `GET /<path>`         fetch any stored file (archives, tasks, results)

pub mod files;
pub mod results;
pub mod submit;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the complete router
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config().server.max_body_bytes;

    Router::new()
        .route(
            "/",
            post(submit::submit_job)
                .put(results::reject_result_write)
                .get(files::serve_root),
        )
        .route(
            "/*path",
            get(files::serve_file).put(results::store_result),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
