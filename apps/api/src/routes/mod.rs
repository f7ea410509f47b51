pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::intake::handlers;
use crate::intake::validation::MAX_UPLOAD_BYTES;
use crate::state::AppState;

/// Request body ceiling: a base64 resume at the upload limit plus form fields.
const MAX_BODY_BYTES: usize = MAX_UPLOAD_BYTES / 3 * 4 + 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        .route("/api/v1/jobs", post(handlers::handle_create_job))
        .route("/api/v1/jobs/upload", post(handlers::handle_upload_job))
        .route("/api/v1/jobs/:job_id/status", get(handlers::handle_job_status))
        .route("/api/v1/jobs/:job_id/download", get(handlers::handle_download))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
