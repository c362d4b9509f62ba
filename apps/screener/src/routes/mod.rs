pub mod batches;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let upload_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/batches",
            post(batches::handle_create_batch).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/v1/batches/latest", get(batches::handle_latest_batch))
        .route(
            "/api/v1/batches/latest/csv",
            get(batches::handle_latest_csv),
        )
        .with_state(state)
}
