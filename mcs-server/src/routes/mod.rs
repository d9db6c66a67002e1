use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    handlers::{catalogs, health, sequence_ws, sequences},
    infra::app_state::AppState,
};

/// Create the main API router with every surface mounted under `/process`.
pub fn create_api_router() -> Router<AppState> {
    Router::new().nest("/process", create_process_router())
}

fn create_process_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::process_health))
        // Sequences
        .route("/sequences", get(sequences::list_sequences))
        .route("/sequences/{sequence_id}", get(sequences::get_sequence))
        .route(
            "/sequences/{sequence_id}/start",
            post(sequences::start_sequence),
        )
        .route(
            "/sequences/{sequence_id}/stop",
            post(sequences::stop_sequence),
        )
        .route(
            "/sequences/{sequence_id}/status",
            get(sequences::sequence_status),
        )
        .route(
            "/sequences/ws/{sequence_id}",
            get(sequence_ws::sequence_status_ws),
        )
        .merge(catalogs::catalog_routes())
}
