//! HTTP and WebSocket front end for the MCS process service.

pub mod handlers;
pub mod infra;
pub mod routes;

use axum::Router;
use tower_http::trace::TraceLayer;

pub use infra::app_state::AppState;
pub use infra::bootstrap::build_supervisor;
pub use infra::errors::{AppError, AppResult};

/// Builds the application router with request tracing.
pub fn create_app(state: AppState) -> Router {
    routes::create_api_router()
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
