use axum::{Json, extract::State};
use mcs_model::ServiceHealth;

use crate::infra::{app_state::AppState, errors::AppResult};

/// Composite health. Answers 200 whenever a supervisor exists; the body's
/// `status` carries the verdict.
pub async fn process_health(
    State(state): State<AppState>,
) -> AppResult<Json<ServiceHealth>> {
    let supervisor = state.supervisor()?;
    Ok(Json(supervisor.health().await))
}
