use axum::{
    Json,
    extract::{Path, State},
};
use mcs_model::{SequenceListResponse, SequenceResponse, StatusResponse};
use tracing::info;

use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn list_sequences(
    State(state): State<AppState>,
) -> AppResult<Json<SequenceListResponse>> {
    let sequences = state.supervisor()?.list_sequences()?;
    Ok(Json(SequenceListResponse { sequences }))
}

pub async fn get_sequence(
    State(state): State<AppState>,
    Path(sequence_id): Path<String>,
) -> AppResult<Json<SequenceResponse>> {
    let sequence = state.supervisor()?.get_sequence(&sequence_id)?;
    Ok(Json(SequenceResponse { sequence }))
}

pub async fn start_sequence(
    State(state): State<AppState>,
    Path(sequence_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let status = state.supervisor()?.start_sequence(&sequence_id)?;
    info!(%sequence_id, revision = status.revision, "sequence start requested");
    Ok(Json(StatusResponse { status }))
}

pub async fn stop_sequence(
    State(state): State<AppState>,
    Path(sequence_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let status = state.supervisor()?.stop_sequence(&sequence_id)?;
    info!(%sequence_id, state = %status.state, "sequence stop requested");
    Ok(Json(StatusResponse { status }))
}

pub async fn sequence_status(
    State(state): State<AppState>,
    Path(sequence_id): Path<String>,
) -> AppResult<Json<StatusResponse>> {
    let status = state.supervisor()?.sequence_status(&sequence_id)?;
    Ok(Json(StatusResponse { status }))
}
