use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use mcs_core::CatalogKind;
use mcs_model::{CatalogEntryResponse, CatalogListResponse};

use crate::infra::{app_state::AppState, errors::AppResult};

pub async fn list_entries(
    State(state): State<AppState>,
    kind: CatalogKind,
) -> AppResult<Json<CatalogListResponse>> {
    let entries = state.supervisor()?.catalog_entries(kind)?;
    Ok(Json(CatalogListResponse {
        catalog: kind.name().to_string(),
        entries,
    }))
}

pub async fn get_entry(
    State(state): State<AppState>,
    Path(name): Path<String>,
    kind: CatalogKind,
) -> AppResult<Json<CatalogEntryResponse>> {
    let name = state.supervisor()?.catalog_entry(kind, &name)?;
    Ok(Json(CatalogEntryResponse {
        catalog: kind.name().to_string(),
        name,
    }))
}

/// `GET /{plural}` and `GET /{plural}/{name}` for every catalog kind.
pub fn catalog_routes() -> Router<AppState> {
    CatalogKind::ALL.into_iter().fold(Router::new(), |router, kind| {
        router
            .route(
                &format!("/{}", kind.plural()),
                get(move |state: State<AppState>| list_entries(state, kind)),
            )
            .route(
                &format!("/{}/{{name}}", kind.plural()),
                get(move |state: State<AppState>, name: Path<String>| {
                    get_entry(state, name, kind)
                }),
            )
    })
}
