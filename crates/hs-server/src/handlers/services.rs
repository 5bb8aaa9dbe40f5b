//! Catalog API endpoint.

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use hs_catalog::Catalog;

use crate::error::ServerError;
use crate::state::AppState;

/// Handle `GET /api/services`: the catalog as `{"service": [...]}`.
pub(crate) async fn get_services(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Catalog>, ServerError> {
    Ok(Json(Catalog::load(&state.services_dir)?))
}
