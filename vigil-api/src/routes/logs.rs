//! Log entry routes

use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::ApiResult;
use crate::state::AppState;
use vigil_core::{LogEntry, ResourceId};

/// GET /logs/{id}
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<LogEntry>> {
    Ok(Json(state.store.log_entry(id)?))
}
