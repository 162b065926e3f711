//! Trigger routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::eval;
use crate::state::AppState;
use vigil_core::{ResourceId, Trigger};

/// POST /triggers
pub async fn create(
    State(state): State<AppState>,
    Json(mut trigger): Json<Trigger>,
) -> ApiResult<impl IntoResponse> {
    if trigger.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    if trigger.condition.trim().is_empty() {
        return Err(ApiError::missing_field("condition"));
    }
    state.store.service_view(trigger.parent).map_err(|_| {
        ApiError::bad_request(format!("service view {} does not exist", trigger.parent))
    })?;
    trigger.id = ResourceId::new();
    let created = eval::create_trigger(state.store.as_ref(), trigger, state.config.debug_vm)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /triggers/{id}
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<Trigger>> {
    Ok(Json(state.store.trigger(id)?))
}

/// DELETE /triggers/{id}
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<StatusCode> {
    state.store.delete_trigger(id)?;
    Ok(StatusCode::NO_CONTENT)
}
