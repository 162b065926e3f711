//! Service view routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use vigil_core::{ResourceId, ServiceView};

/// POST /serviceviews
pub async fn create(
    State(state): State<AppState>,
    Json(mut view): Json<ServiceView>,
) -> ApiResult<impl IntoResponse> {
    if view.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    view.id = ResourceId::new();
    state.store.insert_service_view(view.clone())?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// GET /serviceviews/{id}
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<ServiceView>> {
    Ok(Json(state.store.service_view(id)?))
}

/// DELETE /serviceviews/{id}
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<StatusCode> {
    state.store.delete_service_view(id)?;
    Ok(StatusCode::NO_CONTENT)
}
