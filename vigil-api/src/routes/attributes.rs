//! Attribute routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use vigil_core::{Attribute, ResourceId};

/// POST /attributes
pub async fn create(
    State(state): State<AppState>,
    Json(mut attribute): Json<Attribute>,
) -> ApiResult<impl IntoResponse> {
    if attribute.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    state
        .store
        .asset(attribute.parent)
        .map_err(|_| ApiError::bad_request(format!("asset {} does not exist", attribute.parent)))?;
    attribute.id = ResourceId::new();
    state.store.insert_attribute(attribute.clone())?;
    Ok((StatusCode::CREATED, Json(attribute)))
}

/// GET /attributes/{id}
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<Attribute>> {
    Ok(Json(state.store.attribute(id)?))
}

/// DELETE /attributes/{id}
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<StatusCode> {
    state.store.delete_attribute(id)?;
    Ok(StatusCode::NO_CONTENT)
}
