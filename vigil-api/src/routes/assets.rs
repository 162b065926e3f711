//! Asset routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use vigil_core::{Asset, ResourceId};

/// POST /assets
pub async fn create(
    State(state): State<AppState>,
    Json(mut asset): Json<Asset>,
) -> ApiResult<impl IntoResponse> {
    if asset.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    state
        .store
        .service_view(asset.parent)
        .map_err(|_| ApiError::bad_request(format!("service view {} does not exist", asset.parent)))?;
    asset.id = ResourceId::new();
    state.store.insert_asset(asset.clone())?;
    Ok((StatusCode::CREATED, Json(asset)))
}

/// GET /assets/{id}
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<Asset>> {
    Ok(Json(state.store.asset(id)?))
}

/// DELETE /assets/{id}
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<StatusCode> {
    state.store.delete_asset(id)?;
    Ok(StatusCode::NO_CONTENT)
}
