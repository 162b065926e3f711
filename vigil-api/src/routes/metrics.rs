//! Metric routes

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use vigil_core::{Metric, ResourceId};

/// POST /metrics
pub async fn create(
    State(state): State<AppState>,
    Json(mut metric): Json<Metric>,
) -> ApiResult<impl IntoResponse> {
    if metric.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    if metric.result_format.is_empty() {
        return Err(ApiError::missing_field("resultFormat"));
    }
    metric.id = ResourceId::new();
    state.store.insert_metric(metric.clone())?;
    Ok((StatusCode::CREATED, Json(metric)))
}

/// GET /metrics/{id}
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<Metric>> {
    Ok(Json(state.store.metric(id)?))
}

/// DELETE /metrics/{id} - refused with 409 while referenced.
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<StatusCode> {
    state.store.delete_metric(id)?;
    Ok(StatusCode::NO_CONTENT)
}
