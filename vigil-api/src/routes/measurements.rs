//! Measurement routes
//!
//! PUT selects its operation with a bare query key, mirroring the wire
//! protocol clients already speak: `?result`, `?objective` and
//! `?userActivated`.

use axum::{
    extract::{Path, RawQuery, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::eval;
use crate::state::AppState;
use vigil_core::{Measurement, MeasurementResult, MeasurementState, Objective, ResourceId};

/// POST /measurements
pub async fn create(
    State(state): State<AppState>,
    Json(mut measurement): Json<Measurement>,
) -> ApiResult<impl IntoResponse> {
    if measurement.name.trim().is_empty() {
        return Err(ApiError::missing_field("name"));
    }
    state.store.attribute(measurement.parent).map_err(|_| {
        ApiError::bad_request(format!("attribute {} does not exist", measurement.parent))
    })?;
    measurement.id = ResourceId::new();
    let created =
        eval::create_measurement(state.store.as_ref(), measurement, state.config.debug_vm)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /measurements/{id}
pub async fn fetch(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<Json<Measurement>> {
    Ok(Json(state.store.measurement(id)?))
}

#[derive(Debug, Deserialize)]
struct StateBody {
    state: MeasurementState,
}

/// PUT /measurements/{id}?result|objective|userActivated
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
    RawQuery(query): RawQuery,
    Json(body): Json<serde_json::Value>,
) -> ApiResult<Json<Measurement>> {
    let store = state.store.as_ref();
    let debug_vm = state.config.debug_vm;

    let updated = match query.as_deref() {
        Some("result") => {
            let result: MeasurementResult = serde_json::from_value(body)
                .map_err(|e| ApiError::bad_request(format!("invalid result body: {}", e)))?;
            eval::post_result(store, id, result, debug_vm)?
        }
        Some("objective") => {
            let objective: Objective = serde_json::from_value(body)
                .map_err(|e| ApiError::bad_request(format!("invalid objective body: {}", e)))?;
            eval::put_objective(store, id, objective, debug_vm)?
        }
        Some("userActivated") => {
            let requested: StateBody = serde_json::from_value(body)
                .map_err(|e| ApiError::bad_request(format!("invalid state body: {}", e)))?;
            eval::set_user_activated(store, id, requested.state)?
        }
        _ => return Err(ApiError::bad_request("invalid query string")),
    };

    Ok(Json(updated))
}

/// DELETE /measurements/{id}
pub async fn remove(
    State(state): State<AppState>,
    Path(id): Path<ResourceId>,
) -> ApiResult<StatusCode> {
    state.store.delete_measurement(id)?;
    Ok(StatusCode::NO_CONTENT)
}
