//! HTTP routing and handlers.

use crate::state::AdminState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use shared_types::PlantInfo;
use std::sync::Arc;

/// Error body every non-2xx answer carries.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

struct ApiError {
    status: StatusCode,
    reason: String,
}

impl ApiError {
    fn bad_request(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            reason: reason.into(),
        }
    }

    fn not_found(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            reason: reason.into(),
        }
    }

    fn conflict(reason: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            reason: reason.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(ErrorBody { error: self.reason }),
        )
            .into_response()
    }
}

/// Build the gateway router over shared state.
pub fn router(state: Arc<AdminState>) -> Router {
    Router::new()
        .route("/plants", post(register_plant).get(list_plants))
        .route("/plants/:id", get(get_plant))
        .route("/statistics/co2/average", get(co2_average))
        .with_state(state)
}

async fn register_plant(
    State(state): State<Arc<AdminState>>,
    body: Result<Json<PlantInfo>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(plant) = body.map_err(|e| ApiError::bad_request(e.to_string()))?;
    if !plant.is_valid() {
        return Err(ApiError::bad_request(
            "plant needs a positive id, a non-empty address and a non-zero port",
        ));
    }
    let others = state
        .register(plant)
        .map_err(|e| ApiError::conflict(e.to_string()))?;
    Ok((StatusCode::CREATED, Json(others)))
}

async fn list_plants(State(state): State<Arc<AdminState>>) -> Json<Vec<PlantInfo>> {
    Json(state.plants())
}

async fn get_plant(
    State(state): State<Arc<AdminState>>,
    Path(plant_id): Path<u64>,
) -> Result<Json<PlantInfo>, ApiError> {
    state
        .plant(plant_id)
        .map(Json)
        .ok_or_else(|| ApiError::not_found(format!("no plant with id {plant_id}")))
}

#[derive(Debug, Deserialize)]
struct RangeParams {
    t1: i64,
    t2: i64,
}

async fn co2_average(
    State(state): State<Arc<AdminState>>,
    params: Result<Query<RangeParams>, QueryRejection>,
) -> Result<Json<f64>, ApiError> {
    let Query(range) = params.map_err(|e| ApiError::bad_request(e.to_string()))?;
    if range.t1 > range.t2 {
        return Err(ApiError::bad_request("t1 must not exceed t2"));
    }
    state
        .co2_average(range.t1, range.t2)
        .map(Json)
        .ok_or_else(|| ApiError::not_found("no pollution data in the requested range"))
}
