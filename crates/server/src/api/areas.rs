//! Area registry endpoints.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use orderflow_core::{Area, CreateAreaRequest, StoreError};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ListAreasParams {
    /// When set, only areas with a matching active flag are returned.
    pub active: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct ListAreasResponse {
    pub areas: Vec<Area>,
}

pub async fn create_area(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateAreaRequest>,
) -> Result<(StatusCode, Json<Area>), ApiError> {
    let area = state.store().create_area(body)?;
    Ok((StatusCode::CREATED, Json(area)))
}

pub async fn list_areas(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListAreasParams>,
) -> Result<Json<ListAreasResponse>, ApiError> {
    let areas = state.store().list_areas(params.active)?;
    Ok(Json(ListAreasResponse { areas }))
}

pub async fn get_area(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Area>, ApiError> {
    let area = state
        .store()
        .get_area(&id)?
        .ok_or_else(|| StoreError::NotFound(format!("area {id}")))?;
    Ok(Json(area))
}
