//! Health, KPI and metrics endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use orderflow_core::KpiSummary;

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn kpis(State(state): State<Arc<AppState>>) -> Result<Json<KpiSummary>, ApiError> {
    let summary = state.store().kpis()?;
    Ok(Json(summary))
}

/// Prometheus exposition endpoint. Gauges that track current database
/// contents are refreshed on every scrape.
pub async fn metrics(State(state): State<Arc<AppState>>) -> Result<String, ApiError> {
    crate::metrics::collect_order_gauges(state.store().as_ref())?;
    crate::metrics::encode_metrics().map_err(|err| ApiError::internal(err.to_string()))
}
