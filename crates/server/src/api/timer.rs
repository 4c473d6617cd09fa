//! SLA timer control endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use orderflow_core::{SchedulerStatus, SlaStats, TickOutcome};

use super::{ApiError, MessageResponse};
use crate::state::AppState;

pub async fn status(State(state): State<Arc<AppState>>) -> Json<SchedulerStatus> {
    Json(state.scheduler().status().await)
}

/// Run one tick pass immediately. Serializes with the periodic timer, so a
/// manual tick never overlaps a scheduled one.
pub async fn tick(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TickOutcome>, (StatusCode, Json<TickOutcome>)> {
    let outcome = state.scheduler().trigger_tick().await;
    if outcome.succeeded() {
        Ok(Json(outcome))
    } else {
        Err((StatusCode::INTERNAL_SERVER_ERROR, Json(outcome)))
    }
}

pub async fn start(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    if state.scheduler().is_running() {
        return Json(MessageResponse {
            message: "timer already running".to_string(),
        });
    }
    state.scheduler().start().await;
    Json(MessageResponse {
        message: "timer started".to_string(),
    })
}

pub async fn stop(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    if !state.scheduler().is_running() {
        return Json(MessageResponse {
            message: "timer not running".to_string(),
        });
    }
    state.scheduler().stop().await;
    Json(MessageResponse {
        message: "timer stopped".to_string(),
    })
}

/// Stop the timer if it is running, then start it again.
pub async fn restart(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    if state.scheduler().is_running() {
        state.scheduler().stop().await;
    }
    state.scheduler().start().await;
    Json(MessageResponse {
        message: "timer restarted".to_string(),
    })
}

pub async fn sla_stats(State(state): State<Arc<AppState>>) -> Result<Json<SlaStats>, ApiError> {
    let stats = state.store().sla_stats(state.scheduler().config())?;
    Ok(Json(stats))
}
