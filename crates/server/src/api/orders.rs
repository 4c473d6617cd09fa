//! Order endpoints: CRUD, area routing, state changes and history.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use orderflow_core::{
    AssignAreasRequest, Assignment, CreateOrderRequest, HistoryRecord, Order, OrderFilter,
    OrderSummary, PartialStateChange, StoreError, WorkState,
};

use super::{resolve_actor, ApiError, MessageResponse};
use crate::state::AppState;

const DEFAULT_LIMIT: i64 = 100;
const MAX_LIMIT: i64 = 1000;

#[derive(Debug, Deserialize)]
pub struct ListOrdersParams {
    pub state: Option<String>,
    pub created_by: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct ListOrdersResponse {
    pub orders: Vec<OrderSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct OrderDetailResponse {
    #[serde(flatten)]
    pub order: Order,
    pub assignments: Vec<Assignment>,
}

#[derive(Debug, Deserialize)]
pub struct AssignAreasBody {
    pub area_ids: Vec<String>,
    #[serde(default)]
    pub assignee: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStateBody {
    pub state: WorkState,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ActorParams {
    #[serde(default)]
    pub actor: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RecalculateResponse {
    pub order_id: String,
    pub global_state: WorkState,
}

#[derive(Debug, Serialize)]
pub struct OrderHistoryResponse {
    pub order_id: String,
    pub history: Vec<HistoryRecord>,
}

pub async fn create_order(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Order>), ApiError> {
    let order = state.store().create_order(body)?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_orders(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListOrdersParams>,
) -> Result<Json<ListOrdersResponse>, ApiError> {
    let mut filter = OrderFilter::new();
    if let Some(raw) = &params.state {
        let parsed = WorkState::parse(raw)
            .ok_or_else(|| ApiError::bad_request(format!("unknown state: {raw}")))?;
        filter = filter.with_state(parsed);
    }
    if let Some(created_by) = &params.created_by {
        filter = filter.with_created_by(created_by.clone());
    }
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);
    filter = filter.with_limit(limit).with_offset(offset);

    let orders = state.store().list_orders(&filter)?;
    let total = state.store().count_orders(&filter)?;
    Ok(Json(ListOrdersResponse {
        orders,
        total,
        limit,
        offset,
    }))
}

pub async fn get_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let order = state
        .store()
        .get_order(&id)?
        .ok_or_else(|| StoreError::NotFound(format!("order {id}")))?;
    let assignments = state.store().assignments(&id)?;
    Ok(Json(OrderDetailResponse { order, assignments }))
}

pub async fn delete_order(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store().delete_order(&id)?;
    Ok(Json(MessageResponse {
        message: format!("order {id} deleted"),
    }))
}

pub async fn assign_areas(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<AssignAreasBody>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let request = AssignAreasRequest {
        area_ids: body.area_ids,
        assignee: body.assignee,
        actor: resolve_actor(body.actor),
    };
    let order = state.store().assign_areas(&id, request)?;
    let assignments = state.store().assignments(&id)?;
    Ok(Json(OrderDetailResponse { order, assignments }))
}

pub async fn remove_area(
    State(state): State<Arc<AppState>>,
    Path((id, area_id)): Path<(String, String)>,
    Query(params): Query<ActorParams>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let actor = resolve_actor(params.actor);
    let order = state.store().remove_area(&id, &area_id, &actor)?;
    let assignments = state.store().assignments(&id)?;
    Ok(Json(OrderDetailResponse { order, assignments }))
}

pub async fn set_partial_state(
    State(state): State<Arc<AppState>>,
    Path((id, area_id)): Path<(String, String)>,
    Json(body): Json<SetStateBody>,
) -> Result<Json<Assignment>, ApiError> {
    let change = PartialStateChange {
        new_state: body.state,
        notes: body.notes,
        actor: resolve_actor(body.actor),
    };
    let assignment = state.store().set_partial_state(&id, &area_id, change)?;
    Ok(Json(assignment))
}

pub async fn recalculate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RecalculateResponse>, ApiError> {
    let global_state = state.store().recalculate_global_state(&id)?;
    Ok(Json(RecalculateResponse {
        order_id: id,
        global_state,
    }))
}

pub async fn order_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<OrderHistoryResponse>, ApiError> {
    let history = state.store().order_history(&id)?;
    Ok(Json(OrderHistoryResponse {
        order_id: id,
        history,
    }))
}
