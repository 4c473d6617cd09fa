//! Router assembly.

use std::sync::Arc;

use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::{areas, handlers, orders, timer};
use crate::state::AppState;

/// Build the full application router.
///
/// All domain routes live under `/api/v1`; the Prometheus endpoint is
/// exposed at the root.
pub fn create_router(state: Arc<AppState>) -> Router {
    let api_routes = Router::new()
        .route("/health", get(handlers::health))
        .route("/kpis", get(handlers::kpis))
        .route("/areas", post(areas::create_area))
        .route("/areas", get(areas::list_areas))
        .route("/areas/{id}", get(areas::get_area))
        .route("/orders", post(orders::create_order))
        .route("/orders", get(orders::list_orders))
        .route("/orders/{id}", get(orders::get_order))
        .route("/orders/{id}", delete(orders::delete_order))
        .route("/orders/{id}/areas", post(orders::assign_areas))
        .route("/orders/{id}/areas/{area_id}", delete(orders::remove_area))
        .route(
            "/orders/{id}/areas/{area_id}/state",
            put(orders::set_partial_state),
        )
        .route("/orders/{id}/recalculate", post(orders::recalculate))
        .route("/orders/{id}/history", get(orders::order_history))
        .route("/timer/status", get(timer::status))
        .route("/timer/tick", post(timer::tick))
        .route("/timer/start", post(timer::start))
        .route("/timer/stop", post(timer::stop))
        .route("/timer/restart", post(timer::restart))
        .route("/timer/sla-stats", get(timer::sla_stats));

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/metrics", get(handlers::metrics))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
