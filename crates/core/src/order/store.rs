//! Order storage trait and request/result types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::history::{Actor, HistoryRecord};
use crate::order::{Area, Assignment, Order, OrderSummary, Priority, WorkState};
use crate::scheduler::SlaConfig;

/// Error type for order storage operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The referenced order, area or assignment does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// The requested state change is not allowed.
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// A uniqueness constraint was violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The underlying database failed.
    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

/// Request to create a new order.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrderRequest {
    pub title: String,
    pub description: String,
    pub created_by: String,
    #[serde(default)]
    pub priority: Priority,
}

/// Request to create a new area.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAreaRequest {
    pub name: String,
    pub owner: String,
    #[serde(default)]
    pub contact: Option<String>,
}

/// Request to assign one or more areas to an order.
#[derive(Debug, Clone)]
pub struct AssignAreasRequest {
    /// Areas to assign. All must exist; the whole request fails atomically
    /// if any is missing or already assigned.
    pub area_ids: Vec<String>,
    /// Optional person to put on every new assignment.
    pub assignee: Option<String>,
    pub actor: Actor,
}

/// Request to change the partial state of one assignment.
#[derive(Debug, Clone)]
pub struct PartialStateChange {
    pub new_state: WorkState,
    pub notes: Option<String>,
    pub actor: Actor,
}

/// Filter for querying orders.
#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    /// Filter by global state.
    pub state: Option<WorkState>,
    /// Filter by creator.
    pub created_by: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl OrderFilter {
    pub fn new() -> Self {
        Self {
            state: None,
            created_by: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_state(mut self, state: WorkState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn with_created_by(mut self, created_by: impl Into<String>) -> Self {
        self.created_by = Some(created_by.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// What a single tick pass changed, as reported by the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TickStats {
    /// Assignments whose elapsed counter was advanced.
    pub areas_updated: u64,
    /// Assignments forced into the timeout state.
    pub timeouts_applied: u64,
    /// Orders whose global state was recomputed, changed or not.
    pub orders_recalculated: Vec<String>,
}

/// Point-in-time view of SLA health across active assignments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlaStats {
    /// Threshold the figures below are measured against.
    pub sla_threshold_secs: u32,
    /// Assignments currently accruing time.
    pub active_assignments: i64,
    /// In-progress assignments at or past 80% of the threshold but not yet over it.
    pub near_limit: i64,
    /// Assignments sitting in the timeout state.
    pub timed_out: i64,
    /// Mean elapsed seconds across active assignments.
    pub avg_elapsed_secs: f64,
    /// Share of active work still inside the threshold, as a percentage.
    pub compliance_pct: f64,
}

/// Order counts by outcome, for dashboards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct KpiSummary {
    pub total_orders: i64,
    pub completed: i64,
    pub closed_no_solution: i64,
    /// Orders still moving: assigned, in progress or pending.
    pub open: i64,
}

/// Trait for order storage backends.
///
/// Implementations must be transactional: any method that both mutates state
/// and appends history commits the two together or not at all.
pub trait OrderStore: Send + Sync {
    // -- orders --

    /// Create a new order in the `New` global state.
    fn create_order(&self, request: CreateOrderRequest) -> Result<Order, StoreError>;

    /// Get an order by ID.
    fn get_order(&self, id: &str) -> Result<Option<Order>, StoreError>;

    /// List orders matching the filter, newest first.
    fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<OrderSummary>, StoreError>;

    /// Count orders matching the filter.
    fn count_orders(&self, filter: &OrderFilter) -> Result<i64, StoreError>;

    /// Delete an order along with its assignments and history.
    fn delete_order(&self, id: &str) -> Result<(), StoreError>;

    // -- areas --

    /// Register a new area. Names are unique.
    fn create_area(&self, request: CreateAreaRequest) -> Result<Area, StoreError>;

    /// Get an area by ID.
    fn get_area(&self, id: &str) -> Result<Option<Area>, StoreError>;

    /// List areas, optionally filtered by active flag, by name.
    fn list_areas(&self, active: Option<bool>) -> Result<Vec<Area>, StoreError>;

    // -- assignments --

    /// All assignments of an order, in assignment order.
    fn assignments(&self, order_id: &str) -> Result<Vec<Assignment>, StoreError>;

    /// Assign areas to an order and recompute its global state.
    fn assign_areas(&self, order_id: &str, request: AssignAreasRequest)
        -> Result<Order, StoreError>;

    /// Remove an area's assignment from an order and recompute its global
    /// state.
    fn remove_area(&self, order_id: &str, area_id: &str, actor: &Actor)
        -> Result<Order, StoreError>;

    /// Change the partial state of one assignment, stamp its lifecycle
    /// timestamps and recompute the order's global state.
    fn set_partial_state(
        &self,
        order_id: &str,
        area_id: &str,
        change: PartialStateChange,
    ) -> Result<Assignment, StoreError>;

    /// Recompute an order's global state from its assignments and persist it
    /// if it changed. Returns the (possibly unchanged) global state.
    fn recalculate_global_state(&self, order_id: &str) -> Result<WorkState, StoreError>;

    // -- SLA tick --

    /// Run one SLA tick pass in a single transaction: advance elapsed
    /// counters, apply timeouts, recompute the global state of every affected
    /// order. On error nothing is committed.
    fn run_tick(&self, config: &SlaConfig) -> Result<TickStats, StoreError>;

    // -- reporting --

    /// Full history of an order, most recent first.
    fn order_history(&self, order_id: &str) -> Result<Vec<HistoryRecord>, StoreError>;

    /// SLA health snapshot.
    fn sla_stats(&self, config: &SlaConfig) -> Result<SlaStats, StoreError>;

    /// Order counts by outcome.
    fn kpis(&self) -> Result<KpiSummary, StoreError>;
}
