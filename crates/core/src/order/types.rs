//! Core work order data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Work States
// ============================================================================

/// State of a unit of work.
///
/// The same set of values is used for both the per-area partial state of an
/// assignment and the derived global state of an order. `New` is the one
/// exception: it only ever appears as the global state of an order that has
/// no assignments yet, never as a partial state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WorkState {
    /// Order created, no areas assigned yet. Global-only.
    New,
    /// Assigned to an area, work not started.
    Assigned,
    /// Actively being worked. Accrues elapsed time.
    InProgress,
    /// Paused or waiting on something. Accrues elapsed time.
    Pending,
    /// Work finished successfully. Terminal.
    Completed,
    /// Closed without a solution. Terminal.
    ClosedNoSolution,
    /// The SLA deadline expired while in progress. Terminal.
    TimedOut,
}

impl WorkState {
    /// All states, in lifecycle order. Used for iteration in stats and metrics.
    pub const ALL: [WorkState; 7] = [
        WorkState::New,
        WorkState::Assigned,
        WorkState::InProgress,
        WorkState::Pending,
        WorkState::Completed,
        WorkState::ClosedNoSolution,
        WorkState::TimedOut,
    ];

    /// Storage/API identifier for this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkState::New => "new",
            WorkState::Assigned => "assigned",
            WorkState::InProgress => "in_progress",
            WorkState::Pending => "pending",
            WorkState::Completed => "completed",
            WorkState::ClosedNoSolution => "closed_no_solution",
            WorkState::TimedOut => "timed_out",
        }
    }

    /// Parse a storage identifier back into a state.
    pub fn parse(s: &str) -> Option<WorkState> {
        match s {
            "new" => Some(WorkState::New),
            "assigned" => Some(WorkState::Assigned),
            "in_progress" => Some(WorkState::InProgress),
            "pending" => Some(WorkState::Pending),
            "completed" => Some(WorkState::Completed),
            "closed_no_solution" => Some(WorkState::ClosedNoSolution),
            "timed_out" => Some(WorkState::TimedOut),
            _ => None,
        }
    }

    /// Whether this state ends the lifecycle of an assignment.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            WorkState::Completed | WorkState::ClosedNoSolution | WorkState::TimedOut
        )
    }

    /// Whether elapsed time keeps accruing in this state.
    ///
    /// Only `InProgress` and `Pending` accrue; everything else freezes the
    /// elapsed counter at its last value.
    pub fn is_accruing(&self) -> bool {
        matches!(self, WorkState::InProgress | WorkState::Pending)
    }

    /// Whether this state is valid as the partial state of an assignment.
    pub fn is_assignable(&self) -> bool {
        !matches!(self, WorkState::New)
    }
}

// ============================================================================
// Priority
// ============================================================================

/// Order priority. Informational only, routing does not reorder by it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Priority> {
        match s {
            "low" => Some(Priority::Low),
            "medium" => Some(Priority::Medium),
            "high" => Some(Priority::High),
            "critical" => Some(Priority::Critical),
            _ => None,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

// ============================================================================
// Entities
// ============================================================================

/// A functional area that work can be routed to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Area {
    /// Unique area ID (UUID).
    pub id: String,
    /// Human-readable name, unique across areas.
    pub name: String,
    /// Person or team responsible for the area.
    pub owner: String,
    /// Optional contact address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    /// Inactive areas are hidden from listings but keep their assignments.
    pub active: bool,
    /// When the area was registered.
    pub created_at: DateTime<Utc>,
}

/// A work order routed across one or more areas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Order {
    /// Unique order ID (UUID).
    pub id: String,
    /// Short title.
    pub title: String,
    /// Free-form description of the work.
    pub description: String,
    /// User who created the order.
    pub created_by: String,
    /// Priority label.
    pub priority: Priority,
    /// Derived global state. Never written directly, always recomputed from
    /// the partial states of the order's assignments.
    pub global_state: WorkState,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Compact order row for listings, with per-order assignment aggregates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSummary {
    pub id: String,
    pub title: String,
    pub created_by: String,
    pub priority: Priority,
    pub global_state: WorkState,
    /// Number of areas assigned to this order.
    pub num_areas: i64,
    /// How many of those assignments are completed.
    pub areas_completed: i64,
    /// Sum of elapsed seconds across all assignments.
    pub total_secs: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One area's slice of an order.
///
/// Tracks the partial state, the accrued SLA seconds and the lifecycle
/// timestamps for that area's work on the order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Assignment {
    /// Row ID.
    pub id: i64,
    pub order_id: String,
    pub area_id: String,
    /// Denormalized area name, joined in for display and history details.
    pub area_name: String,
    /// Optional person working the assignment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Current partial state. Never `New`.
    pub partial_state: WorkState,
    /// Seconds accrued while the assignment sat in an accruing state.
    /// Only the periodic tick advances this counter.
    pub elapsed_secs: i64,
    /// When the area was assigned.
    pub assigned_at: DateTime<Utc>,
    /// First transition into `InProgress`. Set once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Most recent transition into `Pending`. Overwritten on every pause.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_at: Option<DateTime<Utc>>,
    /// Transition into `Completed` or `ClosedNoSolution`. Set once; an SLA
    /// timeout does not stamp it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Free-form notes from the last state change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Assignment {
    /// Fraction of the SLA threshold this assignment has consumed.
    pub fn sla_ratio(&self, sla_threshold_secs: u32) -> f64 {
        if sla_threshold_secs == 0 {
            return 0.0;
        }
        self.elapsed_secs as f64 / sla_threshold_secs as f64
    }
}
