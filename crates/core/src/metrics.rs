//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Orders (creations, global state changes)
//! - SLA tick (runs, skips, failures, timeouts)
//! - Scheduler (running state)

use once_cell::sync::Lazy;
use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Order Metrics
// =============================================================================

/// Orders created total.
pub static ORDERS_CREATED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("orderflow_orders_created_total", "Total orders created").unwrap()
});

/// Global state changes by resulting state.
pub static GLOBAL_STATE_CHANGES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "orderflow_global_state_changes_total",
            "Order global state changes",
        ),
        &["state"],
    )
    .unwrap()
});

// =============================================================================
// SLA Tick Metrics
// =============================================================================

/// Tick passes completed.
pub static TICKS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new("orderflow_ticks_total", "Total SLA tick passes completed").unwrap()
});

/// Tick firings skipped because a previous pass was still running.
pub static TICKS_SKIPPED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "orderflow_ticks_skipped_total",
        "Tick firings skipped due to an in-flight pass",
    )
    .unwrap()
});

/// Tick passes that failed and rolled back.
pub static TICK_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "orderflow_tick_failures_total",
        "Tick passes that failed and were rolled back",
    )
    .unwrap()
});

/// Assignments forced into the timeout state.
pub static SLA_TIMEOUTS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "orderflow_sla_timeouts_total",
        "Assignments that exceeded the SLA threshold",
    )
    .unwrap()
});

/// Tick pass duration in seconds.
pub static TICK_DURATION: Lazy<Histogram> = Lazy::new(|| {
    Histogram::with_opts(
        HistogramOpts::new("orderflow_tick_duration_seconds", "Duration of tick passes")
            .buckets(vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5]),
    )
    .unwrap()
});

// =============================================================================
// Scheduler Metrics
// =============================================================================

/// Scheduler running state (1 = running, 0 = stopped).
pub static SCHEDULER_RUNNING: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "orderflow_scheduler_running",
        "Whether the SLA scheduler is running (1) or stopped (0)",
    )
    .unwrap()
});

/// All core metrics, for registration into a server-side registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Orders
        Box::new(ORDERS_CREATED_TOTAL.clone()),
        Box::new(GLOBAL_STATE_CHANGES.clone()),
        // Tick
        Box::new(TICKS_TOTAL.clone()),
        Box::new(TICKS_SKIPPED_TOTAL.clone()),
        Box::new(TICK_FAILURES_TOTAL.clone()),
        Box::new(SLA_TIMEOUTS_TOTAL.clone()),
        Box::new(TICK_DURATION.clone()),
        // Scheduler
        Box::new(SCHEDULER_RUNNING.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }
    }
}
