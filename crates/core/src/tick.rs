//! SLA tick processing.
//!
//! A tick is one pass over every active assignment: advance elapsed
//! counters, apply timeouts, recompute the global state of affected orders.
//! The store runs the whole pass in a single transaction; this module wraps
//! it so a failed pass surfaces as a reported outcome instead of an error
//! bubbling into the scheduler loop.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::metrics;
use crate::order::{OrderStore, TickStats};
use crate::scheduler::SlaConfig;

/// Result of one tick pass.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickOutcome {
    /// When the pass ran.
    pub timestamp: DateTime<Utc>,
    /// Assignments whose elapsed counter was advanced.
    pub areas_updated: u64,
    /// Assignments forced into the timeout state.
    pub timeouts_applied: u64,
    /// Orders whose global state was recomputed.
    pub orders_recalculated: Vec<String>,
    /// Failures encountered. Non-empty means the pass rolled back and
    /// changed nothing.
    pub errors: Vec<String>,
}

impl TickOutcome {
    pub fn succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Runs tick passes against an order store.
pub struct TickProcessor {
    store: Arc<dyn OrderStore>,
    config: SlaConfig,
}

impl TickProcessor {
    pub fn new(store: Arc<dyn OrderStore>, config: SlaConfig) -> Self {
        Self { store, config }
    }

    pub fn config(&self) -> &SlaConfig {
        &self.config
    }

    /// Run one tick pass. Failures are folded into the outcome, never
    /// raised: the scheduler keeps firing regardless of individual passes
    /// going wrong.
    pub fn run_tick(&self) -> TickOutcome {
        let started = Instant::now();
        let timestamp = Utc::now();
        match self.store.run_tick(&self.config) {
            Ok(TickStats {
                areas_updated,
                timeouts_applied,
                orders_recalculated,
            }) => {
                metrics::TICKS_TOTAL.inc();
                metrics::TICK_DURATION.observe(started.elapsed().as_secs_f64());
                debug!(
                    areas_updated,
                    timeouts_applied,
                    orders = orders_recalculated.len(),
                    "tick pass completed"
                );
                TickOutcome {
                    timestamp,
                    areas_updated,
                    timeouts_applied,
                    orders_recalculated,
                    errors: Vec::new(),
                }
            }
            Err(err) => {
                metrics::TICK_FAILURES_TOTAL.inc();
                error!(error = %err, "tick pass failed, rolled back");
                TickOutcome {
                    timestamp,
                    areas_updated: 0,
                    timeouts_applied: 0,
                    orders_recalculated: Vec::new(),
                    errors: vec![err.to_string()],
                }
            }
        }
    }
}
