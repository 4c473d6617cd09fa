//! SLA timer configuration.

use serde::{Deserialize, Serialize};

use crate::order::WorkState;

fn default_enabled() -> bool {
    true
}

fn default_tick_interval_secs() -> u32 {
    10
}

fn default_sla_threshold_secs() -> u32 {
    60
}

fn default_timeout_state() -> WorkState {
    WorkState::TimedOut
}

/// Configuration for the SLA tick scheduler.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlaConfig {
    /// Start the timer automatically on server startup.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between tick firings. Also the amount each accruing
    /// assignment's elapsed counter advances per tick.
    #[serde(default = "default_tick_interval_secs")]
    pub tick_interval_secs: u32,

    /// An in-progress assignment whose elapsed counter reaches this many
    /// seconds is forced into `timeout_state` on the next tick.
    #[serde(default = "default_sla_threshold_secs")]
    pub sla_threshold_secs: u32,

    /// State applied to assignments that blow the threshold.
    #[serde(default = "default_timeout_state")]
    pub timeout_state: WorkState,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            tick_interval_secs: default_tick_interval_secs(),
            sla_threshold_secs: default_sla_threshold_secs(),
            timeout_state: default_timeout_state(),
        }
    }
}
