//! SLA tick scheduling.
//!
//! The scheduler fires the tick on a fixed interval and guarantees passes
//! never overlap: a firing that lands while a pass is still running is
//! skipped, not queued.

mod config;
mod runner;

pub use config::SlaConfig;
pub use runner::{SchedulerStatus, SlaScheduler};
