//! Serialized interval scheduler for the SLA tick.
//!
//! At most one tick pass runs at any moment. The timer loop fires on a fixed
//! interval and skips the firing entirely if the previous pass is still
//! holding the tick lock; firings are never queued up. Manual triggers take
//! the same lock, so they serialize behind whatever is in flight instead of
//! overlapping it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::config::SlaConfig;
use crate::metrics;
use crate::tick::{TickOutcome, TickProcessor};

/// Snapshot of the scheduler for status endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulerStatus {
    pub running: bool,
    /// When the next timer firing is due, if the scheduler is running.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_fire: Option<DateTime<Utc>>,
    pub config: SlaConfig,
}

/// Drives periodic tick passes against a [`TickProcessor`].
pub struct SlaScheduler {
    processor: Arc<TickProcessor>,
    running: Arc<AtomicBool>,
    /// Held for the duration of a tick pass. The timer loop try-locks and
    /// skips; manual triggers lock and wait.
    tick_lock: Arc<Mutex<()>>,
    next_fire: Arc<RwLock<Option<DateTime<Utc>>>>,
    shutdown_tx: broadcast::Sender<()>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SlaScheduler {
    pub fn new(processor: Arc<TickProcessor>) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            processor,
            running: Arc::new(AtomicBool::new(false)),
            tick_lock: Arc::new(Mutex::new(())),
            next_fire: Arc::new(RwLock::new(None)),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &SlaConfig {
        self.processor.config()
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start the timer loop. Idempotent: calling start on a running
    /// scheduler logs and returns without spawning a second loop.
    pub async fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("SLA scheduler is already running");
            return;
        }

        let interval = Duration::from_secs(u64::from(self.config().tick_interval_secs));
        info!(interval_secs = self.config().tick_interval_secs, "Starting SLA scheduler");
        metrics::SCHEDULER_RUNNING.set(1);

        // Publish the first due time before the loop task gets a chance to
        // run, so a status read right after start already sees it.
        *self.next_fire.write().await =
            Some(Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default());

        let processor = Arc::clone(&self.processor);
        let running = Arc::clone(&self.running);
        let tick_lock = Arc::clone(&self.tick_lock);
        let next_fire = Arc::clone(&self.next_fire);
        let mut shutdown_rx = self.shutdown_tx.subscribe();

        let handle = tokio::spawn(async move {
            loop {
                *next_fire.write().await = Some(Utc::now() + chrono::Duration::from_std(interval).unwrap_or_default());
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("SLA scheduler received shutdown signal");
                        break;
                    }
                    _ = tokio::time::sleep(interval) => {
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }
                        match tick_lock.try_lock() {
                            Ok(_guard) => {
                                processor.run_tick();
                            }
                            Err(_) => {
                                // Previous pass still in flight. Skip this
                                // firing, never queue it.
                                warn!("Skipping tick firing, previous pass still running");
                                metrics::TICKS_SKIPPED_TOTAL.inc();
                            }
                        }
                    }
                }
            }
            *next_fire.write().await = None;
        });
        *self.task.lock().await = Some(handle);
    }

    /// Stop the timer loop, waiting for any in-flight tick pass to finish.
    /// Idempotent: stopping a stopped scheduler logs and returns.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!("SLA scheduler is not running");
            return;
        }

        info!("Stopping SLA scheduler");
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.task.lock().await.take() {
            let _ = handle.await;
        }
        metrics::SCHEDULER_RUNNING.set(0);
        info!("SLA scheduler stopped");
    }

    /// Run one tick pass now, regardless of whether the timer is running.
    /// Waits for any in-flight pass before running; passes never overlap.
    pub async fn trigger_tick(&self) -> TickOutcome {
        let _guard = self.tick_lock.lock().await;
        self.processor.run_tick()
    }

    pub async fn status(&self) -> SchedulerStatus {
        SchedulerStatus {
            running: self.is_running(),
            next_fire: *self.next_fire.read().await,
            config: self.config().clone(),
        }
    }
}
