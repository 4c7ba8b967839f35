//! Periodic trigger for sync cycles

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use super::engine::SyncEngine;

pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    initial_delay: Duration,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(engine: Arc<SyncEngine>, initial_delay: Duration, interval: Duration) -> Self {
        Self {
            engine,
            initial_delay,
            interval,
        }
    }

    /// Start the background sync loop (runs until `shutdown` flips or its sender is dropped)
    ///
    /// The first cycle runs after `initial_delay`, later ones every `interval`
    /// counted from the start. A tick that finds the previous cycle still
    /// running is skipped. On shutdown the running cycle is awaited, not cancelled.
    pub async fn start(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "[SyncScheduler] Starting background sync (first run in {}ms, interval: {}ms)",
            self.initial_delay.as_millis(),
            self.interval.as_millis()
        );

        let stopped = *shutdown.borrow();
        if stopped {
            return;
        }

        let start = Instant::now();
        let mut ticker = time::interval_at(start + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tokio::select! {
            _ = time::sleep_until(start + self.initial_delay) => {}
            _ = shutdown.changed() => {
                tracing::info!("[SyncScheduler] Stopped before first run");
                return;
            }
        }

        let mut running = self.spawn_cycle();

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !running.is_finished() {
                        tracing::debug!("[SyncScheduler] Previous cycle still running, tick skipped");
                        continue;
                    }
                    running = self.spawn_cycle();
                }
                _ = shutdown.changed() => break,
            }
        }

        if !running.is_finished() {
            tracing::info!("[SyncScheduler] Waiting for the running cycle to finish");
        }
        if let Err(e) = running.await {
            tracing::error!("[SyncScheduler] Cycle task failed: {}", e);
        }

        tracing::info!("[SyncScheduler] Stopped");
    }

    fn spawn_cycle(&self) -> JoinHandle<()> {
        let engine = self.engine.clone();
        tokio::spawn(async move {
            match engine.run_cycle().await {
                Ok(report) => tracing::debug!(
                    "[SyncScheduler] Cycle finished ({} devices)",
                    report.devices
                ),
                Err(e) => tracing::warn!("[SyncScheduler] Cycle skipped: {}", e),
            }
        })
    }
}
