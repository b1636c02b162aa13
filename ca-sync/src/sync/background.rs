//! Background timers: remote divergence polling and the lesson update check

use super::orchestrator::SyncOrchestrator;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

impl SyncOrchestrator {
    /// Start the poll and update-check loops; both stop on [`SyncOrchestrator::shutdown`]
    pub fn spawn_background_tasks(self: &Arc<Self>) -> Vec<JoinHandle<()>> {
        vec![
            self.spawn_periodic("remote poll", self.config.poll_interval(), |this| async move {
                if let Err(e) = this.poll_for_divergence().await {
                    warn!(error = %e, "Remote poll failed");
                }
            }),
            self.spawn_periodic(
                "update check",
                self.config.update_check_interval(),
                |this| async move {
                    if let Err(e) = this.check_for_updates().await {
                        debug!(error = %e, "Lesson update check failed");
                    }
                },
            ),
        ]
    }

    fn spawn_periodic<F, Fut>(self: &Arc<Self>, name: &'static str, period: Duration, tick: F) -> JoinHandle<()>
    where
        F: Fn(Arc<Self>) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            // First tick after one full period; the initial load just ran
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            debug!(task = name, ?period, "Background task started");

            loop {
                tokio::select! {
                    _ = this.shutdown.cancelled() => break,
                    _ = ticker.tick() => tick(Arc::clone(&this)).await,
                }
            }

            debug!(task = name, "Background task stopped");
        })
    }
}
