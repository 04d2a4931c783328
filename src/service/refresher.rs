use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use super::ParkingService;

/// Background task that recomputes the cached stats so elapsed-time buckets
/// move forward even when nothing is mutated.
pub struct StatsRefresher {
    shutdown_tx: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl StatsRefresher {
    pub fn spawn(service: Arc<ParkingService>, every: Duration) -> Self {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);

        let handle = tokio::spawn(async move {
            let mut interval = time::interval(every);
            // The first tick completes immediately
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let stats = service.refresh_stats().await;
                        tracing::debug!(
                            "Stats refreshed: {}/{} occupied",
                            stats.occupied_spaces,
                            stats.total_spaces
                        );
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            tracing::info!("Stats refresher stopped");
                            break;
                        }
                    }
                }
            }
        });

        Self { shutdown_tx, handle }
    }

    /// Signal the task to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        if let Err(e) = self.handle.await {
            tracing::error!("Stats refresher task failed: {}", e);
        }
    }
}
