use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::balancer::LoadBalancer;

/// Handle to the background health-check loop. Dropping this without
/// calling [`HealthCheckHandle::stop`] leaves the loop running detached;
/// callers that care about graceful shutdown should always call `stop`.
pub struct HealthCheckHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl HealthCheckHandle {
    /// Signals the loop to exit and waits for its current iteration to
    /// finish. The interval sleep is the only point at which it may be
    /// interrupted.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.join.await;
    }
}

/// Spawns the periodic health-check loop that actively re-probes every
/// endpoint's `/health` route on `interval`, independent of organic
/// traffic-driven demotion/reset.
pub fn spawn_health_checker(balancer: Arc<LoadBalancer>, interval: Duration) -> HealthCheckHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel();

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    balancer.health_check_once().await;
                }
                _ = &mut stop_rx => {
                    info!("health-check loop shutting down");
                    break;
                }
            }
        }
    });

    HealthCheckHandle { stop_tx, join }
}
