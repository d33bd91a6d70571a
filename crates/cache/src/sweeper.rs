use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::info;

use crate::cache::Cache;

/// Handle to the background TTL sweeper. Dropping this without calling
/// [`SweeperHandle::stop`] leaves the sweeper running detached; callers
/// that care about graceful shutdown should always call `stop`.
pub struct SweeperHandle {
    stop_tx: oneshot::Sender<()>,
    join: JoinHandle<()>,
}

impl SweeperHandle {
    /// Signals the sweeper to exit and waits for its current iteration to
    /// finish. The interval sleep is the only point at which the sweeper
    /// may be interrupted.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(());
        let _ = self.join.await;
    }
}

/// Spawns the periodic sweeper that evicts TTL-expired entries every
/// `cache.config().cleanup_interval`.
pub fn spawn_sweeper(cache: Arc<Cache>) -> SweeperHandle {
    let (stop_tx, mut stop_rx) = oneshot::channel();
    let interval_duration = cache.config().cleanup_interval;

    let join = tokio::spawn(async move {
        let mut interval = tokio::time::interval(interval_duration);
        interval.tick().await; // first tick fires immediately; skip it
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    cache.sweep_expired();
                }
                _ = &mut stop_rx => {
                    info!("cache sweeper shutting down");
                    break;
                }
            }
        }
    });

    SweeperHandle { stop_tx, join }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use std::time::Duration;
    use tts_accelerator_balancer::{BalancerConfig, LoadBalancer};

    #[tokio::test]
    async fn sweeper_evicts_after_ttl_elapses() {
        let balancer = Arc::new(
            LoadBalancer::new(vec!["http://127.0.0.1:1".to_string()], BalancerConfig::default())
                .unwrap(),
        );
        let config = CacheConfig {
            max_size: 1000,
            ttl: Duration::from_millis(50),
            cleanup_interval: Duration::from_millis(20),
        };
        let cache = Cache::new(config, balancer);
        cache.submit("expires soon", "liang");
        assert_eq!(cache.stats().total_entries, 1);

        let handle = spawn_sweeper(Arc::clone(&cache));
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.stop().await;

        assert_eq!(cache.stats().total_entries, 0);
    }
}
