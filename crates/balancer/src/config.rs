use std::time::Duration;

/// Tuning for the load balancer, sourced from the `tts_*` configuration
/// options.
#[derive(Debug, Clone)]
pub struct BalancerConfig {
    pub max_concurrent_per_endpoint: usize,
    pub request_timeout: Duration,
    pub retry_count: u32,
    /// If set, a background task actively re-probes every endpoint's
    /// `/health` route on this interval.
    pub health_check_interval: Option<Duration>,
    /// Per-probe timeout used by the health-check loop.
    pub health_check_timeout: Duration,
}

impl Default for BalancerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_per_endpoint: 3,
            request_timeout: Duration::from_secs(60),
            retry_count: 2,
            health_check_interval: None,
            health_check_timeout: Duration::from_secs(5),
        }
    }
}
