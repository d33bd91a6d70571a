use serde::{Deserialize, Serialize};

/// Snapshot of a single endpoint's health and load, as reported by the
/// balancer's `get_stats` operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointStats {
    pub url: String,
    pub is_available: bool,
    pub current_load: u32,
    pub error_count: u32,
    pub avg_response_time: f64,
    pub total_requests: u64,
}

/// Process-lifetime snapshot of the load balancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BalancerStats {
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub endpoints: Vec<EndpointStats>,
}

/// Snapshot of the cache's contents and hit/miss accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub total_entries: usize,
    pub pending: usize,
    pub generating: usize,
    pub completed: usize,
    pub failed: usize,
    pub hit_count: u64,
    pub miss_count: u64,
    pub hit_rate: f64,
}
