use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tts_accelerator_core::EndpointStats;

/// Consecutive failures after which an endpoint is demoted.
const FAILURE_THRESHOLD: u32 = 3;

/// One upstream TTS server. All mutable fields are plain atomics so the
/// load balancer can update them without a lock; the per-endpoint
/// concurrency cap is a counting semaphore acquired around each request.
pub struct Endpoint {
    /// Normalized URL (no trailing slash).
    pub url: String,
    is_available: AtomicBool,
    current_load: AtomicU32,
    error_count: AtomicU32,
    total_requests: AtomicU64,
    total_response_time_micros: AtomicU64,
    semaphore: Semaphore,
}

/// Held across an in-flight request. Decrements the endpoint's in-flight
/// count on drop, regardless of how the request completed.
pub struct InFlightGuard<'a> {
    endpoint: &'a Endpoint,
    _permit: tokio::sync::SemaphorePermit<'a>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.endpoint.current_load.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Endpoint {
    pub fn new(url: impl Into<String>, max_concurrent: usize) -> Arc<Self> {
        let url = url.into();
        let url = url.trim_end_matches('/').to_string();
        Arc::new(Self {
            url,
            is_available: AtomicBool::new(true),
            current_load: AtomicU32::new(0),
            error_count: AtomicU32::new(0),
            total_requests: AtomicU64::new(0),
            total_response_time_micros: AtomicU64::new(0),
            semaphore: Semaphore::new(max_concurrent),
        })
    }

    pub fn is_available(&self) -> bool {
        self.is_available.load(Ordering::Acquire)
    }

    pub fn current_load(&self) -> u32 {
        self.current_load.load(Ordering::Acquire)
    }

    pub fn error_count(&self) -> u32 {
        self.error_count.load(Ordering::Acquire)
    }

    pub fn avg_response_time(&self) -> f64 {
        let total = self.total_requests.load(Ordering::Acquire);
        if total == 0 {
            return 0.0;
        }
        let micros = self.total_response_time_micros.load(Ordering::Acquire);
        (micros as f64 / 1_000_000.0) / total as f64
    }

    pub fn total_requests(&self) -> u64 {
        self.total_requests.load(Ordering::Acquire)
    }

    /// Acquires the per-endpoint concurrency permit, blocking if every
    /// permit is held, and marks the endpoint as having one more in-flight
    /// request. The returned guard releases both on drop.
    pub async fn acquire(&self) -> InFlightGuard<'_> {
        let permit = self
            .semaphore
            .acquire()
            .await
            .expect("endpoint semaphore is never closed");
        self.current_load.fetch_add(1, Ordering::AcqRel);
        InFlightGuard {
            endpoint: self,
            _permit: permit,
        }
    }

    pub fn record_success(&self, elapsed: Duration) {
        self.total_requests.fetch_add(1, Ordering::AcqRel);
        self.total_response_time_micros
            .fetch_add(elapsed.as_micros() as u64, Ordering::AcqRel);
        self.error_count.store(0, Ordering::Release);
        self.is_available.store(true, Ordering::Release);
    }

    pub fn record_failure(&self) {
        let errors = self.error_count.fetch_add(1, Ordering::AcqRel) + 1;
        if errors >= FAILURE_THRESHOLD {
            self.is_available.store(false, Ordering::Release);
        }
    }

    pub fn set_available(&self, available: bool) {
        self.is_available.store(available, Ordering::Release);
        if available {
            self.error_count.store(0, Ordering::Release);
        }
    }

    pub fn reset(&self) {
        self.is_available.store(true, Ordering::Release);
        self.error_count.store(0, Ordering::Release);
    }

    pub fn snapshot(&self) -> EndpointStats {
        EndpointStats {
            url: self.url.clone(),
            is_available: self.is_available(),
            current_load: self.current_load(),
            error_count: self.error_count(),
            avg_response_time: self.avg_response_time(),
            total_requests: self.total_requests(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_trailing_slash() {
        let ep = Endpoint::new("http://host:8080/", 3);
        assert_eq!(ep.url, "http://host:8080");
    }

    #[test]
    fn three_consecutive_failures_demote() {
        let ep = Endpoint::new("http://host", 3);
        ep.record_failure();
        ep.record_failure();
        assert!(ep.is_available());
        ep.record_failure();
        assert!(!ep.is_available());
    }

    #[test]
    fn success_resets_error_count_and_availability() {
        let ep = Endpoint::new("http://host", 3);
        ep.record_failure();
        ep.record_failure();
        ep.record_failure();
        assert!(!ep.is_available());
        ep.record_success(Duration::from_millis(10));
        assert!(ep.is_available());
        assert_eq!(ep.error_count(), 0);
    }

    #[tokio::test]
    async fn acquire_increments_and_drop_decrements_load() {
        let ep = Endpoint::new("http://host", 3);
        assert_eq!(ep.current_load(), 0);
        let guard = ep.acquire().await;
        assert_eq!(ep.current_load(), 1);
        drop(guard);
        assert_eq!(ep.current_load(), 0);
    }
}
