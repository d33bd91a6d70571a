use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Serialize;
use tracing::{debug, instrument, warn};
use tts_accelerator_core::{BalancerStats, Error, Result};

use crate::config::BalancerConfig;
use crate::endpoint::Endpoint;

/// Payload sent to `<endpoint>/v1/audio/speech`. Only `model` and `input`
/// are honored by the TTS engine; `voice` and `response_format` are fixed.
#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Base delay for the exponential backoff between retries: `0.5s * 2^attempt`.
const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// Dispatches synthesis requests across a pool of TTS endpoints.
///
/// Selection picks the least-loaded, lowest-latency available endpoint;
/// a per-endpoint semaphore bounds concurrency; failed requests retry with
/// backoff against a re-selected endpoint. The balancer owns no task of its
/// own — every suspension point happens inside `request`, on the caller's
/// task.
pub struct LoadBalancer {
    endpoints: Vec<Arc<Endpoint>>,
    client: Client,
    config: BalancerConfig,
    total_requests: AtomicU64,
    successful_requests: AtomicU64,
    failed_requests: AtomicU64,
}

impl LoadBalancer {
    pub fn new(urls: impl IntoIterator<Item = String>, config: BalancerConfig) -> Result<Self> {
        let endpoints: Vec<Arc<Endpoint>> = urls
            .into_iter()
            .map(|url| Endpoint::new(url, config.max_concurrent_per_endpoint))
            .collect();
        if endpoints.is_empty() {
            return Err(Error::Config("tts_endpoints must not be empty".into()));
        }
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            endpoints,
            client,
            config,
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
        })
    }

    /// Synthesizes `text` against `model`, returning the raw `audio/wav`
    /// body on success. Retries up to `config.retry_count` additional times
    /// with exponential backoff, re-selecting an endpoint on each attempt.
    #[instrument(skip(self, text), fields(model, attempt))]
    pub async fn request(&self, text: &str, model: &str) -> Result<Vec<u8>> {
        self.total_requests.fetch_add(1, Ordering::Relaxed);

        let mut last_err = Error::NoAvailableEndpoints;
        for attempt in 0..=self.config.retry_count {
            if attempt > 0 {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                tokio::time::sleep(delay).await;
            }

            let endpoint = match self.select() {
                Some(endpoint) => endpoint,
                None => {
                    self.failed_requests.fetch_add(1, Ordering::Relaxed);
                    return Err(Error::NoAvailableEndpoints);
                }
            };

            match self.try_once(&endpoint, text, model).await {
                Ok(audio) => {
                    self.successful_requests.fetch_add(1, Ordering::Relaxed);
                    debug!(endpoint = %endpoint.url, attempt, "synthesis succeeded");
                    return Ok(audio);
                }
                Err(e) => {
                    warn!(endpoint = %endpoint.url, attempt, error = %e, "synthesis attempt failed");
                    endpoint.record_failure();
                    last_err = e;
                }
            }
        }

        self.failed_requests.fetch_add(1, Ordering::Relaxed);
        Err(last_err)
    }

    async fn try_once(&self, endpoint: &Endpoint, text: &str, model: &str) -> Result<Vec<u8>> {
        let _guard = endpoint.acquire().await;
        let started = Instant::now();

        let body = SpeechRequest {
            model,
            input: text,
            voice: "alloy",
            response_format: "wav",
        };

        let response = self
            .client
            .post(format!("{}/v1/audio/speech", endpoint.url))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::GenerationFailed(format!("transport error: {e}")))?;

        if !response.status().is_success() {
            return Err(Error::GenerationFailed(format!(
                "upstream returned {}",
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::GenerationFailed(format!("failed to read body: {e}")))?;
        if bytes.is_empty() {
            return Err(Error::GenerationFailed("empty audio body".into()));
        }

        endpoint.record_success(started.elapsed());
        Ok(bytes.to_vec())
    }

    /// Selects the available endpoint minimizing (in-flight count, average
    /// response time). If every endpoint is unavailable, performs a global
    /// reset — marking all available again — and selects among them once
    /// more, giving a fully-demoted pool a chance to recover.
    fn select(&self) -> Option<Arc<Endpoint>> {
        if let Some(endpoint) = self.pick_available() {
            return Some(endpoint);
        }
        for endpoint in &self.endpoints {
            endpoint.reset();
        }
        self.pick_available()
    }

    fn pick_available(&self) -> Option<Arc<Endpoint>> {
        self.endpoints
            .iter()
            .filter(|e| e.is_available())
            .min_by(|a, b| {
                a.current_load()
                    .cmp(&b.current_load())
                    .then(a.avg_response_time().total_cmp(&b.avg_response_time()))
            })
            .cloned()
    }

    /// Probes every endpoint's `/health` route with `config.health_check_timeout`
    /// and sets its availability directly from the result, resetting the
    /// consecutive-error count on success. Independent of organic
    /// traffic-driven demotion/reset.
    pub async fn health_check_once(&self) {
        for endpoint in &self.endpoints {
            let url = format!("{}/health", endpoint.url);
            let healthy = match self
                .client
                .get(&url)
                .timeout(self.config.health_check_timeout)
                .send()
                .await
            {
                Ok(response) => response.status().is_success(),
                Err(e) => {
                    debug!(endpoint = %endpoint.url, error = %e, "health probe failed");
                    false
                }
            };
            endpoint.set_available(healthy);
        }
    }

    pub fn get_stats(&self) -> BalancerStats {
        let total = self.total_requests.load(Ordering::Relaxed);
        let successful = self.successful_requests.load(Ordering::Relaxed);
        let failed = self.failed_requests.load(Ordering::Relaxed);
        BalancerStats {
            total_requests: total,
            successful_requests: successful,
            failed_requests: failed,
            success_rate: if total == 0 {
                0.0
            } else {
                successful as f64 / total as f64
            },
            endpoints: self.endpoints.iter().map(|e| e.snapshot()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> BalancerConfig {
        BalancerConfig {
            max_concurrent_per_endpoint: 3,
            request_timeout: Duration::from_secs(5),
            retry_count: 2,
            health_check_interval: None,
            health_check_timeout: Duration::from_secs(1),
        }
    }

    #[test]
    fn construction_rejects_empty_endpoint_list() {
        let result = LoadBalancer::new(Vec::<String>::new(), config());
        assert!(result.is_err());
    }

    #[test]
    fn select_prefers_least_loaded_available_endpoint() {
        let balancer = LoadBalancer::new(
            vec!["http://a".to_string(), "http://b".to_string()],
            config(),
        )
        .unwrap();
        balancer.endpoints[0].record_failure();
        balancer.endpoints[0].record_failure();
        balancer.endpoints[0].record_failure();
        assert!(!balancer.endpoints[0].is_available());

        let picked = balancer.select().unwrap();
        assert_eq!(picked.url, "http://b");
    }

    #[test]
    fn global_reset_recovers_when_all_endpoints_demoted() {
        let balancer =
            LoadBalancer::new(vec!["http://a".to_string()], config()).unwrap();
        for _ in 0..3 {
            balancer.endpoints[0].record_failure();
        }
        assert!(!balancer.endpoints[0].is_available());

        let picked = balancer.select();
        assert!(picked.is_some());
        assert!(balancer.endpoints[0].is_available());
    }

    #[test]
    fn stats_start_at_zero() {
        let balancer =
            LoadBalancer::new(vec!["http://a".to_string()], config()).unwrap();
        let stats = balancer.get_stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.endpoints.len(), 1);
    }
}
