use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use reqwest::Client;
use tts_accelerator_balancer::{BalancerConfig, LoadBalancer};
use tts_accelerator_cache::{Cache, CacheConfig};
use tts_accelerator_config::Settings;
use tts_accelerator_core::Error;
use tts_accelerator_orchestrator::Orchestrator;
use tts_accelerator_splitter::SplitterConfig;

/// Shared application state, cheaply cloneable (every field is an `Arc` or
/// a plain value). Settings are held behind a read-write lock to permit a
/// future hot-reload without restarting the process, following this
/// codebase's convention for shared configuration even where reload is
/// not yet wired to an external trigger.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<RwLock<Settings>>,
    pub cache: Arc<Cache>,
    pub balancer: Arc<LoadBalancer>,
    pub orchestrator: Arc<Orchestrator>,
    /// Client used for the single outbound call per request to the
    /// upstream chat-completion provider. Reused across requests, safe
    /// for concurrent use.
    pub upstream_client: Client,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, Error> {
        let balancer_config = BalancerConfig {
            max_concurrent_per_endpoint: settings.tts_max_concurrent_per_endpoint,
            request_timeout: settings.tts_request_timeout(),
            retry_count: settings.tts_retry_count,
            health_check_interval: settings.health_check_interval(),
            health_check_timeout: settings.health_check_timeout(),
        };
        let balancer = Arc::new(LoadBalancer::new(
            settings.tts_endpoint_list(),
            balancer_config,
        )?);

        let cache_config = CacheConfig {
            max_size: settings.cache_max_size,
            ttl: settings.cache_ttl(),
            cleanup_interval: settings.cache_cleanup_interval(),
        };
        let cache = Cache::new(cache_config, Arc::clone(&balancer));

        let splitter_config = SplitterConfig {
            min_len: settings.splitter_min_len,
            max_len: settings.splitter_max_len,
        };
        let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&cache), splitter_config));

        let upstream_client = Client::builder()
            .timeout(settings.newapi_timeout())
            .build()
            .map_err(|e| Error::Config(format!("failed to build upstream HTTP client: {e}")))?;

        Ok(Self {
            settings: Arc::new(RwLock::new(settings)),
            cache,
            balancer,
            orchestrator,
            upstream_client,
        })
    }

    pub fn default_tts_model(&self) -> String {
        self.settings.read().tts_default_model.clone()
    }

    pub fn newapi_base_url(&self) -> String {
        self.settings.read().newapi_base_url.clone()
    }

    pub fn newapi_api_key(&self) -> String {
        self.settings.read().newapi_api_key.clone()
    }

    pub fn get_timeout(&self) -> Duration {
        self.settings.read().tts_request_timeout()
    }

    pub fn health_check_interval(&self) -> Option<Duration> {
        self.settings.read().health_check_interval()
    }

    pub fn splitter_config(&self) -> SplitterConfig {
        let settings = self.settings.read();
        SplitterConfig {
            min_len: settings.splitter_min_len,
            max_len: settings.splitter_max_len,
        }
    }
}
