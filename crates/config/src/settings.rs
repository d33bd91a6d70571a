use std::time::Duration;

use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8000
}
fn default_newapi_timeout() -> u64 {
    120
}
fn default_tts_default_model() -> String {
    "liang".to_string()
}
fn default_tts_max_concurrent_per_endpoint() -> usize {
    3
}
fn default_tts_request_timeout() -> u64 {
    60
}
fn default_tts_retry_count() -> u32 {
    2
}
fn default_cache_max_size() -> usize {
    1000
}
fn default_cache_ttl() -> u64 {
    3600
}
fn default_cache_cleanup_interval() -> u64 {
    300
}
fn default_splitter_max_len() -> usize {
    40
}
fn default_splitter_min_len() -> usize {
    5
}
fn default_log_level() -> String {
    "INFO".to_string()
}
fn default_health_check_timeout() -> u64 {
    5
}

/// Process-wide settings, loaded once at startup. Field names mirror the
/// flat environment/file keys of the external configuration surface
/// exactly, so `config`'s layered sources can deserialize directly into
/// this struct with no intermediate remapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Base URL of the upstream chat-completion provider. Required.
    #[serde(default)]
    pub newapi_base_url: String,
    /// Bearer token for the upstream chat-completion provider. Required.
    #[serde(default)]
    pub newapi_api_key: String,
    #[serde(default = "default_newapi_timeout")]
    pub newapi_timeout: u64,

    /// Comma-separated TTS endpoint URLs, as received. Required (non-empty
    /// after parsing). Use [`Settings::tts_endpoints`] to get the parsed list.
    #[serde(default)]
    pub tts_endpoints: String,
    #[serde(default = "default_tts_default_model")]
    pub tts_default_model: String,
    #[serde(default = "default_tts_max_concurrent_per_endpoint")]
    pub tts_max_concurrent_per_endpoint: usize,
    #[serde(default = "default_tts_request_timeout")]
    pub tts_request_timeout: u64,
    #[serde(default = "default_tts_retry_count")]
    pub tts_retry_count: u32,

    #[serde(default = "default_cache_max_size")]
    pub cache_max_size: usize,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
    #[serde(default = "default_cache_cleanup_interval")]
    pub cache_cleanup_interval: u64,

    #[serde(default = "default_splitter_max_len")]
    pub splitter_max_len: usize,
    #[serde(default = "default_splitter_min_len")]
    pub splitter_min_len: usize,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Interval, in seconds, on which the background health-check loop
    /// re-probes every endpoint's `/health` route. Unset disables the loop.
    #[serde(default)]
    pub health_check_interval: Option<u64>,
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            newapi_base_url: String::new(),
            newapi_api_key: String::new(),
            newapi_timeout: default_newapi_timeout(),
            tts_endpoints: String::new(),
            tts_default_model: default_tts_default_model(),
            tts_max_concurrent_per_endpoint: default_tts_max_concurrent_per_endpoint(),
            tts_request_timeout: default_tts_request_timeout(),
            tts_retry_count: default_tts_retry_count(),
            cache_max_size: default_cache_max_size(),
            cache_ttl: default_cache_ttl(),
            cache_cleanup_interval: default_cache_cleanup_interval(),
            splitter_max_len: default_splitter_max_len(),
            splitter_min_len: default_splitter_min_len(),
            log_level: default_log_level(),
            health_check_interval: None,
            health_check_timeout: default_health_check_timeout(),
        }
    }
}

impl Settings {
    /// Parses [`Settings::tts_endpoints`] into a list, trimming whitespace
    /// and dropping empty entries.
    pub fn tts_endpoint_list(&self) -> Vec<String> {
        self.tts_endpoints
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string())
            .collect()
    }

    pub fn newapi_timeout(&self) -> Duration {
        Duration::from_secs(self.newapi_timeout)
    }

    pub fn tts_request_timeout(&self) -> Duration {
        Duration::from_secs(self.tts_request_timeout)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl)
    }

    pub fn cache_cleanup_interval(&self) -> Duration {
        Duration::from_secs(self.cache_cleanup_interval)
    }

    pub fn health_check_interval(&self) -> Option<Duration> {
        self.health_check_interval.map(Duration::from_secs)
    }

    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout)
    }

    /// Cross-field validation. Required fields with no sensible default
    /// (upstream base URL, upstream API key, TTS endpoint list) must be
    /// present; numeric fields must be in sane ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.newapi_base_url.trim().is_empty() {
            return Err(ConfigError::MissingField("newapi_base_url".to_string()));
        }
        if self.newapi_api_key.trim().is_empty() {
            return Err(ConfigError::MissingField("newapi_api_key".to_string()));
        }
        if self.tts_endpoint_list().is_empty() {
            return Err(ConfigError::MissingField("tts_endpoints".to_string()));
        }
        if self.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "port".to_string(),
                message: "must be nonzero".to_string(),
            });
        }
        if self.tts_max_concurrent_per_endpoint == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tts_max_concurrent_per_endpoint".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.tts_request_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "tts_request_timeout".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.newapi_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "newapi_timeout".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.cache_max_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cache_max_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.splitter_min_len == 0 {
            return Err(ConfigError::InvalidValue {
                field: "splitter_min_len".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.splitter_max_len < self.splitter_min_len {
            return Err(ConfigError::InvalidValue {
                field: "splitter_max_len".to_string(),
                message: "must be >= splitter_min_len".to_string(),
            });
        }
        if self.health_check_interval == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "health_check_interval".to_string(),
                message: "must be positive when set".to_string(),
            });
        }
        if self.health_check_timeout == 0 {
            return Err(ConfigError::InvalidValue {
                field: "health_check_timeout".to_string(),
                message: "must be positive".to_string(),
            });
        }
        Ok(())
    }
}

/// Loads settings from layered sources and validates the result.
///
/// Priority (highest to lowest):
/// 1. Environment variables (`TTS_ACCEL_*`)
/// 2. `config/{env}.toml` (if `env` is given)
/// 3. `config/default.toml`
/// 4. Built-in defaults
pub fn load_settings(env: Option<&str>) -> Result<Settings, ConfigError> {
    let mut builder = Config::builder();

    builder = builder.add_source(File::with_name("config/default").required(false));
    if let Some(env_name) = env {
        builder =
            builder.add_source(File::with_name(&format!("config/{env_name}")).required(false));
    }
    builder = builder.add_source(
        Environment::with_prefix("TTS_ACCEL")
            .separator("__")
            .try_parsing(true),
    );

    let raw = builder.build()?;
    let settings: Settings = raw.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let s = Settings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 8000);
        assert_eq!(s.tts_default_model, "liang");
        assert_eq!(s.tts_max_concurrent_per_endpoint, 3);
        assert_eq!(s.tts_retry_count, 2);
        assert_eq!(s.cache_max_size, 1000);
        assert_eq!(s.cache_ttl, 3600);
        assert_eq!(s.splitter_min_len, 5);
        assert_eq!(s.splitter_max_len, 40);
    }

    #[test]
    fn validate_fails_without_required_fields() {
        let s = Settings::default();
        assert!(matches!(
            s.validate(),
            Err(ConfigError::MissingField(f)) if f == "newapi_base_url"
        ));
    }

    #[test]
    fn tts_endpoint_list_trims_and_drops_empty() {
        let mut s = Settings::default();
        s.tts_endpoints = " http://a:8001 , http://a:8002,, ".to_string();
        assert_eq!(
            s.tts_endpoint_list(),
            vec!["http://a:8001".to_string(), "http://a:8002".to_string()]
        );
    }

    #[test]
    fn validate_passes_with_required_fields_set() {
        let mut s = Settings::default();
        s.newapi_base_url = "https://newapi.example.com".to_string();
        s.newapi_api_key = "sk-test".to_string();
        s.tts_endpoints = "http://tts-1:8000".to_string();
        assert!(s.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_splitter_thresholds() {
        let mut s = Settings::default();
        s.newapi_base_url = "https://newapi.example.com".to_string();
        s.newapi_api_key = "sk-test".to_string();
        s.tts_endpoints = "http://tts-1:8000".to_string();
        s.splitter_max_len = 3;
        s.splitter_min_len = 5;
        assert!(s.validate().is_err());
    }

    #[test]
    fn load_settings_reads_environment_overrides() {
        std::env::set_var("TTS_ACCEL_NEWAPI_BASE_URL", "https://env.example.com");
        std::env::set_var("TTS_ACCEL_NEWAPI_API_KEY", "env-key");
        std::env::set_var("TTS_ACCEL_TTS_ENDPOINTS", "http://env-tts:8000");
        let settings = load_settings(None).expect("settings should load from env");
        assert_eq!(settings.newapi_base_url, "https://env.example.com");
        assert_eq!(settings.tts_endpoint_list(), vec!["http://env-tts:8000"]);
        std::env::remove_var("TTS_ACCEL_NEWAPI_BASE_URL");
        std::env::remove_var("TTS_ACCEL_NEWAPI_API_KEY");
        std::env::remove_var("TTS_ACCEL_TTS_ENDPOINTS");
    }
}
