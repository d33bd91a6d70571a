use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, warn};
use tts_accelerator_balancer::LoadBalancer;
use tts_accelerator_core::{fingerprint, CacheStats};

use crate::config::CacheConfig;
use crate::entry::{Entry, Status};

/// Fingerprint-keyed, single-flight TTS synthesis cache.
///
/// `submit` and `get` perform their lookup-or-create step inside the same
/// critical section on `entries`, so concurrent callers for the same
/// (model, text) always collapse onto one synthesis task. Synthesis itself
/// runs outside the lock — only the map mutation is ever held across a
/// non-await boundary.
pub struct Cache {
    entries: Mutex<HashMap<String, Arc<Entry>>>,
    config: CacheConfig,
    balancer: Arc<LoadBalancer>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl Cache {
    pub fn new(config: CacheConfig, balancer: Arc<LoadBalancer>) -> Arc<Self> {
        Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            config,
            balancer,
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        })
    }

    /// Returns the key immediately. Fire-and-forget: if an entry for the
    /// key already exists (in any status) this does nothing beyond
    /// returning its key; otherwise a fresh pending entry is inserted and a
    /// synthesis task is spawned for it.
    #[instrument(skip(self, text))]
    pub fn submit(self: &Arc<Self>, text: &str, model: &str) -> String {
        let key = fingerprint(model, text);
        let entry = {
            let mut entries = self.entries.lock();
            if let Some(existing) = entries.get(&key) {
                return existing.key.clone();
            }
            self.evict_for_pressure(&mut entries);
            let entry = Entry::new(key.clone(), text.to_string(), model.to_string());
            entries.insert(key.clone(), entry.clone());
            entry
        };

        metrics::counter!("tts_cache_submit_total").increment(1);
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            cache.run_synthesis(entry).await;
        });
        key
    }

    async fn run_synthesis(self: Arc<Self>, entry: Arc<Entry>) {
        entry.mark_generating();
        debug!(key = %entry.key, model = %entry.model, "synthesis started");
        match self.balancer.request(&entry.text, &entry.model).await {
            Ok(audio) => {
                debug!(key = %entry.key, bytes = audio.len(), "synthesis completed");
                metrics::counter!("tts_cache_synthesis_success_total").increment(1);
                entry.complete(audio);
            }
            Err(e) => {
                warn!(key = %entry.key, error = %e, "synthesis failed");
                metrics::counter!("tts_cache_synthesis_failure_total").increment(1);
                entry.fail(e.to_string());
            }
        }
    }

    /// Computes the key for (model, text). If no entry exists and
    /// `generate_if_missing` is true, submits one. Returns the audio for a
    /// completed entry, `None` for a failed one, or waits up to `timeout`
    /// for the in-flight entry to reach a terminal state.
    pub async fn get(
        self: &Arc<Self>,
        text: &str,
        model: &str,
        timeout: Duration,
        generate_if_missing: bool,
    ) -> Option<Vec<u8>> {
        let key = fingerprint(model, text);
        let existing = self.entries.lock().get(&key).cloned();

        let entry = match existing {
            Some(entry) => {
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                entry
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                if !generate_if_missing {
                    return None;
                }
                self.submit(text, model);
                self.entries.lock().get(&key).cloned()?
            }
        };

        entry.wait(timeout).await.map(|a| a.to_vec())
    }

    /// As [`Cache::get`], but keyed directly, never creates an entry, and
    /// does not affect hit/miss stats.
    pub async fn get_by_key(self: &Arc<Self>, key: &str, timeout: Duration) -> Option<Vec<u8>> {
        let entry = self.entries.lock().get(key).cloned()?;
        entry.wait(timeout).await.map(|a| a.to_vec())
    }

    pub fn clear(&self) {
        let mut entries = self.entries.lock();
        let dropped = entries.len();
        entries.clear();
        info!(dropped, "cache cleared");
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.entries.lock();
        let mut pending = 0;
        let mut generating = 0;
        let mut completed = 0;
        let mut failed = 0;
        for entry in entries.values() {
            match entry.status() {
                Status::Pending => pending += 1,
                Status::Generating => generating += 1,
                Status::Completed => completed += 1,
                Status::Failed => failed += 1,
            }
        }
        let hit_count = self.hit_count.load(Ordering::Relaxed);
        let miss_count = self.miss_count.load(Ordering::Relaxed);
        let total_lookups = hit_count + miss_count;
        CacheStats {
            total_entries: entries.len(),
            pending,
            generating,
            completed,
            failed,
            hit_count,
            miss_count,
            hit_rate: if total_lookups == 0 {
                0.0
            } else {
                hit_count as f64 / total_lookups as f64
            },
        }
    }

    /// Removes every entry whose age exceeds `ttl`. Called by the sweeper
    /// on its `cleanup_interval`; a generating entry evicted here is not
    /// specially protected — its synthesis task still runs to completion
    /// but writes into a dropped `Entry`, so the next caller simply misses
    /// and re-submits.
    pub fn sweep_expired(&self) {
        let mut entries = self.entries.lock();
        let ttl = self.config.ttl;
        let before = entries.len();
        entries.retain(|_, entry| entry.age() <= ttl);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "sweeper evicted expired entries");
            metrics::counter!("tts_cache_ttl_evictions_total").increment(evicted as u64);
        }
    }

    /// If the map is already at `max_size`, removes the oldest 10%
    /// (at least one) before an insertion proceeds. Called with the map
    /// lock already held.
    fn evict_for_pressure(&self, entries: &mut HashMap<String, Arc<Entry>>) {
        if entries.len() < self.config.max_size {
            return;
        }
        let evict_count = (entries.len() / 10).max(1);
        let mut by_age: Vec<(String, std::time::Instant)> = entries
            .iter()
            .map(|(k, v)| (k.clone(), v.created_at))
            .collect();
        by_age.sort_by_key(|(_, created_at)| *created_at);
        for (key, _) in by_age.into_iter().take(evict_count) {
            entries.remove(&key);
        }
        metrics::counter!("tts_cache_size_evictions_total").increment(evict_count as u64);
        warn!(evicted = evict_count, "cache at capacity, evicted oldest entries");
    }

    pub(crate) fn config(&self) -> &CacheConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tts_accelerator_balancer::BalancerConfig;

    fn test_balancer() -> Arc<LoadBalancer> {
        Arc::new(
            LoadBalancer::new(vec!["http://127.0.0.1:1".to_string()], BalancerConfig::default())
                .unwrap(),
        )
    }

    fn test_cache() -> Arc<Cache> {
        Cache::new(CacheConfig::default(), test_balancer())
    }

    #[tokio::test]
    async fn submit_is_idempotent_for_same_key() {
        let cache = test_cache();
        let k1 = cache.submit("hello world", "liang");
        let k2 = cache.submit("hello world", "liang");
        assert_eq!(k1, k2);
        assert_eq!(cache.entries.lock().len(), 1);
    }

    #[tokio::test]
    async fn submit_distinguishes_different_text() {
        let cache = test_cache();
        cache.submit("hello", "liang");
        cache.submit("world", "liang");
        assert_eq!(cache.entries.lock().len(), 2);
    }

    #[tokio::test]
    async fn get_with_generate_disabled_on_miss_returns_none() {
        let cache = test_cache();
        let result = cache
            .get("never submitted", "liang", Duration::from_millis(10), false)
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn get_zero_timeout_on_pending_entry_returns_none_immediately() {
        let cache = test_cache();
        cache.submit("some text", "liang");
        let result = cache
            .get("some text", "liang", Duration::ZERO, false)
            .await;
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn clear_drops_all_entries_but_preserves_counters() {
        let cache = test_cache();
        cache.submit("a", "liang");
        cache.submit("b", "liang");
        cache.clear();
        let stats = cache.stats();
        assert_eq!(stats.total_entries, 0);
    }

    #[tokio::test]
    async fn stats_hit_rate_reflects_gets() {
        let cache = test_cache();
        cache.submit("a", "liang");
        // a get against an existing key counts as a hit even before this
        // task polls it; exercised end-to-end in cache.rs integration tests.
        let stats = cache.stats();
        assert_eq!(stats.hit_count, 0);
        assert_eq!(stats.miss_count, 0);
    }

    #[tokio::test]
    async fn size_pressure_evicts_oldest_before_insert() {
        let mut config = CacheConfig::default();
        config.max_size = 2;
        let cache = Cache::new(config, test_balancer());
        cache.submit("first", "liang");
        std::thread::sleep(Duration::from_millis(5));
        cache.submit("second", "liang");
        std::thread::sleep(Duration::from_millis(5));
        // third insert is at capacity (2), should evict the oldest ("first")
        cache.submit("third", "liang");
        let entries = cache.entries.lock();
        assert_eq!(entries.len(), 2);
        let first_key = fingerprint("liang", "first");
        assert!(!entries.contains_key(&first_key));
    }
}
