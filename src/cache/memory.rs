use super::{cache_key, SuggestionCache};
use crate::metrics::Metrics;
use crate::service::types::Suggestion;
use anyhow::Result;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

const REAPER_INTERVAL: Duration = Duration::from_secs(60);

struct CacheEntry {
    suggestions: Vec<Suggestion>,
    expires_at: Instant,
}

/// In-process cache variant: a single exclusive lock over a plain map.
/// Expired entries are dropped lazily on `get` and swept by a background
/// reaper once per minute.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
    ttl: Duration,
    metrics: Arc<Metrics>,
}

impl MemoryCache {
    pub fn new(ttl: Duration, metrics: Arc<Metrics>) -> Arc<Self> {
        let cache = Arc::new(Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
            metrics,
        });

        let reaper = cache.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(REAPER_INTERVAL);
            loop {
                interval.tick().await;
                let evicted = reaper.purge_expired();
                if evicted > 0 {
                    tracing::debug!("Cache reaper evicted {} entries", evicted);
                }
            }
        });

        cache
    }

    /// Drops every expired entry; returns how many were evicted.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }
}

#[async_trait]
impl SuggestionCache for MemoryCache {
    async fn get(&self, prefix: &str) -> Option<Vec<Suggestion>> {
        let key = cache_key(prefix);
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get_mut(&key) {
            Some(entry) if entry.expires_at > now => {
                // Sliding TTL: a hit keeps the entry warm.
                entry.expires_at = now + self.ttl;
                let payload = entry.suggestions.clone();
                drop(entries);
                self.metrics.record_cache_hit("memory");
                Some(payload)
            }
            Some(_) => {
                entries.remove(&key);
                drop(entries);
                self.metrics.record_cache_miss("memory");
                None
            }
            None => {
                drop(entries);
                self.metrics.record_cache_miss("memory");
                None
            }
        }
    }

    async fn set(&self, prefix: &str, suggestions: Vec<Suggestion>) -> Result<()> {
        let key = cache_key(prefix);
        let entry = CacheEntry {
            suggestions,
            expires_at: Instant::now() + self.ttl,
        };
        self.entries.lock().insert(key, entry);
        Ok(())
    }

    async fn delete(&self, prefix: &str) -> Result<()> {
        self.entries.lock().remove(&cache_key(prefix));
        Ok(())
    }
}
