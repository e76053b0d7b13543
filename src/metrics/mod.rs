//! Service Counter Registry
//!
//! Process-wide counters behind the `/stats` endpoint. The registry is
//! created once at start-up, shared by every subsystem through an `Arc`, and
//! lives until the process exits. Hot-path counters are plain atomics;
//! labelled counts (cache variant, error component/reason) live in
//! string-keyed maps.

use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Instant the process came up; read by the stats endpoint for uptime.
pub static START_TIME: Lazy<Instant> = Lazy::new(Instant::now);

#[derive(Debug, Default)]
pub struct Metrics {
    queries_total: AtomicU64,
    trie_searches: AtomicU64,
    trie_inserts: AtomicU64,
    trie_deletes: AtomicU64,
    fuzzy_searches: AtomicU64,
    fuzzy_matches: AtomicU64,
    pipeline_batches: AtomicU64,
    pipeline_events: AtomicU64,
    pipeline_dropped: AtomicU64,
    cache_hits: DashMap<&'static str, u64>,
    cache_misses: DashMap<&'static str, u64>,
    errors: DashMap<String, u64>,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self) {
        self.queries_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trie_search(&self) {
        self.trie_searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trie_insert(&self) {
        self.trie_inserts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_trie_delete(&self) {
        self.trie_deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fuzzy_search(&self) {
        self.fuzzy_searches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fuzzy_match(&self) {
        self.fuzzy_matches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_pipeline_batch(&self, events: u64) {
        self.pipeline_batches.fetch_add(1, Ordering::Relaxed);
        self.pipeline_events.fetch_add(events, Ordering::Relaxed);
    }

    pub fn record_pipeline_drop(&self) {
        self.pipeline_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cache_hit(&self, variant: &'static str) {
        *self.cache_hits.entry(variant).or_insert(0) += 1;
    }

    pub fn record_cache_miss(&self, variant: &'static str) {
        *self.cache_misses.entry(variant).or_insert(0) += 1;
    }

    pub fn record_error(&self, component: &str, reason: &str) {
        *self
            .errors
            .entry(format!("{}:{}", component, reason))
            .or_insert(0) += 1;
    }

    pub fn error_count(&self, component: &str, reason: &str) -> u64 {
        self.errors
            .get(&format!("{}:{}", component, reason))
            .map(|entry| *entry.value())
            .unwrap_or(0)
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            queries_total: self.queries_total.load(Ordering::Relaxed),
            trie_searches: self.trie_searches.load(Ordering::Relaxed),
            trie_inserts: self.trie_inserts.load(Ordering::Relaxed),
            trie_deletes: self.trie_deletes.load(Ordering::Relaxed),
            fuzzy_searches: self.fuzzy_searches.load(Ordering::Relaxed),
            fuzzy_matches: self.fuzzy_matches.load(Ordering::Relaxed),
            pipeline_batches: self.pipeline_batches.load(Ordering::Relaxed),
            pipeline_events: self.pipeline_events.load(Ordering::Relaxed),
            pipeline_dropped: self.pipeline_dropped.load(Ordering::Relaxed),
            cache_hits: collect_static(&self.cache_hits),
            cache_misses: collect_static(&self.cache_misses),
            errors: self
                .errors
                .iter()
                .map(|entry| (entry.key().clone(), *entry.value()))
                .collect(),
        }
    }
}

fn collect_static(map: &DashMap<&'static str, u64>) -> BTreeMap<String, u64> {
    map.iter()
        .map(|entry| (entry.key().to_string(), *entry.value()))
        .collect()
}

/// Point-in-time copy of every counter, serialised by the stats endpoint.
#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub queries_total: u64,
    pub trie_searches: u64,
    pub trie_inserts: u64,
    pub trie_deletes: u64,
    pub fuzzy_searches: u64,
    pub fuzzy_matches: u64,
    pub pipeline_batches: u64,
    pub pipeline_events: u64,
    pub pipeline_dropped: u64,
    pub cache_hits: BTreeMap<String, u64>,
    pub cache_misses: BTreeMap<String, u64>,
    pub errors: BTreeMap<String, u64>,
}
