#[cfg(test)]
mod tests {
    use crate::cache::memory::MemoryCache;
    use crate::cache::{cache_key, SuggestionCache};
    use crate::metrics::Metrics;
    use crate::service::types::Suggestion;
    use std::sync::Arc;
    use std::time::Duration;

    fn payload(terms: &[&str]) -> Vec<Suggestion> {
        terms
            .iter()
            .enumerate()
            .map(|(i, term)| Suggestion::new(*term, (100 - i) as u64))
            .collect()
    }

    // ============================================================
    // KEY FORMAT
    // ============================================================

    #[test]
    fn test_cache_key_format() {
        assert_eq!(cache_key("app"), "autocomplete:app");
        assert_eq!(cache_key("machine learning"), "autocomplete:machine learning");
    }

    // ============================================================
    // MEMORY CACHE: CONTRACT
    // ============================================================

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = MemoryCache::new(Duration::from_secs(60), Arc::new(Metrics::new()));

        cache.set("app", payload(&["app", "apple"])).await.unwrap();

        let hit = cache.get("app").await.expect("entry should be present");
        assert_eq!(hit.len(), 2);
        assert_eq!(hit[0].term, "app");
    }

    #[tokio::test]
    async fn test_get_unknown_key_is_miss() {
        let cache = MemoryCache::new(Duration::from_secs(60), Arc::new(Metrics::new()));
        assert!(cache.get("missing").await.is_none());
    }

    #[tokio::test]
    async fn test_keys_are_isolated() {
        let cache = MemoryCache::new(Duration::from_secs(60), Arc::new(Metrics::new()));

        cache.set("app", payload(&["app"])).await.unwrap();
        cache.set("apple", payload(&["apple"])).await.unwrap();

        assert_eq!(cache.get("app").await.unwrap()[0].term, "app");
        assert_eq!(cache.get("apple").await.unwrap()[0].term, "apple");
    }

    #[tokio::test]
    async fn test_set_replaces_existing_entry() {
        let cache = MemoryCache::new(Duration::from_secs(60), Arc::new(Metrics::new()));

        cache.set("app", payload(&["app", "apple"])).await.unwrap();
        cache.set("app", payload(&["application"])).await.unwrap();

        let hit = cache.get("app").await.unwrap();
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].term, "application");
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let cache = MemoryCache::new(Duration::from_secs(60), Arc::new(Metrics::new()));

        cache.set("app", payload(&["app"])).await.unwrap();
        cache.delete("app").await.unwrap();
        assert!(cache.get("app").await.is_none());

        // Drugi delete też OK
        cache.delete("app").await.unwrap();
    }

    // ============================================================
    // MEMORY CACHE: EXPIRY
    // ============================================================

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let cache = MemoryCache::new(Duration::from_millis(40), Arc::new(Metrics::new()));

        cache.set("app", payload(&["app"])).await.unwrap();
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cache.get("app").await.is_none());
        // Lazy removal dropped the expired entry.
        assert_eq!(cache.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_hit_slides_expiry_forward() {
        let cache = MemoryCache::new(Duration::from_millis(200), Arc::new(Metrics::new()));

        cache.set("app", payload(&["app"])).await.unwrap();

        // Keep touching the entry past the original deadline.
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(cache.get("app").await.is_some());
        tokio::time::sleep(Duration::from_millis(120)).await;
        assert!(
            cache.get("app").await.is_some(),
            "Sliding TTL should keep a hot entry alive"
        );

        tokio::time::sleep(Duration::from_millis(260)).await;
        assert!(cache.get("app").await.is_none());
    }

    #[tokio::test]
    async fn test_purge_expired_evicts_in_bulk() {
        let cache = MemoryCache::new(Duration::from_millis(30), Arc::new(Metrics::new()));

        cache.set("a", payload(&["a"])).await.unwrap();
        cache.set("b", payload(&["b"])).await.unwrap();
        cache.set("c", payload(&["c"])).await.unwrap();
        assert_eq!(cache.entry_count(), 3);

        tokio::time::sleep(Duration::from_millis(60)).await;
        let evicted = cache.purge_expired();
        assert_eq!(evicted, 3);
        assert_eq!(cache.entry_count(), 0);
    }

    // ============================================================
    // METRICS
    // ============================================================

    #[tokio::test]
    async fn test_hits_and_misses_are_counted() {
        let metrics = Arc::new(Metrics::new());
        let cache = MemoryCache::new(Duration::from_secs(60), metrics.clone());

        cache.set("app", payload(&["app"])).await.unwrap();
        assert!(cache.get("app").await.is_some());
        assert!(cache.get("app").await.is_some());
        assert!(cache.get("missing").await.is_none());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.cache_hits.get("memory"), Some(&2));
        assert_eq!(snapshot.cache_misses.get("memory"), Some(&1));
    }

    // ============================================================
    // CONCURRENCY
    // ============================================================

    #[tokio::test]
    async fn test_concurrent_access() {
        let cache = MemoryCache::new(Duration::from_secs(60), Arc::new(Metrics::new()));

        let mut tasks = Vec::new();
        for i in 0..16 {
            let cache = cache.clone();
            tasks.push(tokio::spawn(async move {
                let key = format!("prefix{}", i % 4);
                cache.set(&key, payload(&["term"])).await.unwrap();
                let _ = cache.get(&key).await;
                cache.delete(&key).await.unwrap();
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }
        assert!(cache.entry_count() <= 4);
    }
}
