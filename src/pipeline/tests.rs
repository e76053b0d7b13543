#[cfg(test)]
mod tests {
    use crate::metrics::Metrics;
    use crate::pipeline::processor::{
        categorize_query, compute_trend_boosts, normalize_query, DataPipeline,
    };
    use crate::pipeline::types::PipelineConfig;
    use crate::service::engine::{AutocompleteService, ServiceConfig};
    use crate::service::types::{AutocompleteRequest, SearchEvent, Suggestion};
    use chrono::{DateTime, Duration as ChronoDuration, Utc};
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use std::time::Duration;

    fn make_service() -> Arc<AutocompleteService> {
        let metrics = Arc::new(Metrics::new());
        AutocompleteService::new(ServiceConfig::default(), None, metrics)
    }

    async fn search(service: &AutocompleteService, query: &str) -> Vec<Suggestion> {
        let request = AutocompleteRequest {
            query: query.to_string(),
            limit: Some(50),
            user_id: None,
            session_id: None,
        };
        service.get_suggestions(request).await.suggestions
    }

    fn event(query: &str) -> SearchEvent {
        SearchEvent {
            query: query.to_string(),
            user_id: None,
            session_id: None,
            client_addr: None,
            at: Utc::now(),
        }
    }

    fn window(counts_last_hour: usize, counts_earlier: usize) -> VecDeque<DateTime<Utc>> {
        let now = Utc::now();
        let mut stamps = VecDeque::new();
        for i in 0..counts_earlier {
            // Spread across hours 2..23 of the day window.
            stamps.push_back(now - ChronoDuration::minutes(120 + (i as i64 % 1260)));
        }
        for _ in 0..counts_last_hour {
            stamps.push_back(now - ChronoDuration::minutes(10));
        }
        stamps
    }

    // ============================================================
    // QUERY NORMALISATION
    // ============================================================

    #[test]
    fn test_normalize_query_basic() {
        assert_eq!(normalize_query("Hello, World!"), "hello world");
        assert_eq!(normalize_query("  Rust   2024  "), "rust 2024");
    }

    #[test]
    fn test_normalize_query_strips_non_ascii() {
        assert_eq!(normalize_query("C++ How-To"), "c how to");
        assert_eq!(normalize_query("książka"), "ksi ka");
    }

    #[test]
    fn test_normalize_query_empty() {
        assert_eq!(normalize_query(""), "");
        assert_eq!(normalize_query("!!!"), "");
    }

    // ============================================================
    // CATEGORISATION
    // ============================================================

    #[test]
    fn test_categorize_query() {
        assert_eq!(categorize_query("mobile app"), "tech");
        assert_eq!(categorize_query("market analysis"), "business");
        assert_eq!(categorize_query("best movie"), "entertainment");
        assert_eq!(categorize_query("banana"), "general");
    }

    #[test]
    fn test_categorize_is_case_insensitive() {
        assert_eq!(categorize_query("Android Phones"), "tech");
    }

    // ============================================================
    // TREND DETECTION
    // ============================================================

    #[test]
    fn test_trend_detected_for_bursty_query() {
        let mut windows = HashMap::new();
        // 200 zapytań w ostatniej godzinie, 40 wcześniej
        windows.insert("zigzag".to_string(), window(200, 40));

        let boosts = compute_trend_boosts(&mut windows, Utc::now());
        assert_eq!(boosts.len(), 1);

        let (query, frequency, trend_score) = &boosts[0];
        assert_eq!(query, "zigzag");
        assert!((*trend_score - 5.0).abs() < 1e-9);
        // Raw day count is 240; the boost multiplies by 1 + trend score.
        assert!(*frequency >= 240 * 5 / 2, "Boost factor should be >= 2.5");
    }

    #[test]
    fn test_no_trend_for_steady_query() {
        let mut windows = HashMap::new();
        windows.insert("steady".to_string(), window(1, 23));

        let boosts = compute_trend_boosts(&mut windows, Utc::now());
        assert!(boosts.is_empty());
    }

    #[test]
    fn test_no_trend_below_minimum_events() {
        let mut windows = HashMap::new();
        windows.insert("rare".to_string(), window(4, 0));

        let boosts = compute_trend_boosts(&mut windows, Utc::now());
        assert!(boosts.is_empty(), "Fewer than 5 events never trends");
    }

    #[test]
    fn test_trend_pass_prunes_stale_windows() {
        let now = Utc::now();
        let mut windows = HashMap::new();

        let mut stale = VecDeque::new();
        for i in 0..10 {
            stale.push_back(now - ChronoDuration::hours(25 + i));
        }
        windows.insert("stale".to_string(), stale);

        let mut mixed = window(2, 3);
        mixed.push_back(now - ChronoDuration::hours(30));
        windows.insert("mixed".to_string(), mixed);

        let _ = compute_trend_boosts(&mut windows, now);

        assert!(!windows.contains_key("stale"), "Empty windows are dropped");
        assert_eq!(windows.get("mixed").map(|w| w.len()), Some(5));
    }

    // ============================================================
    // PIPELINE END-TO-END
    // ============================================================

    #[tokio::test]
    async fn test_batcher_promotes_observed_queries() {
        let service = make_service();
        let pipeline = DataPipeline::new(
            service.clone(),
            PipelineConfig {
                batch_size: 10,
                flush_interval: Duration::from_millis(50),
                queue_capacity: 100,
                min_term_frequency: 1,
            },
            Arc::new(Metrics::new()),
        );
        pipeline.start();

        for _ in 0..10 {
            pipeline.enqueue(event("rust tutorial")).unwrap();
        }

        // Size-based flush triggers as soon as the batch fills.
        tokio::time::sleep(Duration::from_millis(200)).await;
        pipeline.stop().await;

        let results = search(&service, "rust").await;
        assert!(results.iter().any(|s| s.term == "rust tutorial"));
    }

    #[tokio::test]
    async fn test_flusher_applies_pending_deltas() {
        let service = make_service();
        let pipeline = DataPipeline::new(
            service.clone(),
            PipelineConfig {
                batch_size: 5,
                flush_interval: Duration::from_millis(40),
                queue_capacity: 100,
                min_term_frequency: 1,
            },
            Arc::new(Metrics::new()),
        );
        pipeline.start();

        for _ in 0..5 {
            pipeline.enqueue(event("zig build")).unwrap();
        }

        tokio::time::sleep(Duration::from_millis(250)).await;
        pipeline.stop().await;

        let results = search(&service, "zig").await;
        let suggestion = results
            .iter()
            .find(|s| s.term == "zig build")
            .expect("query should be promoted into the index");
        assert_eq!(suggestion.frequency, 5);
    }

    #[tokio::test]
    async fn test_stop_drains_buffered_events() {
        let service = make_service();
        let pipeline = DataPipeline::new(
            service.clone(),
            PipelineConfig {
                // Neither bound triggers on its own; only the drain flushes.
                batch_size: 1000,
                flush_interval: Duration::from_secs(3600),
                queue_capacity: 100,
                min_term_frequency: 1,
            },
            Arc::new(Metrics::new()),
        );
        pipeline.start();

        for _ in 0..3 {
            pipeline.enqueue(event("drained query")).unwrap();
        }
        pipeline.stop().await;

        let results = search(&service, "drained").await;
        assert!(results.iter().any(|s| s.term == "drained query"));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let service = make_service();
        let pipeline = DataPipeline::new(
            service,
            PipelineConfig::default(),
            Arc::new(Metrics::new()),
        );
        pipeline.start();

        pipeline.stop().await;
        pipeline.stop().await;
    }

    #[tokio::test]
    async fn test_full_queue_drops_events() {
        let service = make_service();
        let metrics = Arc::new(Metrics::new());
        let pipeline = DataPipeline::new(
            service,
            PipelineConfig {
                batch_size: 100,
                flush_interval: Duration::from_secs(3600),
                queue_capacity: 2,
                min_term_frequency: 1,
            },
            metrics.clone(),
        );
        // Not started: nothing consumes the queue.

        assert!(pipeline.enqueue(event("one")).is_ok());
        assert!(pipeline.enqueue(event("two")).is_ok());
        assert!(pipeline.enqueue(event("three")).is_err());

        assert_eq!(metrics.snapshot().pipeline_dropped, 1);
        assert_eq!(metrics.error_count("pipeline", "queue_full"), 1);
        assert_eq!(pipeline.stats().queue_length, 2);
    }

    #[tokio::test]
    async fn test_min_term_frequency_gates_promotion() {
        let service = make_service();
        let pipeline = DataPipeline::new(
            service.clone(),
            PipelineConfig {
                batch_size: 1,
                flush_interval: Duration::from_millis(40),
                queue_capacity: 100,
                min_term_frequency: 5,
            },
            Arc::new(Metrics::new()),
        );
        pipeline.start();

        pipeline.enqueue(event("niche query")).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        pipeline.stop().await;

        let results = search(&service, "niche").await;
        assert!(
            results.is_empty(),
            "A single observation stays below the insertion floor"
        );
    }

    #[tokio::test]
    async fn test_too_short_and_too_long_queries_are_not_promoted() {
        let service = make_service();
        let pipeline = DataPipeline::new(
            service.clone(),
            PipelineConfig {
                batch_size: 1,
                flush_interval: Duration::from_millis(40),
                queue_capacity: 100,
                min_term_frequency: 1,
            },
            Arc::new(Metrics::new()),
        );
        pipeline.start();

        pipeline.enqueue(event("x")).unwrap();
        pipeline.enqueue(event(&"long ".repeat(20))).unwrap();
        tokio::time::sleep(Duration::from_millis(150)).await;
        pipeline.stop().await;

        assert_eq!(service.index_size(), 0);
    }
}
