#[cfg(test)]
mod tests {
    use crate::index::PrefixIndex;
    use crate::service::types::Suggestion;
    use chrono::{Duration, Utc};
    use std::sync::Arc;

    fn sample_index() -> PrefixIndex {
        let index = PrefixIndex::new();
        index.insert(Suggestion::new("apple", 1000).with_category("fruit"));
        index.insert(Suggestion::new("application", 800).with_category("tech"));
        index.insert(Suggestion::new("app", 1200).with_category("tech"));
        index.insert(Suggestion::new("amazon", 900).with_category("company"));
        index.insert(Suggestion::new("android", 700).with_category("tech"));
        index
    }

    // ============================================================
    // INSERT + SEARCH
    // ============================================================

    #[test]
    fn test_insert_and_search() {
        let index = sample_index();

        let results = index.search("app", 10);
        assert_eq!(results.len(), 3, "Should find app, apple and application");

        // Posortowane malejąco po score
        for i in 1..results.len() {
            assert!(
                results[i - 1].score >= results[i].score,
                "Results should be sorted by score"
            );
        }
    }

    #[test]
    fn test_search_exact_term() {
        let index = sample_index();

        let results = index.search("apple", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].term, "apple");
    }

    #[test]
    fn test_search_unknown_prefix() {
        let index = sample_index();
        assert!(index.search("xyz", 10).is_empty());
    }

    #[test]
    fn test_search_empty_prefix() {
        let index = sample_index();
        assert!(index.search("", 10).is_empty());
        assert!(index.search("   ", 10).is_empty());
    }

    #[test]
    fn test_search_respects_cap() {
        let index = sample_index();

        let results = index.search("a", 2);
        assert_eq!(results.len(), 2);
        // Highest base scores first: app (1200), apple (1000).
        assert_eq!(results[0].term, "app");
        assert_eq!(results[1].term, "apple");
    }

    #[test]
    fn test_insert_empty_term_is_noop() {
        let index = PrefixIndex::new();
        index.insert(Suggestion::new("", 100));
        index.insert(Suggestion::new("   ", 100));
        assert_eq!(index.size(), 0);
    }

    #[test]
    fn test_insert_defaults_score_to_frequency() {
        let index = PrefixIndex::new();
        let mut suggestion = Suggestion::new("rust", 42);
        suggestion.score = 0.0;
        index.insert(suggestion);

        let results = index.search("rust", 1);
        assert_eq!(results[0].score, 42.0);
    }

    // ============================================================
    // CASE FOLDING
    // ============================================================

    #[test]
    fn test_case_fold_law() {
        let index = sample_index();

        let lower = index.search("app", 10);
        let upper = index.search("APP", 10);
        let mixed = index.search("ApP", 10);

        let terms = |results: &Vec<Suggestion>| -> Vec<String> {
            results.iter().map(|s| s.term.clone()).collect()
        };
        assert_eq!(terms(&lower), terms(&upper));
        assert_eq!(terms(&lower), terms(&mixed));
    }

    #[test]
    fn test_case_variants_share_candidate_slot() {
        let index = PrefixIndex::new();
        index.insert(Suggestion::new("Apple", 100));
        index.insert(Suggestion::new("apple", 200));

        // Ten sam slot, ostatni zapis wygrywa
        assert_eq!(index.size(), 1);
        let results = index.search("apple", 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].term, "apple");
        assert_eq!(results[0].frequency, 200);
    }

    #[test]
    fn test_insert_is_idempotent() {
        let index = PrefixIndex::new();
        index.insert(Suggestion::new("rust", 10));
        let size_before = index.size();

        index.insert(Suggestion::new("rust", 10));
        assert_eq!(index.size(), size_before);
        assert_eq!(index.search("rust", 10).len(), 1);
    }

    // ============================================================
    // CODE POINT TRAVERSAL
    // ============================================================

    #[test]
    fn test_multibyte_terms_traverse_by_code_point() {
        let index = PrefixIndex::new();
        index.insert(Suggestion::new("café", 100));
        index.insert(Suggestion::new("кофе", 200));

        assert_eq!(index.search("caf", 10).len(), 1);
        assert_eq!(index.search("café", 10)[0].term, "café");
        assert_eq!(index.search("ко", 10)[0].term, "кофе");
        assert_eq!(index.size(), 2);
    }

    // ============================================================
    // UPDATE FREQUENCY
    // ============================================================

    #[test]
    fn test_update_frequency_roundtrip() {
        let index = sample_index();

        assert!(index.update_frequency("app", 5000));

        let results = index.search("app", 10);
        assert_eq!(results[0].term, "app");
        assert_eq!(results[0].frequency, 5000);
        assert_eq!(results[0].score, 5000.0);
    }

    #[test]
    fn test_update_frequency_resorts_candidates() {
        let index = sample_index();

        // apple (1000) overtakes app (1200) after the update.
        assert!(index.update_frequency("apple", 9000));
        let results = index.search("app", 10);
        assert_eq!(results[0].term, "apple");
    }

    #[test]
    fn test_update_frequency_unknown_term() {
        let index = sample_index();
        assert!(!index.update_frequency("unknown", 100));
        assert!(!index.update_frequency("appl", 100), "Interior node is not a term");
        assert!(!index.update_frequency("", 100));
    }

    // ============================================================
    // DELETE
    // ============================================================

    #[test]
    fn test_delete_removes_term() {
        let index = sample_index();

        assert!(index.delete("apple"));
        assert_eq!(index.size(), 4);

        let results = index.search("app", 10);
        assert!(results.iter().all(|s| s.term != "apple"));
    }

    #[test]
    fn test_delete_twice_returns_false() {
        let index = sample_index();
        assert!(index.delete("apple"));
        assert!(!index.delete("apple"));
    }

    #[test]
    fn test_delete_unknown_term() {
        let index = sample_index();
        assert!(!index.delete("missing"));
        assert!(!index.delete("appl"), "Interior node is not a term");
        assert_eq!(index.size(), 5);
    }

    #[test]
    fn test_delete_keeps_terms_sharing_prefix() {
        let index = sample_index();

        assert!(index.delete("apple"));
        assert_eq!(index.search("app", 10).len(), 2);
        assert_eq!(index.search("application", 10).len(), 1);
    }

    #[test]
    fn test_delete_term_with_descendants() {
        let index = sample_index();

        // "app" has children (apple, application); only its candidate goes.
        assert!(index.delete("app"));
        let results = index.search("app", 10);
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|s| s.term != "app"));
    }

    #[test]
    fn test_delete_prunes_orphaned_path() {
        let index = PrefixIndex::new();
        index.insert(Suggestion::new("car", 10));
        index.insert(Suggestion::new("cargo", 20));

        assert!(index.delete("cargo"));
        // Ścieżka "carg"/"cargo" powinna zniknąć, "car" zostaje
        assert!(index.search("carg", 10).is_empty());
        assert_eq!(index.search("car", 10).len(), 1);
    }

    // ============================================================
    // SIZE + DEBUG STATS
    // ============================================================

    #[test]
    fn test_size_counts_distinct_terms() {
        let index = PrefixIndex::new();
        assert_eq!(index.size(), 0);

        index.insert(Suggestion::new("a", 1));
        index.insert(Suggestion::new("ab", 1));
        index.insert(Suggestion::new("abc", 1));
        index.insert(Suggestion::new("AB", 1)); // same slot as "ab"
        assert_eq!(index.size(), 3);

        index.delete("ab");
        assert_eq!(index.size(), 2);
    }

    #[test]
    fn test_prefix_visits_counter() {
        let index = PrefixIndex::new();
        index.insert(Suggestion::new("apple", 1));
        index.insert(Suggestion::new("application", 1));

        assert_eq!(index.prefix_visits("app"), Some(2));
        assert_eq!(index.prefix_visits("apple"), Some(1));
        assert_eq!(index.prefix_visits("zzz"), None);
    }

    #[test]
    fn test_search_returns_clones() {
        let index = sample_index();

        let mut results = index.search("app", 10);
        results[0].frequency = 0;
        results[0].score = 0.0;

        // Mutating the snapshot must not touch the index.
        let fresh = index.search("app", 10);
        assert_eq!(fresh[0].frequency, 1200);
    }

    #[test]
    fn test_recent_update_timestamp_is_preserved() {
        let index = PrefixIndex::new();
        let mut suggestion = Suggestion::new("vintage", 10);
        suggestion.updated_at = Utc::now() - Duration::days(30);
        index.insert(suggestion.clone());

        let results = index.search("vintage", 1);
        assert_eq!(results[0].updated_at, suggestion.updated_at);
    }

    // ============================================================
    // CONCURRENCY
    // ============================================================

    #[test]
    fn test_concurrent_readers_and_writer() {
        let index = Arc::new(sample_index());
        let size_before = index.size();
        let inserts = 100usize;

        let writer = {
            let index = index.clone();
            std::thread::spawn(move || {
                for i in 0..inserts {
                    index.insert(Suggestion::new(format!("term{:03}", i), i as u64));
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let index = index.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        let results = index.search("term", 50);
                        // Żaden wpis nie może być widoczny w połowie
                        for suggestion in &results {
                            assert!(suggestion.term.starts_with("term"));
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }

        assert_eq!(index.size(), size_before + inserts);
    }
}
