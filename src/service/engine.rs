use super::fuzzy::{FuzzyMatcher, FUZZY_SCORE_PENALTY, SUBSTITUTIONS};
use super::ranker::rank;
use super::types::{AutocompleteRequest, AutocompleteResponse, Suggestion};
use crate::cache::SuggestionCache;
use crate::index::{normalize, PrefixIndex};
use crate::metrics::Metrics;
use std::sync::Arc;
use std::time::Instant;

/// Hard cap on the number of suggestions a single request may ask for.
pub const MAX_LIMIT: usize = 50;

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub max_suggestions: usize,
    pub enable_fuzzy: bool,
    pub fuzzy_threshold: usize,
    pub personalization: bool,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 10,
            enable_fuzzy: true,
            fuzzy_threshold: 2,
            personalization: false,
        }
    }
}

/// The query service. Owns the prefix index, holds the cache abstractly and
/// orchestrates cache -> index -> fuzzy -> rank for every request.
pub struct AutocompleteService {
    index: PrefixIndex,
    cache: Option<Arc<dyn SuggestionCache>>,
    fuzzy: Option<FuzzyMatcher>,
    default_limit: usize,
    personalization: bool,
    metrics: Arc<Metrics>,
}

impl AutocompleteService {
    pub fn new(
        config: ServiceConfig,
        cache: Option<Arc<dyn SuggestionCache>>,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let fuzzy = config
            .enable_fuzzy
            .then(|| FuzzyMatcher::new(config.fuzzy_threshold));

        Arc::new(Self {
            index: PrefixIndex::with_metrics(metrics.clone()),
            cache,
            fuzzy,
            default_limit: config.max_suggestions.clamp(1, MAX_LIMIT),
            personalization: config.personalization,
            metrics,
        })
    }

    /// Returns ranked suggestions for a query.
    ///
    /// Never fails: an empty result is a success with an empty list, and
    /// cache trouble silently falls through to the index.
    pub async fn get_suggestions(&self, req: AutocompleteRequest) -> AutocompleteResponse {
        let start = Instant::now();
        self.metrics.record_query();

        let query = normalize(&req.query);
        if query.is_empty() {
            return AutocompleteResponse {
                query: req.query,
                suggestions: Vec::new(),
                latency: format!("{:?}", start.elapsed()),
                source: "empty".to_string(),
            };
        }

        let limit = req
            .limit
            .unwrap_or(self.default_limit)
            .clamp(1, MAX_LIMIT);

        let mut source = "cache";
        let mut suggestions = match &self.cache {
            Some(cache) => cache.get(&query).await.unwrap_or_default(),
            None => Vec::new(),
        };

        if suggestions.is_empty() {
            source = "trie";
            suggestions = self.index.search(&query, limit * 2);
            tracing::debug!(query = %query, results = suggestions.len(), "Trie search");

            if suggestions.is_empty() && self.fuzzy.is_some() {
                self.metrics.record_fuzzy_search();
                suggestions = self.fuzzy_search(&query, limit * 2);
                if !suggestions.is_empty() {
                    source = "fuzzy";
                    tracing::debug!(query = %query, results = suggestions.len(), "Fuzzy search");
                }
            }

            // Populate the cache off the read path with the unranked list.
            if !suggestions.is_empty() {
                if let Some(cache) = &self.cache {
                    let cache = cache.clone();
                    let metrics = self.metrics.clone();
                    let key = query.clone();
                    let payload = suggestions.clone();
                    tokio::spawn(async move {
                        if let Err(e) = cache.set(&key, payload).await {
                            tracing::error!("Failed to cache suggestions: {}", e);
                            metrics.record_error("service", "cache_set_failed");
                        }
                    });
                }
            }
        }

        let personalized = self.personalization
            && (req.user_id.as_deref().is_some_and(|id| !id.is_empty())
                || req.session_id.as_deref().is_some_and(|id| !id.is_empty()));
        let suggestions = rank(suggestions, &query, personalized, limit);

        AutocompleteResponse {
            query: req.query,
            suggestions,
            latency: format!("{:?}", start.elapsed()),
            source: source.to_string(),
        }
    }

    /// Cheap perturbation-based fallback, run only when exact prefix search
    /// found nothing.
    fn fuzzy_search(&self, query: &str, budget: usize) -> Vec<Suggestion> {
        let mut results = Vec::new();

        // Typo correction: retry with the last code point dropped.
        let chars: Vec<char> = query.chars().collect();
        if chars.len() > 1 {
            let shortened: String = chars[..chars.len() - 1].iter().collect();
            let found = self.index.search(&shortened, budget);
            if !found.is_empty() {
                self.metrics.record_fuzzy_match();
            }
            results.extend(found);
        }

        for (from, to) in SUBSTITUTIONS {
            if query.contains(from) {
                let perturbed = query.replace(from, to);
                let found = self.index.search(&perturbed, budget / 2);
                if !found.is_empty() {
                    self.metrics.record_fuzzy_match();
                }
                results.extend(found);
            }
        }

        for suggestion in results.iter_mut() {
            suggestion.score *= FUZZY_SCORE_PENALTY;
        }
        results
    }

    /// Inserts one suggestion and invalidates the cached prefixes it shadows.
    pub fn add_suggestion(&self, suggestion: Suggestion) {
        if suggestion.term.trim().is_empty() {
            return;
        }
        let term = suggestion.term.clone();
        self.index.insert(suggestion);
        tracing::debug!(term = %term, "Added suggestion");
        self.invalidate_term(&term);
    }

    /// Inserts a batch, acquiring and releasing the index lock per item so
    /// readers are never starved by one long exclusive section.
    pub fn batch_add_suggestions(&self, suggestions: Vec<Suggestion>) {
        for suggestion in suggestions {
            self.add_suggestion(suggestion);
        }
    }

    /// Sets a term's frequency. Returns `false` when the term is unknown.
    pub fn update_frequency(&self, term: &str, frequency: u64) -> bool {
        let updated = self.index.update_frequency(term, frequency);
        if updated {
            self.invalidate_term(term);
        }
        updated
    }

    /// Deletes a term. Returns `false` when the term is unknown.
    pub fn delete_suggestion(&self, term: &str) -> bool {
        let deleted = self.index.delete(term);
        if deleted {
            self.invalidate_term(term);
        }
        deleted
    }

    pub fn index_size(&self) -> usize {
        self.index.size()
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Best-effort async deletion of every cached prefix of a mutated term.
    /// Attempted exactly once per mutation; a failed delete is counted and
    /// the entry ages out with its TTL instead.
    fn invalidate_term(&self, term: &str) {
        let Some(cache) = &self.cache else {
            return;
        };

        let cache = cache.clone();
        let metrics = self.metrics.clone();
        let term = normalize(term);

        tokio::spawn(async move {
            let mut prefix = String::with_capacity(term.len());
            for ch in term.chars() {
                prefix.push(ch);
                if let Err(e) = cache.delete(&prefix).await {
                    tracing::error!(prefix = %prefix, "Failed to invalidate cache: {}", e);
                    metrics.record_error("cache", "invalidate_failed");
                }
            }
        });
    }

    /// Seeds the index with a small starter set so the service answers
    /// something before the pipeline has observed real traffic.
    pub fn load_sample_data(&self) {
        let samples = vec![
            Suggestion::new("apple", 1000).with_category("fruit"),
            Suggestion::new("application", 800).with_category("tech"),
            Suggestion::new("app", 1200).with_category("tech"),
            Suggestion::new("amazon", 900).with_category("company"),
            Suggestion::new("android", 700).with_category("tech"),
            Suggestion::new("banana", 600).with_category("fruit"),
            Suggestion::new("book", 500).with_category("education"),
            Suggestion::new("basketball", 400).with_category("sports"),
            Suggestion::new("computer", 800).with_category("tech"),
            Suggestion::new("coding", 600).with_category("tech"),
        ];

        let count = samples.len();
        self.batch_add_suggestions(samples);
        tracing::info!("Loaded {} sample suggestions", count);
    }
}
