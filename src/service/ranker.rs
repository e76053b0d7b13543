//! Ranking Logic
//!
//! A pure function from a candidate list and the original query to a
//! deterministically ordered, truncated list. The composite score is the
//! base score multiplied by independent boosts; ties break on the term and
//! then on the update instant so concurrent refreshes cannot reorder equal
//! scores.

use super::types::Suggestion;
use crate::index::normalize;
use chrono::{Duration, Utc};

const EXACT_PREFIX_BOOST: f64 = 2.0;
const RECENCY_BOOST: f64 = 1.1;
const RECENCY_WINDOW_DAYS: i64 = 7;
const PERSONALIZATION_BOOST: f64 = 1.2;

/// Ranks owned candidate clones against `query` and truncates to `limit`.
pub fn rank(
    candidates: Vec<Suggestion>,
    query: &str,
    personalized: bool,
    limit: usize,
) -> Vec<Suggestion> {
    if candidates.is_empty() {
        return candidates;
    }

    let query = normalize(query);
    let now = Utc::now();
    let recency_window = Duration::days(RECENCY_WINDOW_DAYS);

    let mut ranked = candidates;
    for suggestion in ranked.iter_mut() {
        let mut score = suggestion.score;

        if normalize(&suggestion.term).starts_with(&query) {
            score *= EXACT_PREFIX_BOOST;
        }

        // Shorter terms are more likely to be what the user is typing.
        let length = suggestion.term.chars().count() as f64;
        score *= 1.0 / (1.0 + length / 10.0);

        if now.signed_duration_since(suggestion.updated_at) < recency_window {
            score *= RECENCY_BOOST;
        }

        if personalized {
            if let Some(category) = &suggestion.category {
                if category.contains("tech") {
                    score *= PERSONALIZATION_BOOST;
                }
            }
        }

        suggestion.score = score;
    }

    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.term.cmp(&b.term))
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
    ranked.truncate(limit);
    ranked
}
