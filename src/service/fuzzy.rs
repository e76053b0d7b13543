use std::cmp::{max, min};

/// Score discount applied to every candidate found through the fallback.
pub const FUZZY_SCORE_PENALTY: f64 = 0.8;

/// Fixed substitution table for common spelling confusions. Applied one
/// pair at a time, replacing every occurrence of the source pattern.
pub const SUBSTITUTIONS: &[(&str, &str)] = &[
    ("ph", "f"),
    ("f", "ph"),
    ("c", "k"),
    ("k", "c"),
    ("z", "s"),
    ("s", "z"),
    ("i", "y"),
    ("y", "i"),
];

/// Case-insensitive edit-distance utilities.
pub struct FuzzyMatcher {
    threshold: usize,
}

impl FuzzyMatcher {
    pub fn new(threshold: usize) -> Self {
        let threshold = if threshold == 0 { 2 } else { threshold };
        Self { threshold }
    }

    /// Levenshtein distance over lower-cased code points.
    pub fn distance(&self, a: &str, b: &str) -> usize {
        let a: Vec<char> = a.to_lowercase().chars().collect();
        let b: Vec<char> = b.to_lowercase().chars().collect();

        if a.is_empty() {
            return b.len();
        }
        if b.is_empty() {
            return a.len();
        }

        let mut previous: Vec<usize> = (0..=b.len()).collect();
        let mut current = vec![0usize; b.len() + 1];

        for i in 1..=a.len() {
            current[0] = i;
            for j in 1..=b.len() {
                let cost = if a[i - 1] == b[j - 1] { 0 } else { 1 };
                current[j] = min(
                    min(previous[j] + 1, current[j - 1] + 1),
                    previous[j - 1] + cost,
                );
            }
            std::mem::swap(&mut previous, &mut current);
        }

        previous[b.len()]
    }

    /// Whether two strings are within the configured edit-distance threshold.
    pub fn is_match(&self, a: &str, b: &str) -> bool {
        self.distance(a, b) <= self.threshold
    }

    /// Similarity in `[0, 1]`: `1 - d / max(|a|, |b|)`.
    pub fn similarity(&self, a: &str, b: &str) -> f64 {
        let max_len = max(a.chars().count(), b.chars().count());
        if max_len == 0 {
            return 1.0;
        }
        1.0 - self.distance(a, b) as f64 / max_len as f64
    }
}
