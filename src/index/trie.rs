use crate::metrics::Metrics;
use crate::service::types::Suggestion;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Case-folds and trims a term or prefix into the form used to walk the
/// tree. The same form doubles as the cache key suffix.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[derive(Debug, Default)]
struct TrieNode {
    children: HashMap<char, TrieNode>,
    is_terminal: bool,
    /// Suggestions sharing this exact key, sorted by score descending.
    /// Logically a set keyed by case-folded term.
    candidates: Vec<Suggestion>,
    /// How many inserts walked through this node. Debug statistic only.
    visits: u64,
}

#[derive(Debug, Default)]
struct IndexInner {
    root: TrieNode,
    /// Number of distinct terminal candidates currently stored.
    size: usize,
}

/// The concurrent prefix index.
pub struct PrefixIndex {
    inner: RwLock<IndexInner>,
    metrics: Option<Arc<Metrics>>,
}

impl PrefixIndex {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(IndexInner::default()),
            metrics: None,
        }
    }

    pub fn with_metrics(metrics: Arc<Metrics>) -> Self {
        Self {
            inner: RwLock::new(IndexInner::default()),
            metrics: Some(metrics),
        }
    }

    /// Adds a suggestion, overwriting the candidate slot if the case-folded
    /// term is already present. Idempotent with respect to the term.
    pub fn insert(&self, suggestion: Suggestion) {
        let term = normalize(&suggestion.term);
        if term.is_empty() {
            return;
        }

        let mut suggestion = suggestion;
        if suggestion.score == 0.0 {
            suggestion.score = suggestion.frequency as f64;
        }

        let mut guard = self.inner.write();
        let inner = &mut *guard;

        let appended = {
            let mut node = &mut inner.root;
            for ch in term.chars() {
                node = node.children.entry(ch).or_default();
                node.visits += 1;
            }
            node.is_terminal = true;

            let appended = match node
                .candidates
                .iter_mut()
                .find(|candidate| normalize(&candidate.term) == term)
            {
                Some(existing) => {
                    *existing = suggestion;
                    false
                }
                None => {
                    node.candidates.push(suggestion);
                    true
                }
            };

            node.candidates
                .sort_by(|a, b| b.score.total_cmp(&a.score));
            appended
        };

        if appended {
            inner.size += 1;
        }
        drop(guard);

        if let Some(metrics) = &self.metrics {
            metrics.record_trie_insert();
        }
    }

    /// Returns up to `cap` candidates from the subtree below `prefix`,
    /// sorted by base score descending. Results are clones, never aliases
    /// into the tree.
    pub fn search(&self, prefix: &str, cap: usize) -> Vec<Suggestion> {
        let prefix = normalize(prefix);
        if prefix.is_empty() {
            return Vec::new();
        }

        let guard = self.inner.read();
        let mut node = &guard.root;
        for ch in prefix.chars() {
            match node.children.get(&ch) {
                Some(child) => node = child,
                None => {
                    drop(guard);
                    if let Some(metrics) = &self.metrics {
                        metrics.record_trie_search();
                    }
                    return Vec::new();
                }
            }
        }

        let mut results = Vec::new();
        collect_candidates(node, &mut results);
        drop(guard);

        results.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.term.cmp(&b.term))
        });
        results.truncate(cap);

        if let Some(metrics) = &self.metrics {
            metrics.record_trie_search();
        }
        results
    }

    /// Sets the frequency (and base score) of a known term and re-sorts its
    /// candidate list. Returns `false` when the term is not in the index.
    pub fn update_frequency(&self, term: &str, frequency: u64) -> bool {
        let term = normalize(term);
        if term.is_empty() {
            return false;
        }

        let mut guard = self.inner.write();
        let mut node = &mut guard.root;
        for ch in term.chars() {
            match node.children.get_mut(&ch) {
                Some(child) => node = child,
                None => return false,
            }
        }

        if !node.is_terminal {
            return false;
        }

        let mut updated = false;
        for candidate in node.candidates.iter_mut() {
            if normalize(&candidate.term) == term {
                candidate.frequency = frequency;
                candidate.score = frequency as f64;
                updated = true;
                break;
            }
        }

        if updated {
            node.candidates
                .sort_by(|a, b| b.score.total_cmp(&a.score));
        }
        updated
    }

    /// Removes a term's candidate entry and prunes any nodes left childless
    /// and non-terminal on the path. Returns `false` for unknown terms.
    pub fn delete(&self, term: &str) -> bool {
        let term = normalize(term);
        if term.is_empty() {
            return false;
        }
        let chars: Vec<char> = term.chars().collect();

        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let (removed, _) = delete_recursive(&mut inner.root, &chars, 0, &term);
        if removed {
            inner.size -= 1;
        }
        drop(guard);

        if removed {
            if let Some(metrics) = &self.metrics {
                metrics.record_trie_delete();
            }
        }
        removed
    }

    /// Total number of distinct terminal candidates.
    pub fn size(&self) -> usize {
        self.inner.read().size
    }

    /// Insert traffic through the node at `prefix`. Debug statistic.
    pub fn prefix_visits(&self, prefix: &str) -> Option<u64> {
        let prefix = normalize(prefix);
        let guard = self.inner.read();
        let mut node = &guard.root;
        for ch in prefix.chars() {
            node = node.children.get(&ch)?;
        }
        Some(node.visits)
    }
}

impl Default for PrefixIndex {
    fn default() -> Self {
        Self::new()
    }
}

fn collect_candidates(node: &TrieNode, out: &mut Vec<Suggestion>) {
    if node.is_terminal {
        out.extend(node.candidates.iter().cloned());
    }
    for child in node.children.values() {
        collect_candidates(child, out);
    }
}

/// Returns `(removed, prune_child)`: whether a candidate was removed below
/// this point, and whether the caller should drop its edge to this node.
fn delete_recursive(
    node: &mut TrieNode,
    chars: &[char],
    depth: usize,
    term: &str,
) -> (bool, bool) {
    if depth == chars.len() {
        if !node.is_terminal {
            return (false, false);
        }
        let before = node.candidates.len();
        node.candidates
            .retain(|candidate| normalize(&candidate.term) != term);
        let removed = node.candidates.len() < before;
        if node.candidates.is_empty() {
            node.is_terminal = false;
        }
        return (removed, !node.is_terminal && node.children.is_empty());
    }

    let ch = chars[depth];
    let Some(child) = node.children.get_mut(&ch) else {
        return (false, false);
    };
    let (removed, prune_child) = delete_recursive(child, chars, depth + 1, term);
    if prune_child {
        node.children.remove(&ch);
    }
    (
        removed,
        removed && !node.is_terminal && node.children.is_empty(),
    )
}
