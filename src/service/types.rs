use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single autocomplete candidate.
///
/// `term` is the user-visible string; the index addresses it by its
/// case-folded form. `score` is the pre-ranking base score, initialised to
/// `frequency` when left at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Suggestion {
    pub term: String,
    #[serde(default)]
    pub frequency: u64,
    #[serde(default)]
    pub score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Suggestion {
    pub fn new(term: impl Into<String>, frequency: u64) -> Self {
        Self {
            term: term.into(),
            frequency,
            score: frequency as f64,
            category: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AutocompleteRequest {
    pub query: String,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AutocompleteResponse {
    pub query: String,
    pub suggestions: Vec<Suggestion>,
    pub latency: String,
    /// Where the payload came from: "cache", "trie", "fuzzy" or "empty".
    pub source: String,
}

/// One observed search, produced per served request and consumed by the
/// ingestion pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchEvent {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_addr: Option<String>,
    pub at: DateTime<Utc>,
}
