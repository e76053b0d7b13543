//! Result Cache Module
//!
//! Prefix-keyed store for ranked suggestion payloads.
//!
//! ## Core Concepts
//! - **Contract**: `get`/`set`/`delete` over the semantic key
//!   `"autocomplete:" + normalised_prefix`, identical across variants.
//! - **Variants**: an in-process map (`MemoryCache`) and a remote key-value
//!   client (`RemoteCache`). Construction picks the variant; the service
//!   only sees the trait object.
//! - **Expiry**: entries carry a TTL fixed at construction; a hit slides the
//!   expiry forward. The in-process variant additionally runs a minutely
//!   reaper.
//! - **Failure**: a remote error on `get` degrades to a miss; `set` failures
//!   are logged and dropped; `delete` failures are counted.

pub mod memory;
pub mod remote;

use crate::service::types::Suggestion;
use anyhow::Result;
use async_trait::async_trait;

/// Builds the wire-stable cache key for a normalised prefix.
pub fn cache_key(prefix: &str) -> String {
    format!("autocomplete:{}", prefix)
}

/// The caching contract shared by every variant.
#[async_trait]
pub trait SuggestionCache: Send + Sync {
    /// Returns the payload for a non-expired entry, or `None` on miss.
    async fn get(&self, prefix: &str) -> Option<Vec<Suggestion>>;

    /// Stores a payload with expiry `now + ttl`, replacing any entry.
    async fn set(&self, prefix: &str, suggestions: Vec<Suggestion>) -> Result<()>;

    /// Removes the entry if present. Idempotent.
    async fn delete(&self, prefix: &str) -> Result<()>;
}

#[cfg(test)]
mod tests;
