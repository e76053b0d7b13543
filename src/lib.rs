//! Search Autocomplete Service Library
//!
//! This library crate defines the core modules that make up the autocomplete
//! back end. It serves as the foundation for the binary executable (`main.rs`).
//!
//! ## Architecture Modules
//! The system is composed of five loosely coupled subsystems:
//!
//! - **`index`**: The concurrent prefix index. A readers-writer-locked trie
//!   keyed by case-folded code points that maps a prefix to its best-scoring
//!   known completions.
//! - **`cache`**: The result cache layer. A prefix-keyed store with TTL expiry,
//!   available as an in-process map or a remote key-value client, invalidated
//!   write-through on index mutation.
//! - **`service`**: The query orchestration logic. Coordinates cache, index,
//!   fuzzy fallback and ranking, and exposes the HTTP handlers.
//! - **`pipeline`**: The ingestion pipeline. Consumes observed queries through
//!   a bounded queue and turns them into frequency updates, new candidate
//!   terms and trend boosts.
//! - **`metrics`**: The process-wide counter registry behind the stats
//!   endpoint.

pub mod cache;
pub mod error;
pub mod index;
pub mod metrics;
pub mod pipeline;
pub mod service;
