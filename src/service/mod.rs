//! Query Service Module
//!
//! Orchestrates a request through cache, prefix index, fuzzy fallback and
//! ranking, and exposes the HTTP surface.
//!
//! ## Request Flow
//! 1. **Validate**: reject malformed or suspicious queries (`validate`).
//! 2. **Lookup**: cache first, then the index, then the fuzzy fallback when
//!    exact search comes back empty (`engine`, `fuzzy`).
//! 3. **Rank**: blend base score, prefix exactness, length and recency into
//!    a deterministic order (`ranker`).
//! 4. **Record**: hand a search event to the ingestion pipeline without ever
//!    blocking the read path (`handlers`).

pub mod engine;
pub mod fuzzy;
pub mod handlers;
pub mod ranker;
pub mod types;
pub mod validate;
