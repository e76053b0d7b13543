//! Prefix Index Module
//!
//! Implements the concurrent prefix tree behind autocomplete lookups.
//!
//! ## Core Concepts
//! - **Keying**: terms are case-folded and trimmed before they address the
//!   tree; traversal is by decoded code point, never by byte.
//! - **Candidates**: each terminal node holds the suggestions sharing that
//!   exact key, kept sorted by base score descending.
//! - **Concurrency**: a single readers-writer lock guards the whole tree.
//!   Searches proceed in parallel; mutations are exclusive and bounded to a
//!   single operation.

mod trie;

pub use trie::{normalize, PrefixIndex};

#[cfg(test)]
mod tests;
