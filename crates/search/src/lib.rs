//! Span text search for the waterfall
//!
//! This crate provides:
//! - Basic tokenizer
//! - Scorer trait with a substring/subsequence FuzzyScorer
//! - SpanSearchIndex built once per trace
//! - SearchIndexHandle exposing the building -> ready/failed lifecycle
//!
//! # Usage
//!
//! ```
//! use waterfall_core::SearchConfig;
//! use waterfall_search::{IndexEntry, SearchIndexHandle, SearchOutcome};
//!
//! let config = SearchConfig { background_index: false, ..SearchConfig::default() };
//! let handle = SearchIndexHandle::build(
//!     vec![IndexEntry::new("a1", Some("GET /users".to_string()))],
//!     &config,
//! );
//! assert!(matches!(handle.search("users"), SearchOutcome::Matches(m) if m.len() == 1));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod index;
pub mod scorer;
pub mod tokenizer;

pub use index::{
    IndexEntry, IndexPhase, SearchIndexHandle, SearchMatch, SearchOutcome, SpanSearchIndex,
};
pub use scorer::{FieldMatch, FuzzyScorer, MatchedField, PreparedQuery, Scorer, SearchDoc};
pub use tokenizer::{tokenize, tokenize_unique};
