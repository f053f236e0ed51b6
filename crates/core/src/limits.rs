//! Default thresholds
//!
//! These are empirical values; they are defaults for [`crate::WaterfallConfig`]
//! rather than hard-coded behavior.

/// Gaps must be strictly longer than this (seconds) to produce a row.
pub const DEFAULT_GAP_THRESHOLD_SECS: f64 = 0.1;

/// Minimum run of identical leaf siblings that collapses into one row.
pub const DEFAULT_MIN_SIBLING_GROUP_SIZE: usize = 5;

/// Minimum chain of identical nested spans that collapses into one row.
pub const DEFAULT_MIN_CHAIN_GROUP_SIZE: usize = 3;

/// Minimum fuzzy score for a search match.
pub const DEFAULT_MIN_FUZZY_SCORE: f32 = 0.2;

/// Per-field cap on indexed text, in bytes.
pub const DEFAULT_MAX_INDEXED_TEXT_LEN: usize = 4096;
