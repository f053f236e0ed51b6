//! Engine configuration
//!
//! Thresholds for gap detection and autogrouping, plus search index knobs.
//! The defaults are the values the waterfall has always used; they are
//! exposed so embedders can load them from a `waterfall.toml` instead of
//! patching constants.

use crate::error::{WaterfallError, WaterfallResult};
use crate::limits::{
    DEFAULT_GAP_THRESHOLD_SECS, DEFAULT_MAX_INDEXED_TEXT_LEN, DEFAULT_MIN_CHAIN_GROUP_SIZE,
    DEFAULT_MIN_FUZZY_SCORE, DEFAULT_MIN_SIBLING_GROUP_SIZE,
};
use serde::{Deserialize, Serialize};

/// Config file name embedders conventionally use.
pub const CONFIG_FILE_NAME: &str = "waterfall.toml";

/// Search index configuration, the `[search]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Build the fuzzy index on a background thread (default: true).
    /// When false the index is ready as soon as the model is constructed.
    #[serde(default = "default_background_index")]
    pub background_index: bool,
    /// Minimum fuzzy score for a span to count as a match (default: 0.2)
    #[serde(default = "default_min_fuzzy_score")]
    pub min_fuzzy_score: f32,
    /// Indexed text per field is truncated to this many bytes (default: 4096)
    #[serde(default = "default_max_indexed_text_len")]
    pub max_indexed_text_len: usize,
}

fn default_background_index() -> bool {
    true
}

fn default_min_fuzzy_score() -> f32 {
    DEFAULT_MIN_FUZZY_SCORE
}

fn default_max_indexed_text_len() -> usize {
    DEFAULT_MAX_INDEXED_TEXT_LEN
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            background_index: default_background_index(),
            min_fuzzy_score: default_min_fuzzy_score(),
            max_indexed_text_len: default_max_indexed_text_len(),
        }
    }
}

/// Waterfall configuration loaded from `waterfall.toml`.
///
/// # Example
///
/// ```toml
/// gap_threshold_secs = 0.1
/// min_sibling_group_size = 5
/// min_chain_group_size = 3
///
/// [search]
/// background_index = true
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterfallConfig {
    /// A gap row is inserted only when the gap is strictly longer than this.
    #[serde(default = "default_gap_threshold_secs")]
    pub gap_threshold_secs: f64,
    /// Consecutive identical siblings needed for a sibling autogroup.
    #[serde(default = "default_min_sibling_group_size")]
    pub min_sibling_group_size: usize,
    /// Chained identical spans needed for a descendant autogroup.
    #[serde(default = "default_min_chain_group_size")]
    pub min_chain_group_size: usize,
    /// Search index settings.
    #[serde(default)]
    pub search: SearchConfig,
}

fn default_gap_threshold_secs() -> f64 {
    DEFAULT_GAP_THRESHOLD_SECS
}

fn default_min_sibling_group_size() -> usize {
    DEFAULT_MIN_SIBLING_GROUP_SIZE
}

fn default_min_chain_group_size() -> usize {
    DEFAULT_MIN_CHAIN_GROUP_SIZE
}

impl Default for WaterfallConfig {
    fn default() -> Self {
        Self {
            gap_threshold_secs: default_gap_threshold_secs(),
            min_sibling_group_size: default_min_sibling_group_size(),
            min_chain_group_size: default_min_chain_group_size(),
            search: SearchConfig::default(),
        }
    }
}

impl WaterfallConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> WaterfallResult<Self> {
        let config: WaterfallConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Same config with the search index built synchronously.
    pub fn with_synchronous_search(mut self) -> Self {
        self.search.background_index = false;
        self
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` for a negative or non-finite gap threshold,
    /// group sizes below 2, or a fuzzy score outside `(0, 1]`.
    pub fn validate(&self) -> WaterfallResult<()> {
        if !self.gap_threshold_secs.is_finite() || self.gap_threshold_secs < 0.0 {
            return Err(WaterfallError::InvalidConfig(format!(
                "gap_threshold_secs must be a finite value >= 0, got {}",
                self.gap_threshold_secs
            )));
        }
        if self.min_sibling_group_size < 2 {
            return Err(WaterfallError::InvalidConfig(format!(
                "min_sibling_group_size must be at least 2, got {}",
                self.min_sibling_group_size
            )));
        }
        if self.min_chain_group_size < 2 {
            return Err(WaterfallError::InvalidConfig(format!(
                "min_chain_group_size must be at least 2, got {}",
                self.min_chain_group_size
            )));
        }
        let score = self.search.min_fuzzy_score;
        if !(score > 0.0 && score <= 1.0) {
            return Err(WaterfallError::InvalidConfig(format!(
                "search.min_fuzzy_score must be in (0, 1], got {}",
                score
            )));
        }
        Ok(())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Waterfall configuration
#
# Gaps of missing instrumentation shorter than or equal to this many
# seconds are not shown.
gap_threshold_secs = 0.1

# Runs of identical sibling spans at least this long collapse into one row.
min_sibling_group_size = 5

# Chains of identical nested spans at least this deep collapse into one row.
min_chain_group_size = 3

[search]
# Build the span search index off the construction path.
background_index = true
min_fuzzy_score = 0.2
max_indexed_text_len = 4096
"#
    }
}
