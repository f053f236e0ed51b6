//! Fuzzy scoring for span search
//!
//! This module provides:
//! - SearchDoc: pre-lowercased, length-capped span text
//! - PreparedQuery: a normalized query
//! - Scorer trait for pluggable scoring algorithms
//! - FuzzyScorer default implementation
//!
//! Scores are in `(0, 1]`; higher is better.

use crate::tokenizer::tokenize_unique;

// ============================================================================
// Character mask
// ============================================================================

/// Bitset of ASCII letters and digits present in a string
///
/// A document can only match a query whose mask is a subset of its own,
/// which lets the index skip most documents without scoring them.
fn char_mask(text: &str) -> u64 {
    text.chars().fold(0u64, |mask, c| match c {
        'a'..='z' => mask | 1 << (c as u32 - 'a' as u32),
        '0'..='9' => mask | 1 << (26 + c as u32 - '0' as u32),
        _ => mask,
    })
}

fn truncate_at_boundary(text: &str, max_len: usize) -> &str {
    if text.len() <= max_len {
        return text;
    }
    let mut end = max_len;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

// ============================================================================
// SearchDoc
// ============================================================================

/// Which span field produced a match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchedField {
    /// The span description
    Description,
    /// The span id
    SpanId,
    /// Every query token matched somewhere in the span's text
    Tokens,
}

/// Indexed representation of one span
#[derive(Debug, Clone)]
pub struct SearchDoc {
    /// Span id as given
    pub span_id: String,
    span_id_lc: String,
    description_lc: Option<String>,
    mask: u64,
}

impl SearchDoc {
    /// Create a document, lowercasing and capping each field at `max_len` bytes
    pub fn new(span_id: impl Into<String>, description: Option<&str>, max_len: usize) -> Self {
        let span_id = span_id.into();
        let span_id_lc = truncate_at_boundary(&span_id, max_len).to_lowercase();
        let description_lc =
            description.map(|d| truncate_at_boundary(d, max_len).to_lowercase());
        let mask = char_mask(&span_id_lc) | description_lc.as_deref().map_or(0, char_mask);
        SearchDoc {
            span_id,
            span_id_lc,
            description_lc,
            mask,
        }
    }

    /// Whether every letter and digit of the query occurs in this document
    pub fn may_match(&self, query: &PreparedQuery) -> bool {
        self.mask & query.mask == query.mask
    }

    fn fields(&self) -> impl Iterator<Item = (MatchedField, &str)> {
        self.description_lc
            .as_deref()
            .map(|d| (MatchedField::Description, d))
            .into_iter()
            .chain(std::iter::once((MatchedField::SpanId, self.span_id_lc.as_str())))
    }
}

// ============================================================================
// PreparedQuery
// ============================================================================

/// Normalized query text
#[derive(Debug, Clone)]
pub struct PreparedQuery {
    /// Trimmed, lowercased query
    pub text: String,
    chars: Vec<char>,
    tokens: Vec<String>,
    mask: u64,
}

impl PreparedQuery {
    /// Prepare a query; `None` for empty or whitespace-only input
    pub fn new(query: &str) -> Option<Self> {
        let text = query.trim().to_lowercase();
        if text.is_empty() {
            return None;
        }
        Some(PreparedQuery {
            chars: text.chars().collect(),
            tokens: tokenize_unique(&text),
            mask: char_mask(&text),
            text,
        })
    }
}

// ============================================================================
// Scorer Trait
// ============================================================================

/// Result of scoring one document
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldMatch {
    /// Field that scored best
    pub field: MatchedField,
    /// Score in `(0, 1]`
    pub score: f32,
}

/// Pluggable scoring interface
///
/// Scorers must be Send + Sync since indexes are built off-thread.
pub trait Scorer: Send + Sync {
    /// Score a document, `None` when it does not match
    fn score(&self, doc: &SearchDoc, query: &PreparedQuery) -> Option<FieldMatch>;

    /// Name for debugging and logging
    fn name(&self) -> &str;
}

// ============================================================================
// FuzzyScorer
// ============================================================================

/// Substring-then-subsequence scorer
///
/// - Substring hit: `1.0 - 0.25 * (position / field_len)`, so earlier hits rank higher.
/// - Subsequence hit: `0.5 * query_len / window`, where `window` is the
///   shortest stretch of the field containing the query characters in order.
/// - Multi-word queries where every token is a substring of some field: `0.6`.
///
/// Matches below `min_score` are discarded.
#[derive(Debug, Clone)]
pub struct FuzzyScorer {
    min_score: f32,
}

impl FuzzyScorer {
    /// Create a scorer with the given acceptance threshold
    pub fn new(min_score: f32) -> Self {
        FuzzyScorer { min_score }
    }

    fn score_field(field: &str, query: &PreparedQuery) -> f32 {
        if let Some(pos) = field.find(&query.text) {
            let len = field.len().max(1) as f32;
            return 1.0 - 0.25 * (pos as f32 / len);
        }
        match shortest_subsequence_window(field, &query.chars) {
            Some(window) => 0.5 * query.chars.len() as f32 / window as f32,
            None => 0.0,
        }
    }
}

impl Scorer for FuzzyScorer {
    fn score(&self, doc: &SearchDoc, query: &PreparedQuery) -> Option<FieldMatch> {
        if !doc.may_match(query) {
            return None;
        }

        let mut best: Option<FieldMatch> = None;
        for (field, text) in doc.fields() {
            let score = Self::score_field(text, query);
            if score > best.map_or(0.0, |b| b.score) {
                best = Some(FieldMatch { field, score });
            }
        }

        if query.tokens.len() > 1 && best.map_or(0.0, |b| b.score) < 0.6 {
            let all_tokens = query
                .tokens
                .iter()
                .all(|t| doc.fields().any(|(_, text)| text.contains(t.as_str())));
            if all_tokens {
                best = Some(FieldMatch {
                    field: MatchedField::Tokens,
                    score: 0.6,
                });
            }
        }

        best.filter(|m| m.score >= self.min_score)
    }

    fn name(&self) -> &str {
        "fuzzy"
    }
}

/// Length in chars of the shortest window of `field` containing `needle` in order
fn shortest_subsequence_window(field: &str, needle: &[char]) -> Option<usize> {
    let first = *needle.first()?;
    let hay: Vec<char> = field.chars().collect();
    let mut best: Option<usize> = None;

    for start in 0..hay.len() {
        if hay[start] != first {
            continue;
        }
        let mut matched = 1;
        let mut pos = start;
        while matched < needle.len() {
            pos += 1;
            if pos >= hay.len() {
                break;
            }
            if hay[pos] == needle[matched] {
                matched += 1;
            }
        }
        if matched < needle.len() {
            // later starts cannot match either
            break;
        }
        let window = pos - start + 1;
        if best.map_or(true, |b| window < b) {
            best = Some(window);
        }
    }
    best
}
