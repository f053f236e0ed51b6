//! Query tokenizer
//!
//! Span text is matched as a whole first; multi-word queries additionally
//! fall back to per-token matching, which needs these helpers.

/// Tokenize text into searchable terms
///
/// - Lowercase
/// - Split on characters that are neither alphanumeric nor one of `._-/:`
///   (so `http.client` and `/api/0/` survive as single terms)
/// - Filter tokens shorter than 2 characters
///
/// # Example
///
/// ```
/// use waterfall_search::tokenizer::tokenize;
///
/// let tokens = tokenize("GET /api/0/issues, db.query");
/// assert_eq!(tokens, vec!["get", "/api/0/issues", "db.query"]);
/// ```
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | ':')))
        .filter(|s| s.chars().count() >= 2)
        .map(String::from)
        .collect()
}

/// Tokenize and deduplicate for query processing
///
/// # Example
///
/// ```
/// use waterfall_search::tokenizer::tokenize_unique;
///
/// let tokens = tokenize_unique("select SELECT from");
/// assert_eq!(tokens, vec!["select", "from"]);
/// ```
pub fn tokenize_unique(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tokenize(text)
        .into_iter()
        .filter(|t| seen.insert(t.clone()))
        .collect()
}
