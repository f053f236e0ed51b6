//! Operation-name and text filters
//!
//! Filters never remove rows; they decide which spans render as
//! `FilteredOut`. A span passes when its op is allowed and, if a text query
//! is set, its id is among the search matches. A span without an op is
//! allowed whenever every operation name of the trace is.

use rustc_hash::FxHashSet;
use std::collections::BTreeSet;
use waterfall_core::Span;
use waterfall_search::SearchMatch;

/// Operation-name filter
///
/// `NoFilter` is a sentinel meaning "everything passes". It is distinct from
/// an empty `Active` set, which matches nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum OperationNameFilter {
    /// No op filtering
    #[default]
    NoFilter,
    /// Only spans whose op is in the set pass
    Active(BTreeSet<String>),
}

impl OperationNameFilter {
    /// Whether spans with this op pass
    pub fn allows(&self, op: &str) -> bool {
        match self {
            OperationNameFilter::NoFilter => true,
            OperationNameFilter::Active(names) => names.contains(op),
        }
    }

    /// Whether every name in `all_names` is allowed
    pub fn covers(&self, all_names: &BTreeSet<String>) -> bool {
        match self {
            OperationNameFilter::NoFilter => true,
            OperationNameFilter::Active(names) => all_names.is_subset(names),
        }
    }

    /// Whether this is the `NoFilter` sentinel
    pub fn is_no_filter(&self) -> bool {
        matches!(self, OperationNameFilter::NoFilter)
    }

    /// Flip one name in or out of the allow-set
    pub fn toggle(&mut self, name: &str) {
        match self {
            OperationNameFilter::NoFilter => {
                let mut names = BTreeSet::new();
                names.insert(name.to_string());
                *self = OperationNameFilter::Active(names);
            }
            OperationNameFilter::Active(names) => {
                if !names.remove(name) {
                    names.insert(name.to_string());
                }
                if names.is_empty() {
                    *self = OperationNameFilter::NoFilter;
                }
            }
        }
    }

    /// `NoFilter` or partial set → every name; every name → `NoFilter`
    pub fn toggle_all<'a>(&mut self, all_names: impl IntoIterator<Item = &'a str>) {
        let all: BTreeSet<String> = all_names.into_iter().map(str::to_string).collect();
        let selects_all = matches!(self, OperationNameFilter::Active(names) if *names == all);
        *self = if selects_all {
            OperationNameFilter::NoFilter
        } else {
            OperationNameFilter::Active(all)
        };
    }
}

/// Result of the last text query
#[derive(Debug, Clone, Default)]
pub struct FilterSpans {
    /// Matches ordered by score, best first
    pub results: Vec<SearchMatch>,
    /// Ids of every matched span
    pub span_ids: FxHashSet<String>,
}

impl FilterSpans {
    /// Collect matches into a lookup set
    pub fn from_matches(results: Vec<SearchMatch>) -> Self {
        let span_ids = results.iter().map(|m| m.span_id.clone()).collect();
        FilterSpans { results, span_ids }
    }

    /// Whether `span_id` matched
    pub fn contains(&self, span_id: &str) -> bool {
        self.span_ids.contains(span_id)
    }

    /// Number of matched spans
    pub fn len(&self) -> usize {
        self.span_ids.len()
    }

    /// Whether nothing matched
    pub fn is_empty(&self) -> bool {
        self.span_ids.is_empty()
    }
}

/// Everything that decides whether a span row is filtered out
#[derive(Debug, Clone, Default)]
pub struct FilterState {
    /// Operation-name allow-set
    pub operation_name_filters: OperationNameFilter,
    /// Current text query, `None` when cleared
    pub search_query: Option<String>,
    /// Matches for `search_query`; `None` while no text filter applies
    pub filter_spans: Option<FilterSpans>,
    /// Every operation name present in the trace
    pub operation_names: BTreeSet<String>,
}

impl FilterState {
    /// Filter state for a trace with these operation names
    pub fn new(operation_names: BTreeSet<String>) -> Self {
        FilterState {
            operation_names,
            ..FilterState::default()
        }
    }

    /// Whether a span passes both filters
    pub fn passes(&self, span: &Span) -> bool {
        let op_allowed = match span.op.as_deref() {
            Some(op) => self.operation_name_filters.allows(op),
            None => self.operation_name_filters.covers(&self.operation_names),
        };
        op_allowed
            && self
                .filter_spans
                .as_ref()
                .map_or(true, |matches| matches.contains(&span.span_id))
    }

    /// Whether any filter is in effect
    pub fn is_active(&self) -> bool {
        !self.operation_name_filters.is_no_filter() || self.filter_spans.is_some()
    }
}

/// Normalize a raw query: `None` for empty or whitespace-only text
pub fn normalize_query(query: Option<&str>) -> Option<String> {
    query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}
