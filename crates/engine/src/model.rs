//! The waterfall model for one trace
//!
//! [`WaterfallModel`] owns the canonical span tree, the autogroups derived
//! from it, and all mutable view state: group expansion, hidden subtrees,
//! filters and the search index. [`WaterfallModel::get_waterfall`] turns that
//! state into rows.
//!
//! # Caching
//!
//! Two versions are tracked:
//!
//! - `structure_version` moves when a group or subtree is toggled
//! - `filter_version` moves when a filter or query result changes
//!
//! The flattened rows are cached per structure version and the classified
//! rows per `(structure_version, filter_version, window)`. Repeated calls with
//! unchanged inputs return the same `Arc`.
//!
//! # Search
//!
//! The text index may still be building when a query arrives. Such a query
//! is kept pending and applied on the first read after the index settles;
//! until then only the operation-name filter applies.

use crate::filter::{normalize_query, FilterSpans, FilterState, OperationNameFilter};
use crate::grouping::{GroupLayout, SpanGroup};
use crate::projection::{classify_rows, flatten, Expansion};
use crate::row::Row;
use crate::tree::{SpanTree, TraceBounds};
use crate::window::ViewWindow;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use waterfall_core::{
    GroupId, TraceEvent, WaterfallConfig, WaterfallError, WaterfallResult,
};
use waterfall_search::{IndexEntry, IndexPhase, SearchIndexHandle, SearchOutcome};

/// Construction options
#[derive(Debug, Clone, Default)]
pub struct WaterfallOptions {
    /// Engine configuration
    pub config: WaterfallConfig,
    /// Spans the view is focused on; their groups start expanded
    pub focused_span_ids: Vec<String>,
    /// Spans whose groups start expanded
    pub expanded_span_ids: Vec<String>,
}

impl WaterfallOptions {
    /// Options with the given config
    pub fn with_config(config: WaterfallConfig) -> Self {
        WaterfallOptions {
            config,
            ..WaterfallOptions::default()
        }
    }
}

type ProjectionKey = (u64, u64, (u64, u64));

#[derive(Debug, Default)]
struct RowCache {
    structure: Option<(u64, Arc<Vec<Row>>)>,
    projection: Option<(ProjectionKey, Arc<Vec<Row>>)>,
}

/// Waterfall state for one trace
#[derive(Debug)]
pub struct WaterfallModel {
    config: WaterfallConfig,
    tree: SpanTree,
    layout: GroupLayout,
    expansion: Expansion,
    filter: FilterState,
    search: SearchIndexHandle,
    search_pending: bool,
    operation_name_counts: BTreeMap<String, usize>,
    structure_version: u64,
    filter_version: u64,
    cache: RowCache,
}

impl WaterfallModel {
    /// Build a model with default options
    pub fn new(event: &TraceEvent) -> WaterfallResult<Self> {
        Self::with_options(event, WaterfallOptions::default())
    }

    /// Build a model
    ///
    /// # Errors
    ///
    /// `InvalidConfig` for an invalid configuration and `InvalidSpan` for
    /// spans with unusable timestamps.
    pub fn with_options(event: &TraceEvent, options: WaterfallOptions) -> WaterfallResult<Self> {
        Self::assemble(event, options, |entries, config| {
            SearchIndexHandle::build(entries, &config.search)
        })
    }

    /// Build a model around an existing search handle
    #[cfg(test)]
    pub(crate) fn with_search_index(
        event: &TraceEvent,
        options: WaterfallOptions,
        search: SearchIndexHandle,
    ) -> WaterfallResult<Self> {
        Self::assemble(event, options, |_, _| search)
    }

    fn assemble(
        event: &TraceEvent,
        options: WaterfallOptions,
        search_index: impl FnOnce(Vec<IndexEntry>, &WaterfallConfig) -> SearchIndexHandle,
    ) -> WaterfallResult<Self> {
        let WaterfallOptions {
            config,
            focused_span_ids,
            expanded_span_ids,
        } = options;
        config.validate()?;

        let tree = SpanTree::build(event, &config)?;
        let layout = GroupLayout::build(&tree, &config);
        let mut expansion = Expansion::new(layout.len());

        for span_id in focused_span_ids.iter().chain(expanded_span_ids.iter()) {
            if let Some(group) = tree.find(span_id).and_then(|n| layout.group_of(n)) {
                expansion.set_group_expanded(group, true);
            }
        }

        let mut operation_name_counts = BTreeMap::new();
        for node in tree.nodes().iter().skip(1) {
            if let Some(op) = &node.span.op {
                *operation_name_counts.entry(op.clone()).or_insert(0) += 1;
            }
        }

        let entries = tree
            .nodes()
            .iter()
            .map(|n| IndexEntry::new(n.span.span_id.clone(), n.span.description.clone()))
            .collect();
        let search = search_index(entries, &config);
        let filter = FilterState::new(operation_name_counts.keys().cloned().collect());

        info!(
            target: "waterfall::model",
            spans = tree.len() - 1,
            groups = layout.len(),
            orphans = tree.orphan_count(),
            operations = operation_name_counts.len(),
            "Waterfall model ready"
        );

        Ok(WaterfallModel {
            config,
            tree,
            layout,
            expansion,
            filter,
            search,
            search_pending: false,
            operation_name_counts,
            structure_version: 0,
            filter_version: 0,
            cache: RowCache::default(),
        })
    }

    // ========================================================================
    // Projection
    // ========================================================================

    /// Rows for the fractional view range `[view_start, view_end]`
    ///
    /// # Errors
    ///
    /// `InvalidWindow` when the range is not within `[0, 1]` or is reversed.
    pub fn get_waterfall(&mut self, view_start: f64, view_end: f64) -> WaterfallResult<Arc<Vec<Row>>> {
        let window = ViewWindow::new(view_start, view_end)?;
        Ok(self.project(window))
    }

    /// Rows for an already validated window
    pub fn project(&mut self, window: ViewWindow) -> Arc<Vec<Row>> {
        self.poll_search();

        let structure = self.structure();
        if !self.filter.is_active() && window.is_full() {
            return structure;
        }

        let key = (self.structure_version, self.filter_version, window.key());
        if let Some((cached, rows)) = &self.cache.projection {
            if *cached == key {
                return Arc::clone(rows);
            }
        }

        let rows = Arc::new(classify_rows(
            &structure,
            self.tree.bounds(),
            &self.filter,
            window,
        ));
        self.cache.projection = Some((key, Arc::clone(&rows)));
        rows
    }

    fn structure(&mut self) -> Arc<Vec<Row>> {
        if let Some((version, rows)) = &self.cache.structure {
            if *version == self.structure_version {
                return Arc::clone(rows);
            }
        }
        let rows = Arc::new(flatten(&self.tree, &self.layout, &self.expansion));
        debug!(
            version = self.structure_version,
            rows = rows.len(),
            "Rebuilt waterfall structure"
        );
        self.cache.structure = Some((self.structure_version, Arc::clone(&rows)));
        rows
    }

    // ========================================================================
    // Operation-name filters
    // ========================================================================

    /// Flip one operation name in or out of the filter
    pub fn toggle_operation_name_filter(&mut self, name: &str) {
        self.filter.operation_name_filters.toggle(name);
        self.filter_version += 1;
    }

    /// Select every operation name, or clear the filter if all are selected
    pub fn toggle_all_operation_name_filters(&mut self) {
        let names = self.operation_name_counts.keys().map(String::as_str);
        self.filter.operation_name_filters.toggle_all(names);
        self.filter_version += 1;
    }

    /// Replace the operation-name filter; returns false when it was already set
    pub fn set_operation_name_filters(&mut self, filter: OperationNameFilter) -> bool {
        if self.filter.operation_name_filters == filter {
            return false;
        }
        self.filter.operation_name_filters = filter;
        self.filter_version += 1;
        true
    }

    /// Current operation-name filter
    pub fn operation_name_filters(&self) -> &OperationNameFilter {
        &self.filter.operation_name_filters
    }

    /// Span count per operation name, excluding the root, sorted by name
    pub fn operation_name_counts(&self) -> &BTreeMap<String, usize> {
        &self.operation_name_counts
    }

    // ========================================================================
    // Text search
    // ========================================================================

    /// Set or clear the text query
    ///
    /// `None`, empty and whitespace-only queries clear the text filter.
    /// Returns false when the query was already in effect.
    pub fn query_span_search(&mut self, query: Option<&str>) -> bool {
        let query = normalize_query(query);
        if query == self.filter.search_query && !self.search_pending {
            return false;
        }
        self.filter.search_query = query;
        self.filter.filter_spans = None;
        self.search_pending = self.filter.search_query.is_some();
        self.poll_search();
        self.filter_version += 1;
        true
    }

    /// Apply a pending query if the index has settled
    ///
    /// Returns true when the filter changed.
    pub fn poll_search(&mut self) -> bool {
        if !self.search_pending {
            return false;
        }
        let Some(query) = self.filter.search_query.as_deref() else {
            self.search_pending = false;
            return false;
        };
        let spans = match self.search.search(query) {
            SearchOutcome::Pending => return false,
            SearchOutcome::Matches(matches) => FilterSpans::from_matches(matches),
            SearchOutcome::Unavailable => FilterSpans::default(),
        };
        debug!(query = %query, matches = spans.len(), "Applied span search");
        self.filter.filter_spans = Some(spans);
        self.search_pending = false;
        self.filter_version += 1;
        true
    }

    /// Current text query
    pub fn search_query(&self) -> Option<&str> {
        self.filter.search_query.as_deref()
    }

    /// Matches for the current query, once applied
    pub fn filter_spans(&self) -> Option<&FilterSpans> {
        self.filter.filter_spans.as_ref()
    }

    /// Whether a query is waiting for the index
    pub fn is_search_pending(&self) -> bool {
        self.search_pending
    }

    /// Whether the text index is ready
    pub fn is_search_ready(&self) -> bool {
        self.search.is_ready()
    }

    /// Phase of the text index build
    pub fn search_phase(&self) -> IndexPhase {
        self.search.phase()
    }

    /// Shared handle to the text index
    pub fn search_handle(&self) -> SearchIndexHandle {
        self.search.clone()
    }

    /// Block until the index settles or `timeout` passes
    ///
    /// Returns true when the index is ready. A pending query is applied
    /// before returning.
    pub fn wait_for_search_index(&mut self, timeout: Duration) -> bool {
        let phase = self.search.wait(timeout);
        self.poll_search();
        phase == IndexPhase::Ready
    }

    /// Current filter state
    pub fn filter_state(&self) -> &FilterState {
        &self.filter
    }

    // ========================================================================
    // Groups and subtrees
    // ========================================================================

    /// Expand or collapse one group
    ///
    /// # Errors
    ///
    /// `UnknownGroup` when `id` is not a group of this trace.
    pub fn toggle_span_group(&mut self, id: GroupId) -> WaterfallResult<()> {
        if self.layout.group(id).is_none() {
            return Err(WaterfallError::UnknownGroup(id));
        }
        let expanded = self.expansion.is_group_expanded(id);
        self.expansion.set_group_expanded(id, !expanded);
        self.structure_version += 1;
        Ok(())
    }

    /// Whether a group is expanded
    pub fn is_group_expanded(&self, id: GroupId) -> bool {
        self.expansion.is_group_expanded(id)
    }

    /// Hide or show a span's descendants; returns whether they are now hidden
    ///
    /// # Errors
    ///
    /// `UnknownSpan` when no span has this id.
    pub fn toggle_span_subtree(&mut self, span_id: &str) -> WaterfallResult<bool> {
        let node = self
            .tree
            .find(span_id)
            .ok_or_else(|| WaterfallError::UnknownSpan(span_id.to_string()))?;
        let hidden = !self.expansion.is_subtree_hidden(node);
        self.expansion.set_subtree_hidden(node, hidden);
        self.structure_version += 1;
        Ok(hidden)
    }

    /// Make a span's own row present in the next projection
    ///
    /// Expands every group containing the span or one of its ancestors and
    /// shows every hidden ancestor subtree. Returns false when nothing had to
    /// change.
    ///
    /// # Errors
    ///
    /// `UnknownSpan` when no span has this id.
    pub fn expand_to_span(&mut self, span_id: &str) -> WaterfallResult<bool> {
        let target = self
            .tree
            .find(span_id)
            .ok_or_else(|| WaterfallError::UnknownSpan(span_id.to_string()))?;

        let mut changed = false;
        if let Some(group) = self.layout.group_of(target) {
            changed |= self.expansion.set_group_expanded(group, true);
        }
        let ancestors: Vec<_> = self.tree.ancestors(target).collect();
        for ancestor in ancestors {
            changed |= self.expansion.set_subtree_hidden(ancestor, false);
            if let Some(group) = self.layout.group_of(ancestor) {
                changed |= self.expansion.set_group_expanded(group, true);
            }
        }

        if changed {
            self.structure_version += 1;
        }
        Ok(changed)
    }

    /// Group a span belongs to
    pub fn group_containing(&self, span_id: &str) -> Option<&SpanGroup> {
        self.tree
            .find(span_id)
            .and_then(|n| self.layout.group_of(n))
            .and_then(|id| self.layout.group(id))
    }

    /// Every group in this trace
    pub fn groups(&self) -> &[SpanGroup] {
        self.layout.groups()
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// Canonical span tree
    pub fn tree(&self) -> &SpanTree {
        &self.tree
    }

    /// Earliest start and latest end in the trace
    pub fn trace_bounds(&self) -> TraceBounds {
        self.tree.bounds()
    }

    /// Active configuration
    pub fn config(&self) -> &WaterfallConfig {
        &self.config
    }
}
