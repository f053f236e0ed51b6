//! Projected waterfall rows
//!
//! A [`Row`] pairs a kind with a shared payload. Filtering and windowing
//! change the kind of a row but never its payload, so a row that leaves the
//! view and comes back is the same allocation.

use crate::grouping::GroupKind;
use crate::tree::{ContinuingDepths, NodeId};
use std::sync::Arc;
use waterfall_core::{Gap, GroupId, Span};

/// How a row renders
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// The trace root; never filtered or windowed
    RootSpan,
    /// A regular span
    Span,
    /// Missing instrumentation
    Gap,
    /// A collapsed autogroup
    Autogroup,
    /// Hidden by the operation-name or text filter
    FilteredOut,
    /// Outside the view window
    OutOfView,
}

/// A span row
#[derive(Debug, Clone, PartialEq)]
pub struct SpanRow {
    /// The span
    pub span: Arc<Span>,
    /// Node in the span tree
    pub node: NodeId,
    /// Indentation level
    pub tree_depth: usize,
    /// Last row at this level under its parent
    pub is_last_sibling: bool,
    /// Ancestor depths whose connector continues past this row
    pub continuing_tree_depths: ContinuingDepths,
    /// Direct children in the span tree
    pub num_of_span_children: usize,
    /// Attached to the root because its parent was unusable
    pub is_orphan: bool,
    /// Expanded group this span is shown as part of
    pub group: Option<(GroupId, GroupKind)>,
    /// Descendants are hidden
    pub subtree_hidden: bool,
}

/// A gap row
#[derive(Debug, Clone, PartialEq)]
pub struct GapRow {
    /// The gap
    pub gap: Gap,
    /// Indentation level, that of the span it precedes
    pub tree_depth: usize,
    /// Ancestor depths whose connector continues past this row
    pub continuing_tree_depths: ContinuingDepths,
}

/// A collapsed autogroup row
#[derive(Debug, Clone, PartialEq)]
pub struct AutogroupRow {
    /// Group id, used to expand it
    pub group_id: GroupId,
    /// Sibling or descendant group
    pub kind: GroupKind,
    /// Display label
    pub label: String,
    /// Shared operation name
    pub op: Option<String>,
    /// Shared description
    pub description: Option<String>,
    /// Member spans in display order
    pub members: Vec<Arc<Span>>,
    /// Earliest member start
    pub start_timestamp: f64,
    /// Latest member end
    pub end_timestamp: f64,
    /// Indentation level
    pub tree_depth: usize,
    /// Last row at this level under its parent
    pub is_last_sibling: bool,
    /// Ancestor depths whose connector continues past this row
    pub continuing_tree_depths: ContinuingDepths,
    /// Rows nested under this one (children of a chain's tail)
    pub num_of_span_children: usize,
    /// Children of a chain's tail are hidden
    pub subtree_hidden: bool,
}

impl AutogroupRow {
    /// Number of spans folded into the row
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; groups have members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Row payload
#[derive(Debug, Clone, PartialEq)]
pub enum RowItem {
    /// Span, including the root
    Span(SpanRow),
    /// Gap
    Gap(GapRow),
    /// Collapsed group
    Autogroup(AutogroupRow),
}

/// One row of the waterfall
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    /// How the row renders
    pub kind: RowKind,
    /// What it wraps
    pub item: Arc<RowItem>,
}

impl Row {
    pub(crate) fn new(kind: RowKind, item: RowItem) -> Self {
        Row {
            kind,
            item: Arc::new(item),
        }
    }

    pub(crate) fn reclassified(&self, kind: RowKind) -> Self {
        Row {
            kind,
            item: Arc::clone(&self.item),
        }
    }

    /// The wrapped span, for span rows
    pub fn span(&self) -> Option<&Arc<Span>> {
        match &*self.item {
            RowItem::Span(row) => Some(&row.span),
            _ => None,
        }
    }

    /// Span id, for span rows
    pub fn span_id(&self) -> Option<&str> {
        self.span().map(|s| s.span_id.as_str())
    }

    /// The wrapped group, for autogroup rows
    pub fn autogroup(&self) -> Option<&AutogroupRow> {
        match &*self.item {
            RowItem::Autogroup(row) => Some(row),
            _ => None,
        }
    }

    /// Group to toggle for this row: the group itself or the expanded group
    /// a span is shown in
    pub fn group_id(&self) -> Option<GroupId> {
        match &*self.item {
            RowItem::Span(row) => row.group.map(|(id, _)| id),
            RowItem::Autogroup(row) => Some(row.group_id),
            RowItem::Gap(_) => None,
        }
    }

    /// Description text shown for the row
    pub fn description(&self) -> Option<&str> {
        match &*self.item {
            RowItem::Span(row) => row.span.description.as_deref(),
            RowItem::Gap(_) => Some(Gap::DESCRIPTION),
            RowItem::Autogroup(row) => row.description.as_deref(),
        }
    }

    /// Operation name, if any
    pub fn op(&self) -> Option<&str> {
        match &*self.item {
            RowItem::Span(row) => row.span.op.as_deref(),
            RowItem::Gap(_) => None,
            RowItem::Autogroup(row) => row.op.as_deref(),
        }
    }

    /// Indentation level
    pub fn tree_depth(&self) -> usize {
        match &*self.item {
            RowItem::Span(row) => row.tree_depth,
            RowItem::Gap(row) => row.tree_depth,
            RowItem::Autogroup(row) => row.tree_depth,
        }
    }

    /// Ancestor depths whose connector continues past this row
    pub fn continuing_tree_depths(&self) -> &[usize] {
        match &*self.item {
            RowItem::Span(row) => &row.continuing_tree_depths,
            RowItem::Gap(row) => &row.continuing_tree_depths,
            RowItem::Autogroup(row) => &row.continuing_tree_depths,
        }
    }

    /// Absolute time range covered by the row
    pub fn time_range(&self) -> (f64, f64) {
        match &*self.item {
            RowItem::Span(row) => (row.span.start_timestamp, row.span.end_timestamp),
            RowItem::Gap(row) => (row.gap.start_timestamp, row.gap.end_timestamp),
            RowItem::Autogroup(row) => (row.start_timestamp, row.end_timestamp),
        }
    }

    /// Whether the row renders its content
    pub fn is_visible(&self) -> bool {
        !matches!(self.kind, RowKind::FilteredOut | RowKind::OutOfView)
    }
}
