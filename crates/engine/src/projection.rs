//! Waterfall projection
//!
//! Two passes produce the rows for a view:
//!
//! 1. [`flatten`] walks the span tree in display order and emits one row per
//!    span, gap or collapsed group, honoring group expansion and hidden
//!    subtrees. Its output depends only on [`Expansion`].
//! 2. [`classify_rows`] re-tags each structural row as filtered out or out of
//!    view. It keeps order and length and shares every payload.
//!
//! The model caches each pass separately so that moving the view window
//! never re-walks the tree.

use crate::filter::FilterState;
use crate::grouping::{ChildEntry, GroupKind, GroupLayout, SpanGroup};
use crate::row::{AutogroupRow, GapRow, Row, RowItem, RowKind, SpanRow};
use crate::tree::{ContinuingDepths, NodeId, SpanTree, TraceBounds};
use crate::window::{classify, ViewWindow, Visibility};
use rustc_hash::FxHashSet;
use std::sync::Arc;
use waterfall_core::GroupId;

// ============================================================================
// Expansion state
// ============================================================================

/// Which groups are expanded and which subtrees are hidden
///
/// Every group starts collapsed and every subtree starts shown.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    show_span_group: Vec<bool>,
    hidden_subtrees: FxHashSet<NodeId>,
}

impl Expansion {
    /// All `group_count` groups collapsed, nothing hidden
    pub fn new(group_count: usize) -> Self {
        Expansion {
            show_span_group: vec![false; group_count],
            hidden_subtrees: FxHashSet::default(),
        }
    }

    /// Whether `id` is expanded; unknown ids read as collapsed
    pub fn is_group_expanded(&self, id: GroupId) -> bool {
        self.show_span_group.get(id.index()).copied().unwrap_or(false)
    }

    /// Set one group's flag, returning whether it changed
    pub fn set_group_expanded(&mut self, id: GroupId, expanded: bool) -> bool {
        match self.show_span_group.get_mut(id.index()) {
            Some(flag) if *flag != expanded => {
                *flag = expanded;
                true
            }
            _ => false,
        }
    }

    /// Whether the descendants of `node` are hidden
    pub fn is_subtree_hidden(&self, node: NodeId) -> bool {
        self.hidden_subtrees.contains(&node)
    }

    /// Show or hide the descendants of `node`, returning whether it changed
    pub fn set_subtree_hidden(&mut self, node: NodeId, hidden: bool) -> bool {
        if hidden {
            self.hidden_subtrees.insert(node)
        } else {
            self.hidden_subtrees.remove(&node)
        }
    }
}

// ============================================================================
// Structural flattening
// ============================================================================

enum Work {
    Node {
        node: NodeId,
        depth: usize,
        is_last: bool,
        continuing: ContinuingDepths,
        group: Option<(GroupId, GroupKind)>,
    },
    Siblings {
        group: GroupId,
        depth: usize,
        is_last: bool,
        continuing: ContinuingDepths,
    },
}

fn child_continuing(continuing: &ContinuingDepths, depth: usize, is_last: bool) -> ContinuingDepths {
    let mut next = continuing.clone();
    if !is_last {
        next.push(depth);
    }
    next
}

/// Rows in display order, before filtering and windowing
pub fn flatten(tree: &SpanTree, layout: &GroupLayout, expansion: &Expansion) -> Vec<Row> {
    let mut out = Vec::with_capacity(tree.len());
    let mut stack = vec![Work::Node {
        node: NodeId::ROOT,
        depth: 0,
        is_last: true,
        continuing: ContinuingDepths::new(),
        group: None,
    }];

    while let Some(work) = stack.pop() {
        match work {
            Work::Node {
                node,
                depth,
                is_last,
                continuing,
                group,
            } => {
                if let Some(chain) = layout.chain_headed_by(node) {
                    emit_chain(tree, layout, expansion, chain, depth, is_last, continuing, &mut out, &mut stack);
                    continue;
                }
                push_gap(&mut out, tree, node, depth, &continuing);
                let hidden = expansion.is_subtree_hidden(node);
                out.push(span_row(tree, node, depth, is_last, continuing.clone(), group, hidden));
                if !hidden {
                    push_children(&mut stack, layout, node, depth + 1, child_continuing(&continuing, depth, is_last));
                }
            }
            Work::Siblings {
                group,
                depth,
                is_last,
                continuing,
            } => {
                let g = &layout.groups()[group.index()];
                if expansion.is_group_expanded(group) {
                    let n = g.members.len();
                    for (i, &member) in g.members.iter().enumerate().rev() {
                        stack.push(Work::Node {
                            node: member,
                            depth,
                            is_last: is_last && i + 1 == n,
                            continuing: continuing.clone(),
                            group: Some((group, GroupKind::Siblings)),
                        });
                    }
                } else {
                    push_gap(&mut out, tree, g.head(), depth, &continuing);
                    out.push(autogroup_row(tree, g, depth, is_last, continuing, 0, false));
                }
            }
        }
    }
    out
}

#[allow(clippy::too_many_arguments)]
fn emit_chain(
    tree: &SpanTree,
    layout: &GroupLayout,
    expansion: &Expansion,
    chain: &SpanGroup,
    depth: usize,
    is_last: bool,
    continuing: ContinuingDepths,
    out: &mut Vec<Row>,
    stack: &mut Vec<Work>,
) {
    let tail = chain.tail();

    if !expansion.is_group_expanded(chain.id) {
        push_gap(out, tree, chain.head(), depth, &continuing);
        let tail_children = tree.node(tail).num_of_span_children();
        // Hiding any member hides everything under the tail
        let hidden = chain.members.iter().any(|m| expansion.is_subtree_hidden(*m));
        out.push(autogroup_row(tree, chain, depth, is_last, continuing.clone(), tail_children, hidden));
        if !hidden {
            push_children(stack, layout, tail, depth + 1, child_continuing(&continuing, depth, is_last));
        }
        return;
    }

    let mut depth = depth;
    let mut is_last = is_last;
    let mut continuing = continuing;
    for (k, &member) in chain.members.iter().enumerate() {
        if k > 0 {
            continuing = child_continuing(&continuing, depth, is_last);
            depth += 1;
            is_last = true;
        }
        push_gap(out, tree, member, depth, &continuing);
        let hidden = expansion.is_subtree_hidden(member);
        out.push(span_row(
            tree,
            member,
            depth,
            is_last,
            continuing.clone(),
            Some((chain.id, GroupKind::Descendants)),
            hidden,
        ));
        if hidden {
            return;
        }
    }
    push_children(stack, layout, tail, depth + 1, child_continuing(&continuing, depth, is_last));
}

fn push_children(
    stack: &mut Vec<Work>,
    layout: &GroupLayout,
    parent: NodeId,
    depth: usize,
    continuing: ContinuingDepths,
) {
    let entries = layout.children(parent);
    let n = entries.len();
    for (i, entry) in entries.iter().enumerate().rev() {
        let is_last = i + 1 == n;
        stack.push(match *entry {
            ChildEntry::Node(node) => Work::Node {
                node,
                depth,
                is_last,
                continuing: continuing.clone(),
                group: None,
            },
            ChildEntry::Group(group) => Work::Siblings {
                group,
                depth,
                is_last,
                continuing: continuing.clone(),
            },
        });
    }
}

fn push_gap(out: &mut Vec<Row>, tree: &SpanTree, node: NodeId, depth: usize, continuing: &ContinuingDepths) {
    if let Some(gap) = tree.node(node).gap_before {
        out.push(Row::new(
            RowKind::Gap,
            RowItem::Gap(GapRow {
                gap,
                tree_depth: depth,
                continuing_tree_depths: continuing.clone(),
            }),
        ));
    }
}

fn span_row(
    tree: &SpanTree,
    node: NodeId,
    depth: usize,
    is_last: bool,
    continuing: ContinuingDepths,
    group: Option<(GroupId, GroupKind)>,
    subtree_hidden: bool,
) -> Row {
    let n = tree.node(node);
    let kind = if node == NodeId::ROOT {
        RowKind::RootSpan
    } else {
        RowKind::Span
    };
    Row::new(
        kind,
        RowItem::Span(SpanRow {
            span: Arc::clone(&n.span),
            node,
            tree_depth: depth,
            is_last_sibling: is_last,
            continuing_tree_depths: continuing,
            num_of_span_children: n.num_of_span_children(),
            is_orphan: n.is_orphan,
            group,
            subtree_hidden,
        }),
    )
}

fn autogroup_row(
    tree: &SpanTree,
    group: &SpanGroup,
    depth: usize,
    is_last: bool,
    continuing: ContinuingDepths,
    num_of_span_children: usize,
    subtree_hidden: bool,
) -> Row {
    let members: Vec<_> = group
        .members
        .iter()
        .map(|m| Arc::clone(&tree.node(*m).span))
        .collect();
    let start_timestamp = members
        .iter()
        .map(|s| s.start_timestamp)
        .fold(f64::INFINITY, f64::min);
    let end_timestamp = members
        .iter()
        .map(|s| s.end_timestamp)
        .fold(f64::NEG_INFINITY, f64::max);
    Row::new(
        RowKind::Autogroup,
        RowItem::Autogroup(AutogroupRow {
            group_id: group.id,
            kind: group.kind,
            label: group.label.clone(),
            op: group.op.clone(),
            description: group.description.clone(),
            members,
            start_timestamp,
            end_timestamp,
            tree_depth: depth,
            is_last_sibling: is_last,
            continuing_tree_depths: continuing,
            num_of_span_children,
            subtree_hidden,
        }),
    )
}

// ============================================================================
// Filtering and windowing
// ============================================================================

/// Re-tag structural rows for the given filters and window
///
/// Filtering wins over windowing. The root row is left alone; gaps are
/// windowed but never filtered.
pub fn classify_rows(
    rows: &[Row],
    bounds: TraceBounds,
    filter: &FilterState,
    window: ViewWindow,
) -> Vec<Row> {
    rows.iter()
        .map(|row| row.reclassified(classify_row(row, bounds, filter, window)))
        .collect()
}

fn classify_row(row: &Row, bounds: TraceBounds, filter: &FilterState, window: ViewWindow) -> RowKind {
    if row.kind == RowKind::RootSpan {
        return RowKind::RootSpan;
    }
    let filtered = match &*row.item {
        RowItem::Gap(_) => false,
        RowItem::Span(s) => !filter.passes(&s.span),
        RowItem::Autogroup(g) => !g.members.iter().any(|m| filter.passes(m)),
    };
    if filtered {
        return RowKind::FilteredOut;
    }
    let (start, end) = row.time_range();
    match classify(bounds, window, start, end) {
        Visibility::InView => row.kind,
        Visibility::OutOfView => RowKind::OutOfView,
    }
}
