//! Span tree builder
//!
//! Turns a [`TraceEvent`]'s flat span list into an arena-backed tree rooted
//! at the event's own span.
//!
//! ## Guarantees
//!
//! - Children are ordered by `start_timestamp`, ties keep input order.
//! - Every span ends up in the tree exactly once. Spans whose parent is
//!   missing, absent, or only reachable through a parent cycle are marked
//!   orphan and attached to the root.
//! - A [`Gap`] is attached in front of a child when it starts more than
//!   `gap_threshold_secs` after the end of everything before it under the
//!   same parent (or after the parent's own start).
//! - Node ids are assigned in preorder; the root is `NodeId::ROOT`.
//!
//! The tree is never modified after construction.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, warn};
use waterfall_core::{Gap, Span, TraceEvent, WaterfallConfig, WaterfallResult};

/// Depths of ancestors that still have siblings after them
pub type ContinuingDepths = SmallVec<[usize; 8]>;

/// Index of a node in a [`SpanTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    /// The root node
    pub const ROOT: NodeId = NodeId(0);

    #[inline]
    pub(crate) fn new(index: usize) -> Self {
        NodeId(index as u32)
    }

    /// Position in the arena
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Span plus its place in the canonical tree
#[derive(Debug, Clone)]
pub struct SpanNode {
    /// The span itself
    pub span: Arc<Span>,
    /// Parent node, `None` for the root
    pub parent: Option<NodeId>,
    /// Direct children in display order
    pub children: Vec<NodeId>,
    /// Root is 0
    pub tree_depth: usize,
    /// Whether this is the last child of its parent
    pub is_last_sibling: bool,
    /// Ancestor depths whose connector line continues past this node
    pub continuing_tree_depths: ContinuingDepths,
    /// Missing instrumentation before this span, if any
    pub gap_before: Option<Gap>,
    /// Parent could not be resolved
    pub is_orphan: bool,
}

impl SpanNode {
    /// Number of direct children
    pub fn num_of_span_children(&self) -> usize {
        self.children.len()
    }

    /// Whether this node has no children
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}

/// Time range covered by the whole trace
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TraceBounds {
    /// Earliest start among the root and all spans
    pub start: f64,
    /// Latest end among the root and all spans
    pub end: f64,
}

impl TraceBounds {
    /// Length of the trace in seconds
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }
}

/// Canonical span tree
#[derive(Debug, Clone)]
pub struct SpanTree {
    nodes: Vec<SpanNode>,
    by_span_id: FxHashMap<String, NodeId>,
    bounds: TraceBounds,
    orphan_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    Root,
    Span(usize),
}

struct Pending {
    source: Option<usize>,
    parent: Option<NodeId>,
    depth: usize,
    is_last: bool,
    continuing: ContinuingDepths,
    gap: Option<Gap>,
    is_orphan: bool,
}

impl SpanTree {
    /// Build the tree for one trace event
    ///
    /// # Errors
    ///
    /// `InvalidSpan` when any span (or the event) has non-finite timestamps
    /// or ends before it starts.
    pub fn build(event: &TraceEvent, config: &WaterfallConfig) -> WaterfallResult<Self> {
        event.validate()?;

        let root = Arc::new(event.root_span());
        let spans: Vec<Arc<Span>> = event.spans.iter().cloned().map(Arc::new).collect();
        let (parents, orphans) = resolve_parents(&root, &spans);

        // Children per parent in input order, then stable sort by start time
        let mut root_kids: Vec<usize> = Vec::new();
        let mut kids: Vec<Vec<usize>> = vec![Vec::new(); spans.len()];
        for (i, parent) in parents.iter().enumerate() {
            match parent {
                Parent::Root => root_kids.push(i),
                Parent::Span(p) => kids[*p].push(i),
            }
        }
        let by_start = |a: &usize, b: &usize| {
            spans[*a]
                .start_timestamp
                .total_cmp(&spans[*b].start_timestamp)
        };
        root_kids.sort_by(by_start);
        for list in kids.iter_mut() {
            list.sort_by(by_start);
        }

        let mut nodes: Vec<SpanNode> = Vec::with_capacity(spans.len() + 1);
        let mut node_of_input: Vec<NodeId> = vec![NodeId::ROOT; spans.len()];
        let mut stack = vec![Pending {
            source: None,
            parent: None,
            depth: 0,
            is_last: true,
            continuing: ContinuingDepths::new(),
            gap: None,
            is_orphan: false,
        }];

        while let Some(p) = stack.pop() {
            let id = NodeId::new(nodes.len());
            let (span, children) = match p.source {
                None => (Arc::clone(&root), &root_kids),
                Some(i) => {
                    node_of_input[i] = id;
                    (Arc::clone(&spans[i]), &kids[i])
                }
            };
            if let Some(parent) = p.parent {
                nodes[parent.index()].children.push(id);
            }

            let mut child_continuing = p.continuing.clone();
            if !p.is_last {
                child_continuing.push(p.depth);
            }

            let mut pending_children = Vec::with_capacity(children.len());
            let mut previous_end = span.start_timestamp;
            for (pos, &child) in children.iter().enumerate() {
                let child_span = &spans[child];
                let gap = (child_span.start_timestamp - previous_end
                    > config.gap_threshold_secs)
                    .then(|| Gap {
                        start_timestamp: previous_end,
                        end_timestamp: child_span.start_timestamp,
                        is_orphan: orphans[child],
                    });
                previous_end = previous_end.max(child_span.end_timestamp);
                pending_children.push(Pending {
                    source: Some(child),
                    parent: Some(id),
                    depth: p.depth + 1,
                    is_last: pos + 1 == children.len(),
                    continuing: child_continuing.clone(),
                    gap,
                    is_orphan: orphans[child],
                });
            }

            nodes.push(SpanNode {
                span,
                parent: p.parent,
                children: Vec::with_capacity(pending_children.len()),
                tree_depth: p.depth,
                is_last_sibling: p.is_last,
                continuing_tree_depths: p.continuing,
                gap_before: p.gap,
                is_orphan: p.is_orphan,
            });

            // Reverse so the first child is popped (and numbered) first
            stack.extend(pending_children.into_iter().rev());
        }

        let mut by_span_id: FxHashMap<String, NodeId> = FxHashMap::default();
        by_span_id.insert(root.span_id.clone(), NodeId::ROOT);
        for (i, span) in spans.iter().enumerate() {
            by_span_id
                .entry(span.span_id.clone())
                .or_insert(node_of_input[i]);
        }

        let bounds = spans.iter().fold(
            TraceBounds {
                start: root.start_timestamp,
                end: root.end_timestamp,
            },
            |b, s| TraceBounds {
                start: b.start.min(s.start_timestamp),
                end: b.end.max(s.end_timestamp),
            },
        );
        let orphan_count = orphans.iter().filter(|o| **o).count();

        debug!(
            spans = spans.len(),
            orphans = orphan_count,
            gaps = nodes.iter().filter(|n| n.gap_before.is_some()).count(),
            "Built span tree"
        );

        Ok(SpanTree {
            nodes,
            by_span_id,
            bounds,
            orphan_count,
        })
    }

    /// The root node id
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Node by id
    ///
    /// # Panics
    ///
    /// If `id` does not belong to this tree.
    pub fn node(&self, id: NodeId) -> &SpanNode {
        &self.nodes[id.index()]
    }

    /// All nodes in preorder
    pub fn nodes(&self) -> &[SpanNode] {
        &self.nodes
    }

    /// Number of nodes including the root
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; the root is always present
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node for a span id; the first occurrence wins for duplicated ids
    pub fn find(&self, span_id: &str) -> Option<NodeId> {
        self.by_span_id.get(span_id).copied()
    }

    /// Ancestors of `id`, nearest first, excluding `id` itself
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.node(id).parent, move |p| self.node(*p).parent)
    }

    /// Time range of the whole trace
    pub fn bounds(&self) -> TraceBounds {
        self.bounds
    }

    /// Number of spans attached to the root because their parent was unusable
    pub fn orphan_count(&self) -> usize {
        self.orphan_count
    }
}

/// Decide every span's parent, breaking cycles and marking orphans
fn resolve_parents(root: &Span, spans: &[Arc<Span>]) -> (Vec<Parent>, Vec<bool>) {
    let mut first: FxHashMap<&str, usize> = FxHashMap::default();
    for (i, span) in spans.iter().enumerate() {
        if span.span_id != root.span_id {
            first.entry(span.span_id.as_str()).or_insert(i);
        }
    }

    let mut orphans = vec![false; spans.len()];
    let mut parents: Vec<Parent> = spans
        .iter()
        .enumerate()
        .map(|(i, span)| match span.parent_span_id.as_deref() {
            Some(p) if p == root.span_id => Parent::Root,
            Some(p) => match first.get(p) {
                Some(&j) => Parent::Span(j),
                None => {
                    orphans[i] = true;
                    Parent::Root
                }
            },
            None => {
                orphans[i] = true;
                Parent::Root
            }
        })
        .collect();

    let dangling = orphans.iter().filter(|o| **o).count();
    if dangling > 0 {
        warn!(
            count = dangling,
            "Re-parenting spans with missing parents onto the root"
        );
    }

    let mut kids: Vec<Vec<usize>> = vec![Vec::new(); spans.len()];
    for (i, parent) in parents.iter().enumerate() {
        if let Parent::Span(p) = parent {
            kids[*p].push(i);
        }
    }

    let mut reached = vec![false; spans.len()];
    let mark = |start: usize, reached: &mut Vec<bool>| {
        let mut stack = vec![start];
        while let Some(i) = stack.pop() {
            if reached[i] {
                continue;
            }
            reached[i] = true;
            stack.extend(kids[i].iter().copied());
        }
    };
    for i in 0..spans.len() {
        if parents[i] == Parent::Root {
            mark(i, &mut reached);
        }
    }

    // Whatever is left hangs off a parent cycle
    for i in 0..spans.len() {
        if !reached[i] {
            warn!(
                span_id = %spans[i].span_id,
                "Breaking parent cycle, attaching span to the root"
            );
            parents[i] = Parent::Root;
            orphans[i] = true;
            mark(i, &mut reached);
        }
    }

    (parents, orphans)
}
