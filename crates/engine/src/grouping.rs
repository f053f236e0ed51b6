//! Autogrouping
//!
//! Derives collapsible groups from a [`SpanTree`] without modifying it:
//!
//! - **Sibling groups**: a run of at least `min_sibling_group_size`
//!   consecutive leaf siblings sharing `(op, description)`.
//! - **Descendant groups**: a chain of at least `min_chain_group_size`
//!   spans where every span but the last has exactly one child, and that
//!   child shares its `(op, description)`.
//!
//! Chains are found top-down so every chain is maximal. A chain tail may
//! have any number of children; they stay outside the group. The root never
//! joins a group.
//!
//! The layout only records structure. Whether a group is expanded is
//! separate state owned by the model, so the same layout serves every
//! combination of expanded groups.

use crate::tree::{NodeId, SpanTree};
use rustc_hash::FxHashMap;
use tracing::debug;
use waterfall_core::{GroupId, Span, WaterfallConfig};

/// Which rule produced a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GroupKind {
    /// Consecutive identical leaf siblings
    Siblings,
    /// Chain of identical nested spans
    Descendants,
}

/// One autogroup
#[derive(Debug, Clone, PartialEq)]
pub struct SpanGroup {
    /// Group id
    pub id: GroupId,
    /// Rule that produced it
    pub kind: GroupKind,
    /// Members in display order (head to tail for chains)
    pub members: Vec<NodeId>,
    /// Shared operation name
    pub op: Option<String>,
    /// Shared description
    pub description: Option<String>,
    /// Row label, e.g. `Autogrouped — http —`
    pub label: String,
}

impl SpanGroup {
    /// First member
    pub fn head(&self) -> NodeId {
        self.members[0]
    }

    /// Last member
    pub fn tail(&self) -> NodeId {
        self.members[self.members.len() - 1]
    }

    /// Number of spans in the group
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Always false; groups have at least two members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Label shown on a collapsed group row
pub fn group_label(kind: GroupKind, op: Option<&str>, description: Option<&str>) -> String {
    match (op, description) {
        (Some(op), _) => format!("Autogrouped — {} —", op),
        (None, Some(description)) => format!("Autogrouped — {}", description),
        (None, None) => match kind {
            GroupKind::Siblings => "Autogrouped — siblings".to_string(),
            GroupKind::Descendants => "Autogrouped — descendants".to_string(),
        },
    }
}

/// Entry in a node's grouped child list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildEntry {
    /// A child rendered on its own
    Node(NodeId),
    /// A sibling group standing in for several children
    Group(GroupId),
}

/// Grouping structure derived from a tree
#[derive(Debug, Clone)]
pub struct GroupLayout {
    groups: Vec<SpanGroup>,
    children: Vec<Vec<ChildEntry>>,
    chain_heads: FxHashMap<NodeId, GroupId>,
    membership: Vec<Option<GroupId>>,
}

impl GroupLayout {
    /// Compute groups for `tree`
    pub fn build(tree: &SpanTree, config: &WaterfallConfig) -> Self {
        let n = tree.len();
        let mut layout = GroupLayout {
            groups: Vec::new(),
            children: Vec::with_capacity(n),
            chain_heads: FxHashMap::default(),
            membership: vec![None; n],
        };

        // Preorder: parents are visited before children, so chains are maximal
        for index in 0..n {
            let id = NodeId::new(index);

            if id != NodeId::ROOT && layout.membership[index].is_none() {
                let chain = collect_chain(tree, id);
                if chain.len() >= config.min_chain_group_size {
                    layout.push_group(tree, GroupKind::Descendants, chain);
                }
            }

            let entries = layout.group_siblings(tree, id, config.min_sibling_group_size);
            layout.children.push(entries);
        }

        debug!(
            groups = layout.groups.len(),
            chains = layout.chain_heads.len(),
            "Computed autogroups"
        );
        layout
    }

    fn push_group(&mut self, tree: &SpanTree, kind: GroupKind, members: Vec<NodeId>) -> GroupId {
        let id = GroupId::new(self.groups.len() as u32);
        let span: &Span = &tree.node(members[0]).span;
        let op = span.op.clone();
        let description = span.description.clone();
        for m in &members {
            self.membership[m.index()] = Some(id);
        }
        if kind == GroupKind::Descendants {
            self.chain_heads.insert(members[0], id);
        }
        self.groups.push(SpanGroup {
            id,
            kind,
            label: group_label(kind, op.as_deref(), description.as_deref()),
            members,
            op,
            description,
        });
        id
    }

    fn group_siblings(&mut self, tree: &SpanTree, parent: NodeId, min_size: usize) -> Vec<ChildEntry> {
        let children = &tree.node(parent).children;
        let mut entries = Vec::with_capacity(children.len());
        let mut run: Vec<NodeId> = Vec::new();

        let flush = |layout: &mut GroupLayout, run: &mut Vec<NodeId>, entries: &mut Vec<ChildEntry>| {
            if run.len() >= min_size {
                let id = layout.push_group(tree, GroupKind::Siblings, std::mem::take(run));
                entries.push(ChildEntry::Group(id));
            } else {
                entries.extend(run.drain(..).map(ChildEntry::Node));
            }
        };

        for &child in children {
            let node = tree.node(child);
            let groupable = node.is_leaf() && self.membership[child.index()].is_none();
            if !groupable {
                flush(self, &mut run, &mut entries);
                entries.push(ChildEntry::Node(child));
                continue;
            }
            if let Some(&first) = run.first() {
                if !tree.node(first).span.same_shape(&node.span) {
                    flush(self, &mut run, &mut entries);
                }
            }
            run.push(child);
        }
        flush(self, &mut run, &mut entries);
        entries
    }

    /// All groups, indexed by `GroupId`
    pub fn groups(&self) -> &[SpanGroup] {
        &self.groups
    }

    /// Group by id
    pub fn group(&self, id: GroupId) -> Option<&SpanGroup> {
        self.groups.get(id.index())
    }

    /// Number of groups
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether no group was found
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Children of `node` with sibling runs folded into groups
    pub fn children(&self, node: NodeId) -> &[ChildEntry] {
        &self.children[node.index()]
    }

    /// Descendant group headed by `node`, if any
    pub fn chain_headed_by(&self, node: NodeId) -> Option<&SpanGroup> {
        self.chain_heads.get(&node).map(|id| &self.groups[id.index()])
    }

    /// Group `node` belongs to, if any
    pub fn group_of(&self, node: NodeId) -> Option<GroupId> {
        self.membership.get(node.index()).copied().flatten()
    }
}

/// Longest chain of identical single-child spans starting at `head`
fn collect_chain(tree: &SpanTree, head: NodeId) -> Vec<NodeId> {
    let head_span = &tree.node(head).span;
    let mut chain = vec![head];
    let mut current = head;
    loop {
        let node = tree.node(current);
        if node.children.len() != 1 {
            break;
        }
        let child = node.children[0];
        if !tree.node(child).span.same_shape(head_span) {
            break;
        }
        chain.push(child);
        current = child;
    }
    chain
}
