//! Waterfall engine for trace views
//!
//! This crate turns one trace event into display rows:
//! - SpanTree: canonical tree with gaps, orphans and connector metadata
//! - GroupLayout: sibling and descendant autogroups
//! - FilterState: operation-name and text filters
//! - ViewWindow: fractional viewport over the trace
//! - WaterfallModel: projection with memoization
//! - WaterfallStore: lock-protected model with change subscribers
//!
//! The canonical tree and groups are built once per trace. Every toggle,
//! filter and window only changes view state.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod filter;
pub mod grouping;
pub mod model;
pub mod projection;
pub mod row;
pub mod store;
pub mod tree;
pub mod window;

pub use filter::{FilterSpans, FilterState, OperationNameFilter};
pub use grouping::{group_label, ChildEntry, GroupKind, GroupLayout, SpanGroup};
pub use model::{WaterfallModel, WaterfallOptions};
pub use projection::Expansion;
pub use row::{AutogroupRow, GapRow, Row, RowItem, RowKind, SpanRow};
pub use store::{SubscriptionId, WaterfallChange, WaterfallStore, WaterfallSubscriber};
pub use tree::{ContinuingDepths, NodeId, SpanNode, SpanTree, TraceBounds};
pub use window::{classify, ViewWindow, Visibility};
