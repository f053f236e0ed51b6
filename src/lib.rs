//! Waterfall - span waterfall engine for trace views
//!
//! Turns one trace event (a root operation plus a flat list of spans) into
//! the rows of a waterfall: a tree with gaps of missing instrumentation,
//! collapsible autogroups, operation-name and text filters, and a viewport
//! over the trace's time range.
//!
//! # Quick Start
//!
//! ```
//! use waterfall::{RowKind, Span, TraceEvent, WaterfallConfig, WaterfallModel, WaterfallOptions};
//!
//! let event = TraceEvent::new("root", 0.0, 1.0)
//!     .with_op("pageload")
//!     .with_span(Span::new("a1", 0.0, 0.5).with_parent("root").with_op("http"));
//!
//! let config = WaterfallConfig::default().with_synchronous_search();
//! let mut model = WaterfallModel::with_options(&event, WaterfallOptions::with_config(config))?;
//!
//! let rows = model.get_waterfall(0.0, 1.0)?;
//! assert_eq!(rows[0].kind, RowKind::RootSpan);
//! assert_eq!(rows[1].span_id(), Some("a1"));
//! # Ok::<(), waterfall::WaterfallError>(())
//! ```
//!
//! # Architecture
//!
//! - `waterfall-core`: data model, errors, configuration
//! - `waterfall-search`: span text index with a background build
//! - `waterfall-engine`: tree, grouping, filtering, windowing, projection

pub use waterfall_core::{
    Gap, GroupId, SearchConfig, Span, TraceEvent, WaterfallConfig, WaterfallError,
    WaterfallResult, CONFIG_FILE_NAME,
};
pub use waterfall_engine::*;
pub use waterfall_search::{IndexPhase, MatchedField, SearchMatch};
