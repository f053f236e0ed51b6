//! Span and trace event types
//!
//! A [`TraceEvent`] is the input to the waterfall engine: the trace's own
//! root operation plus a flat list of [`Span`]s linked by `parent_span_id`.
//! [`Gap`] is the synthetic interval of missing instrumentation the tree
//! builder inserts between spans.
//!
//! Timestamps are floating-point seconds. Both types deserialize from the
//! usual JSON event shape, where the end of a span is called `timestamp`.

use crate::error::{WaterfallError, WaterfallResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Span
// ============================================================================

/// A single timed unit of work within a trace
///
/// `tags` and `data` are carried through to rows untouched; the engine never
/// interprets them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    /// Opaque id, unique within a trace
    pub span_id: String,
    /// Parent span id; `None` only for the synthetic root
    #[serde(default)]
    pub parent_span_id: Option<String>,
    /// Operation name (e.g. `http.client`)
    #[serde(default)]
    pub op: Option<String>,
    /// Free-form description
    #[serde(default)]
    pub description: Option<String>,
    /// Start time in seconds
    pub start_timestamp: f64,
    /// End time in seconds
    #[serde(alias = "timestamp")]
    pub end_timestamp: f64,
    /// Opaque tags
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,
    /// Opaque data payload
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub data: serde_json::Map<String, serde_json::Value>,
}

impl Span {
    /// Create a span with the given id and time range
    pub fn new(span_id: impl Into<String>, start_timestamp: f64, end_timestamp: f64) -> Self {
        Span {
            span_id: span_id.into(),
            parent_span_id: None,
            op: None,
            description: None,
            start_timestamp,
            end_timestamp,
            tags: BTreeMap::new(),
            data: serde_json::Map::new(),
        }
    }

    /// Builder: set parent span id
    pub fn with_parent(mut self, parent_span_id: impl Into<String>) -> Self {
        self.parent_span_id = Some(parent_span_id.into());
        self
    }

    /// Builder: set operation name
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Builder: set description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: add a tag
    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// Builder: add a data entry
    pub fn with_data(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.data.insert(key.into(), value);
        self
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.end_timestamp - self.start_timestamp
    }

    /// Whether two spans share operation and description
    ///
    /// A missing field only equals another missing field.
    pub fn same_shape(&self, other: &Span) -> bool {
        self.op == other.op && self.description == other.description
    }

    /// Reject non-finite timestamps and spans that end before they start
    pub fn validate(&self) -> WaterfallResult<()> {
        validate_range(&self.span_id, self.start_timestamp, self.end_timestamp)
    }
}

fn validate_range(span_id: &str, start: f64, end: f64) -> WaterfallResult<()> {
    if !start.is_finite() || !end.is_finite() {
        return Err(WaterfallError::invalid_span(
            span_id,
            "timestamps must be finite",
        ));
    }
    if end < start {
        return Err(WaterfallError::invalid_span(
            span_id,
            format!("ends at {} before it starts at {}", end, start),
        ));
    }
    Ok(())
}

// ============================================================================
// TraceEvent
// ============================================================================

/// One trace: the root operation and its flat span list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    /// Span id of the trace root; spans point at it to become top-level
    pub span_id: String,
    /// Trace id, informational only
    #[serde(default)]
    pub trace_id: Option<String>,
    /// Root operation name
    #[serde(default)]
    pub op: Option<String>,
    /// Root description (usually the transaction name)
    #[serde(default, alias = "transaction")]
    pub description: Option<String>,
    /// Root start time in seconds
    pub start_timestamp: f64,
    /// Root end time in seconds
    #[serde(alias = "timestamp")]
    pub end_timestamp: f64,
    /// All non-root spans, in any order
    #[serde(default)]
    pub spans: Vec<Span>,
}

impl TraceEvent {
    /// Create an event with no spans
    pub fn new(span_id: impl Into<String>, start_timestamp: f64, end_timestamp: f64) -> Self {
        TraceEvent {
            span_id: span_id.into(),
            trace_id: None,
            op: None,
            description: None,
            start_timestamp,
            end_timestamp,
            spans: Vec::new(),
        }
    }

    /// Builder: set root operation
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Builder: set root description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Builder: set trace id
    pub fn with_trace_id(mut self, trace_id: impl Into<String>) -> Self {
        self.trace_id = Some(trace_id.into());
        self
    }

    /// Builder: append a span
    pub fn with_span(mut self, span: Span) -> Self {
        self.spans.push(span);
        self
    }

    /// Builder: append many spans
    pub fn with_spans(mut self, spans: impl IntoIterator<Item = Span>) -> Self {
        self.spans.extend(spans);
        self
    }

    /// Decode an event from its JSON form
    pub fn from_json(json: &str) -> WaterfallResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The synthetic root span wrapping the trace's own operation
    pub fn root_span(&self) -> Span {
        Span {
            span_id: self.span_id.clone(),
            parent_span_id: None,
            op: self.op.clone(),
            description: self.description.clone(),
            start_timestamp: self.start_timestamp,
            end_timestamp: self.end_timestamp,
            tags: BTreeMap::new(),
            data: serde_json::Map::new(),
        }
    }

    /// Validate the root and every span
    pub fn validate(&self) -> WaterfallResult<()> {
        validate_range(&self.span_id, self.start_timestamp, self.end_timestamp)?;
        for span in &self.spans {
            span.validate()?;
        }
        Ok(())
    }
}

// ============================================================================
// Gap
// ============================================================================

/// Interval of missing instrumentation inside a parent span
///
/// Gaps carry no span id; they are never filter or grouping targets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gap {
    /// Where the gap starts (previous sibling's end or the parent's start)
    pub start_timestamp: f64,
    /// Where the gap ends (the next child's start)
    pub end_timestamp: f64,
    /// Whether the span following the gap is an orphan
    pub is_orphan: bool,
}

impl Gap {
    /// Description shown for every gap row
    pub const DESCRIPTION: &'static str = "Missing instrumentation";

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        self.end_timestamp - self.start_timestamp
    }
}
