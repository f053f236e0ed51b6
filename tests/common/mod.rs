//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]
#![allow(unused_imports)]

use std::sync::Once;
pub use waterfall::{
    GroupId, OperationNameFilter, Row, RowItem, RowKind, Span, TraceEvent, WaterfallConfig,
    WaterfallError, WaterfallModel, WaterfallOptions, WaterfallStore,
};

// ============================================================================
// Initialization
// ============================================================================

static INIT_TRACING: Once = Once::new();

/// Route library logs to the test harness output.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Default config with the search index built inline.
pub fn sync_config() -> WaterfallConfig {
    WaterfallConfig::default().with_synchronous_search()
}

/// Model for `event` with a synchronously built search index.
pub fn model(event: &TraceEvent) -> WaterfallModel {
    init_tracing();
    WaterfallModel::with_options(event, WaterfallOptions::with_config(sync_config()))
        .expect("valid test event")
}

/// Model for `event` with custom options.
pub fn model_with(event: &TraceEvent, options: WaterfallOptions) -> WaterfallModel {
    init_tracing();
    WaterfallModel::with_options(event, options).expect("valid test event")
}

// ============================================================================
// Event builders
// ============================================================================

/// A leaf span under `parent`, lasting half a second.
pub fn leaf(id: &str, parent: &str, start: f64, op: &str, description: &str) -> Span {
    Span::new(id, start, start + 0.5)
        .with_parent(parent)
        .with_op(op)
        .with_description(description)
}

/// Root with `count` identical adjacent "group me" siblings.
pub fn sibling_event(count: usize) -> TraceEvent {
    TraceEvent::new("root", 0.0, 100.0)
        .with_op("pageload")
        .with_description("/")
        .with_spans((0..count).map(|i| {
            Span::new(format!("s{}", i), i as f64 * 0.05, i as f64 * 0.05 + 0.05)
                .with_parent("root")
                .with_op("http")
                .with_description("group me")
        }))
}

/// Root with a chain of `len` identical nested spans.
pub fn chain_event(len: usize) -> TraceEvent {
    TraceEvent::new("root", 0.0, 100.0)
        .with_op("pageload")
        .with_spans((0..len).map(|i| {
            let parent = if i == 0 {
                "root".to_string()
            } else {
                format!("c{}", i - 1)
            };
            Span::new(format!("c{}", i), 0.0, 100.0 - i as f64)
                .with_parent(parent)
                .with_op("db")
                .with_description("nested")
        }))
}

/// Root with two runs of five "group me" siblings split by another span.
pub fn two_group_event() -> TraceEvent {
    let mut spans: Vec<Span> = (0..5)
        .map(|i| {
            Span::new(format!("a{}", i), i as f64 * 0.05, i as f64 * 0.05 + 0.05)
                .with_parent("root")
                .with_op("http")
                .with_description("group me")
        })
        .collect();
    spans.push(
        Span::new("divider", 0.25, 0.3)
            .with_parent("root")
            .with_op("db")
            .with_description("SELECT * FROM users"),
    );
    spans.extend((0..5).map(|i| {
        Span::new(
            format!("b{}", i),
            0.3 + i as f64 * 0.05,
            0.35 + i as f64 * 0.05,
        )
        .with_parent("root")
        .with_op("http")
        .with_description("group me")
    }));
    TraceEvent::new("root", 0.0, 1.0)
        .with_op("pageload")
        .with_spans(spans)
}

// ============================================================================
// Row helpers
// ============================================================================

/// Full-window rows.
pub fn rows(model: &mut WaterfallModel) -> Vec<Row> {
    model
        .get_waterfall(0.0, 1.0)
        .expect("full window is valid")
        .as_ref()
        .clone()
}

/// Row kinds in order.
pub fn kinds(rows: &[Row]) -> Vec<RowKind> {
    rows.iter().map(|r| r.kind).collect()
}

/// Rows whose description equals `description`.
pub fn count_description(rows: &[Row], description: &str) -> usize {
    rows.iter()
        .filter(|r| r.description() == Some(description))
        .count()
}

/// Span ids of span rows, in order.
pub fn span_ids(rows: &[Row]) -> Vec<String> {
    rows.iter()
        .filter_map(|r| r.span_id().map(str::to_string))
        .collect()
}

/// Row kinds with their payloads, for comparisons that ignore `Arc` identity.
pub fn snapshot(rows: &[Row]) -> Vec<(RowKind, RowItem)> {
    rows.iter().map(|r| (r.kind, (*r.item).clone())).collect()
}
