//! Tier 4: Windowing
//!
//! Windowing reclassifies rows in place; it never drops or reorders them.

use crate::common::*;
use std::sync::Arc;
use waterfall::ViewWindow;

/// Four back-to-back spans covering quarters of a 4s trace
fn quarters() -> TraceEvent {
    TraceEvent::new("root", 0.0, 4.0).with_spans(vec![
        Span::new("q0", 0.0, 1.0).with_parent("root").with_op("db"),
        Span::new("q1", 1.0, 2.0).with_parent("root").with_op("http"),
        Span::new("q2", 2.0, 3.0).with_parent("root").with_op("db"),
        Span::new("q3", 3.0, 4.0).with_parent("root").with_op("http"),
    ])
}

#[test]
fn test_tier4_window_keeps_length_and_order() {
    let mut m = model(&quarters());
    let full = m.get_waterfall(0.0, 1.0).unwrap();
    let windowed = m.get_waterfall(0.6, 0.7).unwrap();
    assert_eq!(full.len(), windowed.len());
    assert_eq!(span_ids(&full), span_ids(&windowed));
    assert_eq!(
        kinds(&windowed),
        vec![
            RowKind::RootSpan,
            RowKind::OutOfView,
            RowKind::OutOfView,
            RowKind::Span,
            RowKind::OutOfView,
        ]
    );
}

#[test]
fn test_tier4_out_of_view_keeps_payload() {
    let mut m = model(&quarters());
    let full = m.get_waterfall(0.0, 1.0).unwrap();
    let windowed = m.get_waterfall(0.0, 0.1).unwrap();
    for (a, b) in full.iter().zip(windowed.iter()) {
        assert!(Arc::ptr_eq(&a.item, &b.item));
    }
}

#[test]
fn test_tier4_window_round_trip() {
    let mut m = model(&quarters());
    let before = snapshot(&m.get_waterfall(0.0, 1.0).unwrap());
    m.get_waterfall(0.3, 0.4).unwrap();
    let after = snapshot(&m.get_waterfall(0.0, 1.0).unwrap());
    assert_eq!(before, after);
}

#[test]
fn test_tier4_touching_edge_is_in_view() {
    let mut m = model(&quarters());
    let rows = m.get_waterfall(0.25, 0.25).unwrap();
    assert_eq!(rows[1].kind, RowKind::Span);
    assert_eq!(rows[2].kind, RowKind::Span);
    assert_eq!(rows[3].kind, RowKind::OutOfView);
}

#[test]
fn test_tier4_filtered_wins_over_out_of_view() {
    let mut m = model(&quarters());
    m.toggle_operation_name_filter("http");
    let rows = m.get_waterfall(0.75, 1.0).unwrap();
    // q0 is both filtered and out of view
    assert_eq!(rows[1].kind, RowKind::FilteredOut);
    assert_eq!(rows[2].kind, RowKind::OutOfView);
    assert_eq!(rows[4].kind, RowKind::Span);
}

#[test]
fn test_tier4_root_never_windowed() {
    let mut m = model(&quarters());
    let rows = m.get_waterfall(0.9, 1.0).unwrap();
    assert_eq!(rows[0].kind, RowKind::RootSpan);
}

#[test]
fn test_tier4_gap_windowed() {
    let event = TraceEvent::new("root", 0.0, 4.0).with_spans(vec![
        Span::new("a", 0.0, 1.0).with_parent("root").with_op("db"),
        Span::new("b", 3.0, 4.0).with_parent("root").with_op("db"),
    ]);
    let mut m = model(&event);
    let rows = m.get_waterfall(0.9, 1.0).unwrap();
    assert_eq!(
        kinds(&rows),
        vec![
            RowKind::RootSpan,
            RowKind::OutOfView,
            RowKind::OutOfView,
            RowKind::Span,
        ]
    );
    assert_eq!(rows[2].description(), Some(waterfall::Gap::DESCRIPTION));
}

#[test]
fn test_tier4_collapsed_group_extent_is_member_union() {
    let mut m = model(&two_group_event());
    // b-group covers [0.3, 0.55] of a 1s trace
    let rows = m.get_waterfall(0.5, 0.52).unwrap();
    let groups: Vec<RowKind> = rows
        .iter()
        .filter(|r| r.autogroup().is_some())
        .map(|r| r.kind)
        .collect();
    assert_eq!(groups, vec![RowKind::OutOfView, RowKind::Autogroup]);
}

#[test]
fn test_tier4_zero_duration_trace_all_in_view() {
    let event = TraceEvent::new("root", 1.0, 1.0)
        .with_span(Span::new("a", 1.0, 1.0).with_parent("root").with_op("db"));
    let mut m = model(&event);
    let rows = m.get_waterfall(0.5, 0.6).unwrap();
    assert_eq!(rows[1].kind, RowKind::Span);
}

#[test]
fn test_tier4_invalid_windows_rejected() {
    let mut m = model(&quarters());
    for (start, end) in [(0.5, 0.4), (-0.1, 0.5), (0.0, 1.1), (f64::NAN, 1.0)] {
        let err = m.get_waterfall(start, end).unwrap_err();
        assert!(matches!(err, WaterfallError::InvalidWindow { .. }));
    }
    assert!(ViewWindow::new(0.2, 0.2).is_ok());
}

#[test]
fn test_tier4_projection_cached_per_window() {
    let mut m = model(&quarters());
    let a = m.get_waterfall(0.1, 0.2).unwrap();
    let b = m.get_waterfall(0.1, 0.2).unwrap();
    assert!(Arc::ptr_eq(&a, &b));
    let c = m.get_waterfall(0.1, 0.3).unwrap();
    assert!(!Arc::ptr_eq(&a, &c));
}
