//! Tier 1: Tree Construction
//!
//! Ordering, orphans, gaps and determinism of the canonical tree.

use crate::common::*;
use waterfall::{Gap, NodeId, RowItem};

// ============================================================================
// Ordering and depth
// ============================================================================

#[test]
fn test_tier1_root_only_trace() {
    let mut m = model(&TraceEvent::new("root", 0.0, 1.0).with_op("pageload"));
    let rows = rows(&mut m);
    assert_eq!(kinds(&rows), vec![RowKind::RootSpan]);
    assert_eq!(rows[0].tree_depth(), 0);
}

#[test]
fn test_tier1_children_ordered_by_start() {
    let event = TraceEvent::new("root", 0.0, 1.0).with_spans(vec![
        leaf("late", "root", 0.3, "db", "x"),
        leaf("early", "root", 0.0, "db", "y"),
        leaf("tie", "root", 0.3, "db", "z"),
    ]);
    let mut m = model(&event);
    assert_eq!(span_ids(&rows(&mut m)), vec!["root", "early", "late", "tie"]);
}

#[test]
fn test_tier1_connector_metadata() {
    let event = TraceEvent::new("root", 0.0, 1.0).with_spans(vec![
        Span::new("a", 0.0, 0.5).with_parent("root").with_op("x"),
        Span::new("a1", 0.0, 0.2).with_parent("a").with_op("y"),
        Span::new("a2", 0.2, 0.5).with_parent("a").with_op("z"),
        Span::new("b", 0.5, 1.0).with_parent("root").with_op("w"),
    ]);
    let mut m = model(&event);
    let rows = rows(&mut m);
    let by_id = |id: &str| rows.iter().find(|r| r.span_id() == Some(id)).unwrap();

    match &*by_id("a").item {
        RowItem::Span(s) => {
            assert_eq!(s.tree_depth, 1);
            assert!(!s.is_last_sibling);
            assert_eq!(s.num_of_span_children, 2);
        }
        other => panic!("unexpected {:?}", other),
    }
    match &*by_id("a2").item {
        RowItem::Span(s) => {
            assert_eq!(s.tree_depth, 2);
            assert!(s.is_last_sibling);
            assert_eq!(s.continuing_tree_depths.as_slice(), &[1]);
        }
        other => panic!("unexpected {:?}", other),
    }
    match &*by_id("b").item {
        RowItem::Span(s) => assert!(s.is_last_sibling),
        other => panic!("unexpected {:?}", other),
    }
}

// ============================================================================
// Orphans
// ============================================================================

#[test]
fn test_tier1_orphan_attached_to_root() {
    let event = TraceEvent::new("root", 0.0, 1.0).with_spans(vec![
        leaf("lost", "nobody", 0.0, "db", "x"),
        leaf("kid", "lost", 0.1, "db", "y"),
    ]);
    let mut m = model(&event);
    assert_eq!(m.tree().orphan_count(), 1);
    let rows = rows(&mut m);
    let lost = rows.iter().find(|r| r.span_id() == Some("lost")).unwrap();
    assert_eq!(lost.tree_depth(), 1);
    match &*lost.item {
        RowItem::Span(s) => assert!(s.is_orphan),
        other => panic!("unexpected {:?}", other),
    }
    let kid = rows.iter().find(|r| r.span_id() == Some("kid")).unwrap();
    assert_eq!(kid.tree_depth(), 2);
}

#[test]
fn test_tier1_parent_cycle_never_drops_spans() {
    let event = TraceEvent::new("root", 0.0, 1.0).with_spans(vec![
        leaf("x", "z", 0.0, "db", "x"),
        leaf("y", "x", 0.1, "db", "y"),
        leaf("z", "y", 0.2, "db", "z"),
    ]);
    let mut m = model(&event);
    assert_eq!(span_ids(&rows(&mut m)).len(), 4);
}

// ============================================================================
// Gaps
// ============================================================================

fn gap_event(second_start: f64) -> TraceEvent {
    TraceEvent::new("root", 0.0, 1.0).with_spans(vec![
        Span::new("a", 0.0, 0.25).with_parent("root").with_op("db"),
        Span::new("b", second_start, 1.0).with_parent("root").with_op("db"),
    ])
}

#[test]
fn test_tier1_gap_above_threshold() {
    let mut m = model(&gap_event(0.5));
    let rows = rows(&mut m);
    assert_eq!(
        kinds(&rows),
        vec![RowKind::RootSpan, RowKind::Span, RowKind::Gap, RowKind::Span]
    );
    assert_eq!(rows[2].description(), Some(Gap::DESCRIPTION));
    assert_eq!(rows[2].time_range(), (0.25, 0.5));
}

#[test]
fn test_tier1_no_gap_at_or_below_threshold() {
    // 0.3125 - 0.25 and 0.375 - 0.25 are exact in binary
    let config = WaterfallConfig {
        gap_threshold_secs: 0.125,
        ..sync_config()
    };
    for start in [0.3125, 0.375] {
        let mut m = model_with(&gap_event(start), WaterfallOptions::with_config(config.clone()));
        assert_eq!(count_description(&rows(&mut m), Gap::DESCRIPTION), 0);
    }
}

#[test]
fn test_tier1_gap_is_never_filtered() {
    let mut m = model(&gap_event(0.5));
    m.toggle_operation_name_filter("http");
    let rows = rows(&mut m);
    assert_eq!(rows[2].kind, RowKind::Gap);
    assert_eq!(rows[1].kind, RowKind::FilteredOut);
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn test_tier1_build_is_deterministic() {
    let event = two_group_event();
    let a = rows(&mut model(&event));
    let b = rows(&mut model(&event));
    assert_eq!(snapshot(&a), snapshot(&b));
}

#[test]
fn test_tier1_tree_accessors() {
    let m = model(&chain_event(2));
    let tree = m.tree();
    assert_eq!(tree.len(), 3);
    let c1 = tree.find("c1").unwrap();
    let ancestors: Vec<NodeId> = tree.ancestors(c1).collect();
    assert_eq!(ancestors.last(), Some(&NodeId::ROOT));
    assert_eq!(m.trace_bounds().duration(), 100.0);
}

#[test]
fn test_tier1_invalid_span_rejected() {
    let event = TraceEvent::new("root", 0.0, 1.0)
        .with_span(Span::new("bad", f64::NAN, 1.0).with_parent("root"));
    let err = WaterfallModel::with_options(&event, WaterfallOptions::with_config(sync_config()))
        .unwrap_err();
    assert!(matches!(err, WaterfallError::InvalidSpan { .. }));
}
