//! Tier 5: Scenarios
//!
//! Expand/collapse walkthroughs as a user would drive them.

use crate::common::*;

#[test]
fn test_tier5_five_siblings_expand_and_collapse() {
    let mut m = model(&sibling_event(5));
    assert_eq!(rows(&mut m).len(), 2);

    let id = m.groups()[0].id;
    m.toggle_span_group(id).unwrap();
    let expanded = rows(&mut m);
    assert_eq!(expanded.len(), 6);
    assert_eq!(count_description(&expanded, "group me"), 5);
    assert!(expanded[1..].iter().all(|r| r.group_id() == Some(id)));

    m.toggle_span_group(id).unwrap();
    assert_eq!(rows(&mut m).len(), 2);
}

#[test]
fn test_tier5_chain_of_six_shows_one_label() {
    let mut m = model(&chain_event(6));
    let rows = rows(&mut m);
    let labels: Vec<&str> = rows
        .iter()
        .filter_map(|r| r.autogroup().map(|g| g.label.as_str()))
        .collect();
    assert_eq!(labels, vec!["Autogrouped — db —"]);
    assert_eq!(count_description(&rows, "nested"), 1);
}

#[test]
fn test_tier5_two_groups_counts() {
    let mut m = model(&two_group_event());
    let ids: Vec<GroupId> = m.groups().iter().map(|g| g.id).collect();

    let mut counts = vec![count_description(&rows(&mut m), "group me")];
    m.toggle_span_group(ids[0]).unwrap();
    counts.push(count_description(&rows(&mut m), "group me"));
    m.toggle_span_group(ids[1]).unwrap();
    counts.push(count_description(&rows(&mut m), "group me"));
    m.toggle_span_group(ids[0]).unwrap();
    counts.push(count_description(&rows(&mut m), "group me"));
    m.toggle_span_group(ids[1]).unwrap();
    counts.push(count_description(&rows(&mut m), "group me"));

    assert_eq!(counts, vec![2, 6, 10, 6, 2]);
}

#[test]
fn test_tier5_expand_to_span_inside_chain() {
    let mut event = chain_event(4);
    event.spans.extend((0..5).map(|i| {
        leaf(
            &format!("leaf{}", i),
            "c3",
            i as f64 * 0.05,
            "http",
            "group me",
        )
    }));
    let mut m = model(&event);
    assert!(m.toggle_span_subtree("c3").unwrap());
    assert!(!span_ids(&rows(&mut m)).contains(&"leaf2".to_string()));

    assert!(m.expand_to_span("leaf2").unwrap());
    let rows = rows(&mut m);
    assert!(span_ids(&rows).contains(&"leaf2".to_string()));
    assert!(span_ids(&rows).contains(&"c3".to_string()));
    assert!(!m.expand_to_span("leaf2").unwrap());
}

#[test]
fn test_tier5_focused_span_opens_group() {
    let options = WaterfallOptions {
        focused_span_ids: vec!["b1".to_string()],
        ..WaterfallOptions::with_config(sync_config())
    };
    let mut m = model_with(&two_group_event(), options);
    assert!(!m.is_group_expanded(GroupId::new(0)));
    assert!(m.is_group_expanded(GroupId::new(1)));
    assert_eq!(count_description(&rows(&mut m), "group me"), 6);
}

#[test]
fn test_tier5_subtree_toggle_round_trip() {
    let event = TraceEvent::new("root", 0.0, 1.0).with_spans(vec![
        leaf("parent", "root", 0.0, "http", "p"),
        leaf("child", "parent", 0.0, "db", "c"),
        leaf("grandchild", "child", 0.0, "db", "g"),
    ]);
    let mut m = model(&event);
    let before = snapshot(&rows(&mut m));

    assert!(m.toggle_span_subtree("parent").unwrap());
    assert_eq!(span_ids(&rows(&mut m)), vec!["root", "parent"]);

    assert!(!m.toggle_span_subtree("parent").unwrap());
    assert_eq!(snapshot(&rows(&mut m)), before);

    assert!(matches!(
        m.toggle_span_subtree("ghost"),
        Err(WaterfallError::UnknownSpan(_))
    ));
}
