//! Tier 8: Input and Config
//!
//! JSON trace events and TOML configuration end to end.

use crate::common::*;
use waterfall::CONFIG_FILE_NAME;

const EVENT_JSON: &str = r#"{
    "span_id": "a000000000000000",
    "trace_id": "8988cec7cc0779c1",
    "op": "pageload",
    "transaction": "/organizations/:orgId/issues/",
    "start_timestamp": 1622079935.0,
    "timestamp": 1622079940.0,
    "spans": [
        {
            "span_id": "b000000000000000",
            "parent_span_id": "a000000000000000",
            "op": "http",
            "description": "GET /api/0/organizations/",
            "start_timestamp": 1622079935.0,
            "timestamp": 1622079936.0,
            "tags": {"status": "ok"}
        },
        {
            "span_id": "c000000000000000",
            "parent_span_id": "b000000000000000",
            "op": "db",
            "description": "SELECT * FROM organizations",
            "start_timestamp": 1622079935.2,
            "timestamp": 1622079935.8,
            "data": {"rows": 3}
        },
        {
            "span_id": "d000000000000000",
            "parent_span_id": "ffffffffffffffff",
            "op": "resource",
            "description": "app.js",
            "start_timestamp": 1622079937.0,
            "timestamp": 1622079938.0
        }
    ]
}"#;

#[test]
fn test_tier8_json_event_projects() {
    let event = TraceEvent::from_json(EVENT_JSON).unwrap();
    let mut m = model(&event);
    let rows = rows(&mut m);
    let ids = span_ids(&rows);
    assert_eq!(
        ids,
        vec![
            "a000000000000000",
            "b000000000000000",
            "c000000000000000",
            "d000000000000000",
        ]
    );
    assert_eq!(rows[0].description(), Some("/organizations/:orgId/issues/"));
    assert_eq!(m.tree().orphan_count(), 1);
    // c starts 0.2s into b, d starts 1s after everything before it
    assert_eq!(count_description(&rows, waterfall::Gap::DESCRIPTION), 2);
}

#[test]
fn test_tier8_event_from_json_value() {
    let value = serde_json::json!({
        "span_id": "root",
        "start_timestamp": 0.0,
        "timestamp": 2.0,
        "spans": [
            {"span_id": "a", "parent_span_id": "root", "op": "http",
             "start_timestamp": 0.0, "timestamp": 1.0},
            {"span_id": "b", "parent_span_id": "root",
             "start_timestamp": 1.0, "timestamp": 2.0}
        ]
    });
    let event: TraceEvent = serde_json::from_value(value).unwrap();
    let mut m = model(&event);
    assert_eq!(span_ids(&rows(&mut m)), vec!["root", "a", "b"]);

    // every op selected: the span without one still shows
    m.toggle_all_operation_name_filters();
    let filtered = rows(&mut m);
    assert!(filtered.iter().all(|r| r.kind != RowKind::FilteredOut));

    let round_trip: TraceEvent = serde_json::from_value(serde_json::to_value(&event).unwrap()).unwrap();
    assert_eq!(round_trip, event);
}

#[test]
fn test_tier8_opaque_fields_survive() {
    let event = TraceEvent::from_json(EVENT_JSON).unwrap();
    let mut m = model(&event);
    let rows = rows(&mut m);
    let b = rows
        .iter()
        .find_map(|r| r.span().filter(|s| s.span_id == "b000000000000000"))
        .unwrap();
    assert_eq!(b.tags.get("status").map(String::as_str), Some("ok"));
}

#[test]
fn test_tier8_malformed_json() {
    let err = TraceEvent::from_json("{\"span_id\": 3}").unwrap_err();
    assert!(matches!(err, WaterfallError::Serialization(_)));
}

#[test]
fn test_tier8_config_from_toml() {
    let config = WaterfallConfig::from_toml_str(
        r#"
gap_threshold_secs = 2.0
min_sibling_group_size = 3

[search]
background_index = false
"#,
    )
    .unwrap();
    assert_eq!(config.min_chain_group_size, 3);

    let mut m = model_with(&sibling_event(3), WaterfallOptions::with_config(config));
    assert!(m.is_search_ready());
    assert_eq!(m.groups().len(), 1);
    assert_eq!(rows(&mut m).len(), 2);
}

#[test]
fn test_tier8_config_threshold_suppresses_gaps() {
    let config = WaterfallConfig {
        gap_threshold_secs: 5.0,
        ..sync_config()
    };
    let event = TraceEvent::from_json(EVENT_JSON).unwrap();
    let mut m = model_with(&event, WaterfallOptions::with_config(config));
    assert_eq!(count_description(&rows(&mut m), waterfall::Gap::DESCRIPTION), 0);
}

#[test]
fn test_tier8_bad_config_rejected() {
    let err = WaterfallConfig::from_toml_str("gap_threshold_secs = -1.0").unwrap_err();
    assert!(matches!(err, WaterfallError::InvalidConfig(_)));

    let err = WaterfallConfig::from_toml_str("gap_threshold_secs = \"soon\"").unwrap_err();
    assert!(matches!(err, WaterfallError::ConfigParse(_)));
}

#[test]
fn test_tier8_default_toml_round_trip() {
    assert_eq!(CONFIG_FILE_NAME, "waterfall.toml");
    let parsed = WaterfallConfig::from_toml_str(WaterfallConfig::default_toml()).unwrap();
    assert_eq!(parsed, WaterfallConfig::default());
}
