mod common;

use common::*;
use dropmap_core::telemetry::{parse_log, SampleKind, StartReference, DEFAULT_MAP};
use dropmap_core::types::GamePoint;
use dropmap_core::{MatchTimeline, TraceError};
use serde_json::{json, Value};

fn timeline(events: Vec<Value>) -> MatchTimeline {
    init_tracing();
    let bytes = Value::Array(events).to_string();
    MatchTimeline::new(parse_log(bytes.as_bytes()).unwrap())
}

#[test]
fn test_scenario_times_are_positive_and_ordered() {
    let timeline = timeline(scenario());
    assert!(matches!(
        timeline.start_reference(),
        StartReference::MatchStart(_)
    ));
    assert_eq!(timeline.map_name(), "Erangel_Main");

    let samples = timeline.player_samples("Alice");
    assert!(samples.iter().all(|s| s.time > 0.0));
    assert!(samples.windows(2).all(|w| w[0].time <= w[1].time));
    // the lobby position before match start is gone
    assert!(samples
        .iter()
        .all(|s| s.location != GamePoint::new(500.0, 500.0)));

    let deaths: Vec<_> = samples
        .iter()
        .filter(|s| s.kind == SampleKind::Death)
        .collect();
    assert_eq!(deaths.len(), 1);
    assert_eq!(deaths[0].time, 30.0);
}

#[test]
fn test_missing_match_start_falls_back_to_earliest_event() {
    let events: Vec<Value> = scenario()
        .into_iter()
        .filter(|event| event["_T"] != "LogMatchStart")
        .collect();
    let timeline = timeline(events);

    // the earliest timestamped event is the lobby position at -5 s
    match timeline.start_reference() {
        StartReference::EarliestEvent(at) => {
            assert_eq!(at.to_rfc3339(), "2024-03-01T09:59:55+00:00")
        }
        other => panic!("unexpected start reference {:?}", other),
    }

    let samples = timeline.player_samples("Alice");
    assert!(samples.iter().all(|s| s.time > 0.0));
    assert_eq!(samples[0].time, 6.0);
    // no record names the map
    assert_eq!(timeline.map_name(), DEFAULT_MAP);
}

#[test]
fn test_roster_puts_requested_player_first() {
    let timeline = timeline(scenario());
    assert_eq!(timeline.roster("Bob").unwrap(), vec!["Bob", "Alice"]);
    assert_eq!(timeline.roster("Eve").unwrap(), vec!["Eve"]);
    assert!(matches!(
        timeline.roster("Mallory"),
        Err(TraceError::UnknownPlayer(name)) if name == "Mallory"
    ));
}

#[test]
fn test_overlay_queries() {
    let timeline = timeline(scenario());

    let kills = timeline.kills();
    assert_eq!(kills.len(), 2);
    assert_eq!(kills[0].victim_name, "Eve");
    assert_eq!(kills[0].killer_name.as_deref(), Some("Alice"));

    let zones = timeline.safe_zones();
    assert_eq!(zones.len(), 2);
    assert_eq!(zones[0].radius, 3000.0);

    assert_eq!(
        timeline.care_packages(),
        vec![GamePoint::new(1000.0, 7000.0)]
    );
    assert_eq!(
        timeline.emergency_pickups(&["Bob".to_string()]),
        vec![GamePoint::new(2600.0, 3000.0)]
    );
    assert!(timeline
        .emergency_pickups(&["Alice".to_string()])
        .is_empty());
}

#[test]
fn test_unknown_and_incomplete_records_are_skipped() {
    let events = parse_log(
        json!([
            { "_T": "LogVehicleRide", "vehicle": {} },
            { "_T": "LogPlayerPosition", "_D": stamp(1.0), "character": { "name": "A" } },
            position("A", 1.0, 2.0, 2.0),
        ])
        .to_string()
        .as_bytes(),
    )
    .unwrap();
    assert_eq!(events.len(), 1);
}

#[test]
fn test_malformed_documents_fail() {
    assert!(matches!(
        parse_log(b"{\"_T\": \"LogMatchStart\"}"),
        Err(TraceError::MalformedTelemetry(_))
    ));
    assert!(matches!(
        parse_log(b"[1, 2, 3]"),
        Err(TraceError::MalformedTelemetry(_))
    ));
    assert!(matches!(
        parse_log(b"not json"),
        Err(TraceError::TelemetryJson(_))
    ));
}
