//! Sync triggers: connect, manual requests, coalescing and timeouts.

use schedule_engine::app::commands::EngineCommand;
use schedule_engine::app::events::EngineEvent;
use schedule_engine::config::EngineConfig;
use schedule_engine::schedule::ScheduleKind;
use schedule_engine::sync::CandidateSchedule;

use crate::mock_hw::{Engine, MockFlash, RecordingSink, engine, heating_config};

const PAYLOAD: &str = r#"{"entries": [
    {"from": "08:00", "to": "09:00", "data": {"setpoint": 21}},
    {"from": "20:00:00", "to": "01:00:00", "data": {"setpoint": "18.0"}}
]}"#;

fn synced(flash: &MockFlash, config: EngineConfig, sink: &mut RecordingSink) -> Engine {
    let mut svc = engine(config, flash, Some(0));
    let candidate = CandidateSchedule::from_json(ScheduleKind::Interval, PAYLOAD).unwrap();
    svc.handle_command(EngineCommand::ApplySchedule(candidate), sink)
        .unwrap();
    svc
}

fn requests(sink: &RecordingSink) -> usize {
    sink.count(|e| matches!(e, EngineEvent::SyncRequested))
}

#[test]
fn first_boot_requests_on_connect() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(heating_config(), &flash, Some(0));

    svc.handle_command(EngineCommand::SourceConnected, &mut sink).unwrap();
    assert_eq!(requests(&sink), 1);
    assert!(svc.is_sync_in_flight());
    assert_eq!(svc.source_mut().requests(), ["schedule.heating".to_owned()]);
}

#[test]
fn json_payload_applies_and_clears_in_flight() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(heating_config(), &flash, Some(0));
    svc.handle_command(EngineCommand::SourceConnected, &mut sink).unwrap();

    let candidate = CandidateSchedule::from_json(ScheduleKind::Interval, PAYLOAD).unwrap();
    svc.handle_command(EngineCommand::ApplySchedule(candidate), &mut sink)
        .unwrap();
    assert!(!svc.is_sync_in_flight());
    assert_eq!(svc.schedule().len(), 2);
    assert!(sink.events.contains(&EngineEvent::SyncApplied { entries: 2 }));
}

#[test]
fn valid_stored_schedule_skips_connect_request() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    drop(synced(&flash, heating_config(), &mut sink));

    let mut svc = engine(heating_config(), &flash, Some(0));
    sink.take();
    svc.handle_command(EngineCommand::SourceConnected, &mut sink).unwrap();
    assert_eq!(requests(&sink), 0);
}

#[test]
fn update_on_reconnect_requests_every_connect() {
    let config = EngineConfig {
        update_on_reconnect: true,
        ..heating_config()
    };
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = synced(&flash, config, &mut sink);
    sink.take();

    for _ in 0..2 {
        svc.handle_command(EngineCommand::SourceConnected, &mut sink).unwrap();
        svc.handle_command(EngineCommand::SourceDisconnected, &mut sink).unwrap();
    }
    assert_eq!(requests(&sink), 2);
    assert!(!svc.is_sync_in_flight());
}

#[test]
fn concurrent_triggers_coalesce() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(heating_config(), &flash, Some(0));

    svc.handle_command(EngineCommand::SourceConnected, &mut sink).unwrap();
    svc.handle_command(EngineCommand::RequestSync, &mut sink).unwrap();
    svc.handle_command(EngineCommand::RequestSync, &mut sink).unwrap();
    assert_eq!(requests(&sink), 1);
    assert_eq!(svc.source_mut().drain().len(), 1);
}

#[test]
fn unanswered_request_times_out() {
    let config = EngineConfig {
        sync_timeout_ticks: 3,
        ..heating_config()
    };
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(config, &flash, Some(0));
    svc.handle_command(EngineCommand::RequestSync, &mut sink).unwrap();
    assert!(svc.is_sync_in_flight());

    svc.tick(&mut sink);
    svc.tick(&mut sink);
    assert!(svc.is_sync_in_flight());
    svc.tick(&mut sink);
    assert!(!svc.is_sync_in_flight());
    assert_eq!(sink.count(|e| matches!(e, EngineEvent::SyncTimedOut)), 1);

    // A fresh trigger goes out again.
    svc.handle_command(EngineCommand::RequestSync, &mut sink).unwrap();
    assert_eq!(requests(&sink), 2);
}

#[test]
fn offline_source_leaves_nothing_in_flight() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(heating_config(), &flash, Some(0));
    svc.source_mut().set_connected(false);

    svc.handle_command(EngineCommand::RequestSync, &mut sink).unwrap();
    assert!(!svc.is_sync_in_flight());
    assert_eq!(requests(&sink), 0);
}

#[test]
fn rejected_candidate_answers_the_request() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(heating_config(), &flash, Some(0));
    svc.handle_command(EngineCommand::RequestSync, &mut sink).unwrap();

    // Missing the setpoint channel.
    let bad = CandidateSchedule::from_json(
        ScheduleKind::Interval,
        r#"{"entries": [{"from": "08:00", "to": "09:00"}]}"#,
    )
    .unwrap();
    assert!(svc.handle_command(EngineCommand::ApplySchedule(bad), &mut sink).is_err());
    assert!(!svc.is_sync_in_flight());
    assert!(svc.schedule().is_empty());
}
