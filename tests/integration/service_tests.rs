//! ScheduleService integration tests: evaluation, channels and events.

use schedule_engine::app::commands::EngineCommand;
use schedule_engine::app::events::EngineEvent;
use schedule_engine::app::service::EngineStatus;
use schedule_engine::arbiter::{InstantMode, IntervalMode, Mode};
use schedule_engine::channel::{ManualPolicy, OffPolicy, ValueKind};
use schedule_engine::config::{ChannelConfig, EngineConfig};
use schedule_engine::schedule::{ScheduleEntry, ScheduleKind};
use schedule_engine::sync::CandidateSchedule;

use crate::mock_hw::{Engine, MockFlash, RecordingSink, at, engine, heating_config};

fn interval(start: u16, end: u16) -> ScheduleEntry {
    ScheduleEntry::Interval {
        start: at(start),
        end: at(end),
    }
}

fn instant(t: u16) -> ScheduleEntry {
    ScheduleEntry::Instant { at: at(t) }
}

fn heating_schedule() -> CandidateSchedule {
    CandidateSchedule::new(vec![interval(480, 540), interval(1200, 60)])
        .with_channel("setpoint", vec![21.0, 18.0])
}

/// Engine with the heating schedule applied and `Auto` selected.
fn running_heating(flash: &MockFlash, sink: &mut RecordingSink) -> Engine {
    let mut svc = engine(heating_config(), flash, Some(0));
    svc.start(sink);
    svc.handle_command(EngineCommand::ApplySchedule(heating_schedule()), sink)
        .unwrap();
    svc.handle_command(EngineCommand::SetMode(Mode::Interval(IntervalMode::Auto)), sink)
        .unwrap();
    svc
}

fn tick_at(svc: &mut Engine, sink: &mut RecordingSink, minutes: u16) {
    svc.clock_mut().set(Some(at(minutes)));
    svc.tick(sink);
}

// ── Interval evaluation ───────────────────────────────────────

#[test]
fn heating_example_output_and_setpoint() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = running_heating(&flash, &mut sink);

    for (t, on, setpoint) in [(500, true, 21.0), (700, false, 16.0), (1300, true, 18.0), (30, true, 18.0)] {
        tick_at(&mut svc, &mut sink, t);
        assert_eq!(svc.output(), on, "output at {}", t);
        assert_eq!(svc.channel_value("setpoint"), Some(setpoint), "setpoint at {}", t);
    }
    assert_eq!(svc.status(), EngineStatus::Running);
}

#[test]
fn output_changes_are_edge_events() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = running_heating(&flash, &mut sink);
    sink.take();

    for t in [470, 479, 480, 481, 539, 540, 541] {
        tick_at(&mut svc, &mut sink, t);
    }
    let edges: Vec<bool> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            EngineEvent::OutputChanged { on } => Some(*on),
            _ => None,
        })
        .collect();
    assert_eq!(edges, vec![true, false]);
}

#[test]
fn nan_off_policy_reports_nan_outside_intervals() {
    for kind in [ValueKind::U8, ValueKind::U16, ValueKind::I32, ValueKind::F32] {
        let config = EngineConfig {
            channels: vec![ChannelConfig::new("level", kind)],
            ..heating_config()
        };
        let flash = MockFlash::new();
        let mut sink = RecordingSink::new();
        let mut svc = engine(config, &flash, Some(0));
        svc.handle_command(
            EngineCommand::ApplySchedule(
                CandidateSchedule::new(vec![interval(480, 540)]).with_channel("level", vec![7.0]),
            ),
            &mut sink,
        )
        .unwrap();
        svc.handle_command(EngineCommand::SetMode(Mode::Interval(IntervalMode::Auto)), &mut sink)
            .unwrap();

        for t in [0, 479, 540, 1439] {
            tick_at(&mut svc, &mut sink, t);
            assert!(svc.channel_value("level").unwrap().is_nan(), "{:?} at {}", kind, t);
        }
        tick_at(&mut svc, &mut sink, 500);
        assert_eq!(svc.channel_value("level"), Some(7.0));
    }
}

#[test]
fn last_on_value_is_seeded_from_most_recent_entry() {
    let config = EngineConfig {
        channels: vec![ChannelConfig {
            off_policy: OffPolicy::LastOnValue,
            ..ChannelConfig::new("setpoint", ValueKind::F32)
        }],
        ..heating_config()
    };
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(config, &flash, Some(700));
    svc.handle_command(EngineCommand::ApplySchedule(heating_schedule()), &mut sink)
        .unwrap();
    svc.handle_command(EngineCommand::SetMode(Mode::Interval(IntervalMode::Auto)), &mut sink)
        .unwrap();

    // 11:40 is off; the 08:00 entry started most recently.
    svc.tick(&mut sink);
    assert!(!svc.output());
    assert_eq!(svc.channel_value("setpoint"), Some(21.0));
}

#[test]
fn manual_on_uses_manual_policy() {
    let config = EngineConfig {
        channels: vec![ChannelConfig {
            manual_policy: ManualPolicy::ManualValue,
            manual_value: Some(23.5),
            ..ChannelConfig::new("setpoint", ValueKind::F32)
        }],
        ..heating_config()
    };
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(config, &flash, Some(700));
    svc.handle_command(EngineCommand::ApplySchedule(heating_schedule()), &mut sink)
        .unwrap();
    svc.handle_command(EngineCommand::SetMode(Mode::Interval(IntervalMode::ManualOn)), &mut sink)
        .unwrap();

    svc.tick(&mut sink);
    assert!(svc.output());
    assert_eq!(svc.channel_value("setpoint"), Some(23.5));

    // Inside an entry the entry's own value wins.
    tick_at(&mut svc, &mut sink, 500);
    assert_eq!(svc.channel_value("setpoint"), Some(21.0));
}

#[test]
fn current_and_next_entry_follow_last_tick() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = running_heating(&flash, &mut sink);

    tick_at(&mut svc, &mut sink, 500);
    assert_eq!(svc.current_entry().map(|(i, _)| i), Some(0));
    assert_eq!(svc.next_entry().map(|(i, _)| i), Some(1));

    tick_at(&mut svc, &mut sink, 1300);
    assert_eq!(svc.current_entry().map(|(i, _)| i), Some(1));
    // Wraps to the first entry of tomorrow.
    assert_eq!(svc.next_entry().map(|(i, _)| i), Some(0));
}

// ── Clock loss ────────────────────────────────────────────────

#[test]
fn clock_loss_holds_output_and_reports_status() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = running_heating(&flash, &mut sink);

    tick_at(&mut svc, &mut sink, 500);
    assert!(svc.output());
    sink.take();

    svc.clock_mut().set(None);
    svc.tick(&mut sink);
    svc.tick(&mut sink);
    assert!(svc.output());
    assert_eq!(svc.status(), EngineStatus::ClockUnavailable);
    assert_eq!(sink.count(|e| matches!(e, EngineEvent::ClockLost)), 1);
    assert_eq!(sink.count(|e| matches!(e, EngineEvent::OutputChanged { .. })), 0);

    tick_at(&mut svc, &mut sink, 700);
    assert!(!svc.output());
    assert_eq!(
        sink.count(|e| matches!(e, EngineEvent::ClockRestored(t) if t.minutes() == 700)),
        1
    );
}

#[test]
fn manual_modes_work_without_clock() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(heating_config(), &flash, None);
    svc.handle_command(EngineCommand::ApplySchedule(heating_schedule()), &mut sink)
        .unwrap();
    svc.handle_command(EngineCommand::SetMode(Mode::Interval(IntervalMode::ManualOn)), &mut sink)
        .unwrap();
    svc.tick(&mut sink);
    assert!(svc.output());
    assert_eq!(svc.status(), EngineStatus::ClockUnavailable);
}

// ── Instant schedules ─────────────────────────────────────────

fn feeder_config() -> EngineConfig {
    EngineConfig {
        name: "feeder".into(),
        source_id: "schedule.feeder".into(),
        kind: ScheduleKind::Instant,
        max_entries: 4,
        ..Default::default()
    }
}

fn fired(sink: &mut RecordingSink) -> Vec<usize> {
    sink.take()
        .into_iter()
        .filter_map(|e| match e {
            EngineEvent::Fired { index, .. } => Some(index),
            _ => None,
        })
        .collect()
}

#[test]
fn instant_entries_fire_once_when_crossed() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(feeder_config(), &flash, Some(400));
    svc.handle_command(
        EngineCommand::ApplySchedule(CandidateSchedule::new(vec![instant(420), instant(1080)])),
        &mut sink,
    )
    .unwrap();
    svc.handle_command(EngineCommand::SetMode(Mode::Instant(InstantMode::Enabled)), &mut sink)
        .unwrap();
    sink.take();

    svc.tick(&mut sink);
    assert!(fired(&mut sink).is_empty());

    // A coarse tick that jumps over 07:00 still fires it, exactly once.
    tick_at(&mut svc, &mut sink, 425);
    assert_eq!(fired(&mut sink), vec![0]);
    tick_at(&mut svc, &mut sink, 426);
    assert!(fired(&mut sink).is_empty());
    assert_eq!(svc.last_fired(), Some(0));
}

#[test]
fn instant_window_spans_midnight() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(feeder_config(), &flash, Some(1430));
    svc.handle_command(
        EngineCommand::ApplySchedule(CandidateSchedule::new(vec![instant(2), instant(1435)])),
        &mut sink,
    )
    .unwrap();
    svc.handle_command(EngineCommand::SetMode(Mode::Instant(InstantMode::Enabled)), &mut sink)
        .unwrap();
    svc.tick(&mut sink);
    sink.take();

    tick_at(&mut svc, &mut sink, 5);
    let mut got = fired(&mut sink);
    got.sort_unstable();
    assert_eq!(got, vec![0, 1]);
}

#[test]
fn disabled_instant_engine_swallows_edges() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(feeder_config(), &flash, Some(400));
    svc.handle_command(
        EngineCommand::ApplySchedule(CandidateSchedule::new(vec![instant(420)])),
        &mut sink,
    )
    .unwrap();
    // Re-enabled automatically once entries arrive; the operator turns it off.
    assert_eq!(svc.mode(), Mode::Instant(InstantMode::Enabled));
    svc.handle_command(EngineCommand::SetMode(Mode::Instant(InstantMode::Disabled)), &mut sink)
        .unwrap();

    svc.tick(&mut sink);
    tick_at(&mut svc, &mut sink, 430);
    assert!(fired(&mut sink).is_empty());
    assert_eq!(svc.last_fired(), None);
}

#[test]
fn instant_engine_without_clock_fires_nothing() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(feeder_config(), &flash, None);
    svc.handle_command(
        EngineCommand::ApplySchedule(CandidateSchedule::new(vec![instant(420), instant(1080)])),
        &mut sink,
    )
    .unwrap();
    sink.take();

    for _ in 0..3 {
        svc.tick(&mut sink);
    }
    assert!(fired(&mut sink).is_empty());
    assert_eq!(svc.last_fired(), None);
    assert_eq!(svc.current_entry(), None);
    assert_eq!(svc.status(), EngineStatus::ClockUnavailable);

    // 07:00 passed while the clock was down; it is not caught up.
    tick_at(&mut svc, &mut sink, 425);
    assert!(fired(&mut sink).is_empty());
    tick_at(&mut svc, &mut sink, 1085);
    assert_eq!(fired(&mut sink), vec![1]);
}
