//! Mode arbitration through the service: overrides, boundary reversion
//! and restriction while the schedule is empty.

use schedule_engine::Error;
use schedule_engine::app::commands::EngineCommand;
use schedule_engine::app::events::EngineEvent;
use schedule_engine::arbiter::{InstantMode, IntervalMode, Mode};
use schedule_engine::schedule::ScheduleEntry;
use schedule_engine::sync::CandidateSchedule;

use crate::mock_hw::{Engine, MockFlash, RecordingSink, at, engine, heating_config};

const AUTO: Mode = Mode::Interval(IntervalMode::Auto);
const BOOST: Mode = Mode::Interval(IntervalMode::BoostOn);
const EARLY_OFF: Mode = Mode::Interval(IntervalMode::EarlyOff);
const MANUAL_OFF: Mode = Mode::Interval(IntervalMode::ManualOff);

fn scheduled(flash: &MockFlash, now: u16, sink: &mut RecordingSink) -> Engine {
    let mut svc = engine(heating_config(), flash, Some(now));
    let entries = vec![
        ScheduleEntry::Interval { start: at(480), end: at(540) },
        ScheduleEntry::Interval { start: at(1200), end: at(60) },
    ];
    svc.handle_command(
        EngineCommand::ApplySchedule(
            CandidateSchedule::new(entries).with_channel("setpoint", vec![21.0, 18.0]),
        ),
        sink,
    )
    .unwrap();
    svc
}

fn tick_at(svc: &mut Engine, sink: &mut RecordingSink, minutes: u16) {
    svc.clock_mut().set(Some(at(minutes)));
    svc.tick(sink);
}

#[test]
fn boost_runs_until_next_entry_then_reverts() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = scheduled(&flash, 700, &mut sink);
    svc.handle_command(EngineCommand::SetMode(BOOST), &mut sink).unwrap();

    tick_at(&mut svc, &mut sink, 700);
    assert!(svc.output());
    tick_at(&mut svc, &mut sink, 1199);
    assert!(svc.output());
    assert_eq!(svc.mode(), BOOST);
    sink.take();

    tick_at(&mut svc, &mut sink, 1200);
    assert_eq!(svc.mode(), AUTO);
    assert!(svc.output());
    assert!(sink.events.contains(&EngineEvent::ModeChanged { from: BOOST, to: AUTO }));

    tick_at(&mut svc, &mut sink, 61);
    assert!(!svc.output());
}

#[test]
fn boost_inside_an_entry_holds_until_its_end() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = scheduled(&flash, 500, &mut sink);
    svc.handle_command(EngineCommand::SetMode(BOOST), &mut sink).unwrap();

    tick_at(&mut svc, &mut sink, 500);
    assert!(svc.output());
    tick_at(&mut svc, &mut sink, 539);
    assert!(svc.output());
    assert_eq!(svc.mode(), BOOST);
    sink.take();

    tick_at(&mut svc, &mut sink, 540);
    assert_eq!(svc.mode(), AUTO);
    assert!(!svc.output());
    assert!(sink.events.contains(&EngineEvent::ModeChanged { from: BOOST, to: AUTO }));
}

#[test]
fn early_off_in_a_gap_holds_until_next_start() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = scheduled(&flash, 700, &mut sink);
    svc.handle_command(EngineCommand::SetMode(EARLY_OFF), &mut sink).unwrap();

    tick_at(&mut svc, &mut sink, 700);
    assert!(!svc.output());
    tick_at(&mut svc, &mut sink, 1199);
    assert!(!svc.output());
    assert_eq!(svc.mode(), EARLY_OFF);
    sink.take();

    tick_at(&mut svc, &mut sink, 1200);
    assert_eq!(svc.mode(), AUTO);
    assert!(svc.output());
    assert!(sink.events.contains(&EngineEvent::ModeChanged { from: EARLY_OFF, to: AUTO }));
}

#[test]
fn early_off_ends_active_entry_then_reverts() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = scheduled(&flash, 500, &mut sink);
    svc.handle_command(EngineCommand::SetMode(EARLY_OFF), &mut sink).unwrap();

    tick_at(&mut svc, &mut sink, 500);
    assert!(!svc.output());
    assert_eq!(svc.channel_value("setpoint"), Some(16.0));
    tick_at(&mut svc, &mut sink, 539);
    assert!(!svc.output());

    tick_at(&mut svc, &mut sink, 540);
    assert_eq!(svc.mode(), AUTO);
    assert!(!svc.output());

    tick_at(&mut svc, &mut sink, 1200);
    assert!(svc.output());
}

#[test]
fn reverted_mode_is_persisted() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = scheduled(&flash, 700, &mut sink);
    svc.handle_command(EngineCommand::SetMode(BOOST), &mut sink).unwrap();
    tick_at(&mut svc, &mut sink, 700);
    tick_at(&mut svc, &mut sink, 1200);
    assert_eq!(svc.mode(), AUTO);
    drop(svc);

    let rebooted = engine(heating_config(), &flash, Some(1210));
    assert_eq!(rebooted.mode(), AUTO);
}

#[test]
fn schedule_modes_unavailable_without_entries() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = engine(heating_config(), &flash, Some(0));

    for mode in [AUTO, BOOST, EARLY_OFF] {
        assert!(!svc.is_mode_available(mode));
        assert_eq!(
            svc.handle_command(EngineCommand::SetMode(mode), &mut sink),
            Err(Error::ModeUnavailable(mode))
        );
    }
    assert!(svc.is_mode_available(Mode::Interval(IntervalMode::ManualOn)));
    assert_eq!(svc.mode(), MANUAL_OFF);
}

#[test]
fn emptying_the_schedule_forces_manual_off() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = scheduled(&flash, 500, &mut sink);
    svc.handle_command(EngineCommand::SetMode(AUTO), &mut sink).unwrap();
    tick_at(&mut svc, &mut sink, 500);
    assert!(svc.output());
    sink.take();

    svc.handle_command(EngineCommand::ApplySchedule(CandidateSchedule::default()), &mut sink)
        .unwrap();
    assert_eq!(svc.mode(), MANUAL_OFF);
    assert!(sink.events.contains(&EngineEvent::ModeChanged { from: AUTO, to: MANUAL_OFF }));

    tick_at(&mut svc, &mut sink, 501);
    assert!(!svc.output());
}

#[test]
fn mode_of_the_other_kind_is_rejected() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = scheduled(&flash, 0, &mut sink);
    let instant = Mode::Instant(InstantMode::Enabled);
    assert!(!svc.is_mode_available(instant));
    assert_eq!(
        svc.handle_command(EngineCommand::SetMode(instant), &mut sink),
        Err(Error::ModeUnavailable(instant))
    );
}

#[test]
fn reselecting_the_current_mode_is_silent() {
    let flash = MockFlash::new();
    let mut sink = RecordingSink::new();
    let mut svc = scheduled(&flash, 0, &mut sink);
    svc.handle_command(EngineCommand::SetMode(AUTO), &mut sink).unwrap();
    sink.take();
    svc.handle_command(EngineCommand::SetMode(AUTO), &mut sink).unwrap();
    assert_eq!(sink.count(|e| matches!(e, EngineEvent::ModeChanged { .. })), 0);
}
