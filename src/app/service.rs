//! Schedule service: the hexagonal core.
//!
//! [`ScheduleService`] owns the live schedule, the data channels, the
//! mode arbiter and the sync controller.  Clock, storage and schedule
//! transport are injected at construction; events leave through the
//! sink passed to each call, making the whole engine testable with mock
//! adapters.
//!
//! ```text
//!  TimeSource ──▶ ┌──────────────────────────────┐ ──▶ EventSink
//!                 │        ScheduleService        │
//! StoragePort ◀──▶│ evaluator · arbiter · channels│
//!                 │          sync control         │──▶ ScheduleSource
//!                 └──────────────────────────────┘
//! ```
//!
//! One [`tick`](ScheduleService::tick) per minute (or faster) drives
//! everything.  The clock is sampled exactly once per tick.

use log::{debug, error, info, warn};

use crate::arbiter::{Mode, ModeArbiter};
use crate::channel::DataChannel;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::persist::{EngineMeta, EngineSlots};
use crate::schedule::evaluator::{self, InstantTracker};
use crate::schedule::{ScheduleBuffer, ScheduleEntry, ScheduleKind, codec};
use crate::sync::{self, CandidateSchedule, SyncController, ValidatedSchedule};
use crate::time::TimeOfDay;

use super::commands::EngineCommand;
use super::events::EngineEvent;
use super::ports::{EventSink, ScheduleSource, StorageError, StoragePort, TimeSource};

/// Coarse engine health, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineStatus {
    /// No valid time of day yet (or lost).
    ClockUnavailable,
    /// The stored schedule was corrupt or bound to another source.
    ScheduleInvalid,
    /// Valid but without entries.
    ScheduleEmpty,
    Running,
}

/// What still has to reach storage.
#[derive(Debug, Clone, Copy, Default)]
struct Dirty {
    schedule: bool,
    meta: bool,
}

// ───────────────────────────────────────────────────────────────
// ScheduleService
// ───────────────────────────────────────────────────────────────

pub struct ScheduleService<S, C, R> {
    config: EngineConfig,
    storage: S,
    clock: C,
    source: R,
    slots: EngineSlots,

    schedule: ScheduleBuffer,
    schedule_valid: bool,
    /// Binding written with the next metadata record: the stored one
    /// until a sync commits (empty when unbound).
    bound_source: String,
    channels: Vec<DataChannel>,

    arbiter: ModeArbiter,
    tracker: InstantTracker,
    sync: SyncController,

    output: bool,
    last_fired: Option<usize>,
    /// `now` sampled by the last tick.
    last_now: Option<TimeOfDay>,
    clock_valid: Option<bool>,
    needs_seed: bool,
    dirty: Dirty,
    tick_count: u64,
}

impl<S, C, R> ScheduleService<S, C, R>
where
    S: StoragePort,
    C: TimeSource,
    R: ScheduleSource,
{
    /// Validate the configuration and restore mode, schedule and channel
    /// values from storage.
    ///
    /// A corrupt or foreign stored schedule is not an error: the engine
    /// starts empty, reports [`EngineStatus::ScheduleInvalid`] and asks
    /// for a sync as soon as the source connects.
    pub fn new(config: EngineConfig, storage: S, clock: C, source: R) -> Result<Self> {
        config.validate()?;
        let slots = EngineSlots::for_config(&config);

        let mut channels = config
            .channels
            .iter()
            .enumerate()
            .map(|(i, c)| DataChannel::new(i, c, config.max_entries))
            .collect::<core::result::Result<Vec<_>, _>>()?;

        // ── Metadata ─────────────────────────────────────────
        let meta = match slots.meta.load(&storage) {
            Ok(bytes) => {
                let meta = EngineMeta::from_bytes(&bytes);
                if meta.is_none() {
                    warn!("[{}] stored metadata unreadable, using defaults", config.name);
                }
                meta
            }
            Err(StorageError::NotFound) => None,
            Err(e) => {
                warn!("[{}] metadata read failed: {}", config.name, e);
                None
            }
        };
        let mode = meta
            .as_ref()
            .map(|m| m.mode)
            .filter(|m| m.kind() == config.kind)
            .unwrap_or(Mode::default_for(config.kind));
        let bound = meta.as_ref().is_some_and(|m| m.source_id == config.source_id);

        // ── Schedule ─────────────────────────────────────────
        let empty = ScheduleBuffer::empty(config.kind, config.max_entries);
        let (schedule, schedule_valid, found) = match slots.schedule.load(&storage) {
            Err(StorageError::NotFound) => {
                info!("[{}] no stored schedule", config.name);
                (empty, true, false)
            }
            Err(e) => {
                warn!("[{}] schedule read failed: {}", config.name, e);
                (empty, false, true)
            }
            Ok(_) if !bound => {
                warn!(
                    "[{}] stored schedule is not from '{}', discarding",
                    config.name, config.source_id
                );
                (empty, false, true)
            }
            Ok(bytes) => match codec::decode(config.kind, config.max_entries, &bytes) {
                Ok(buffer) => {
                    info!("[{}] restored {} entries", config.name, buffer.len());
                    (buffer, true, true)
                }
                Err(e) => {
                    warn!("[{}] stored schedule invalid: {}", config.name, e);
                    (empty, false, true)
                }
            },
        };

        if schedule_valid && found {
            for (channel, slot) in channels.iter_mut().zip(&slots.channels) {
                match slot.load(&storage) {
                    Ok(bytes) => channel.replace_data(bytes),
                    Err(StorageError::NotFound) => {
                        debug!("Channel '{}' has no stored values", channel.label());
                    }
                    Err(e) => warn!("Channel '{}' read failed: {}", channel.label(), e),
                }
            }
        }

        // Keep whatever binding flash holds until a sync replaces it.  A
        // failed read must not unbind a schedule that is still on flash.
        let bound_source = meta.map(|m| m.source_id).unwrap_or_default();

        let available = schedule_valid && !schedule.is_empty();
        let arbiter = ModeArbiter::new(mode, available);
        let mut sync = SyncController::new(&config);
        sync.set_wanted(!schedule_valid || !found);

        Ok(Self {
            bound_source,
            dirty: Dirty {
                schedule: false,
                meta: arbiter.mode() != mode,
            },
            tracker: InstantTracker::new(),
            config,
            storage,
            clock,
            source,
            slots,
            schedule,
            schedule_valid,
            channels,
            arbiter,
            sync,
            output: false,
            last_fired: None,
            last_now: None,
            clock_valid: None,
            needs_seed: true,
            tick_count: 0,
        })
    }

    // ── Lifecycle ─────────────────────────────────────────────

    pub fn start(&mut self, sink: &mut impl EventSink) {
        let status = self.status();
        info!(
            "[{}] engine started: {:?} schedule, {} entries, mode {}, {:?}",
            self.config.name,
            self.config.kind,
            self.schedule.len(),
            self.arbiter.mode(),
            status
        );
        sink.emit(&EngineEvent::Started {
            mode: self.arbiter.mode(),
            status,
        });
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one evaluation cycle: clock → evaluator → arbiter → channels.
    pub fn tick(&mut self, sink: &mut impl EventSink) {
        self.tick_count += 1;

        if self.sync.tick() {
            sink.emit(&EngineEvent::SyncTimedOut);
        }
        if self.dirty.schedule || self.dirty.meta {
            let _ = self.flush(sink);
        }

        // 1. Sample the clock once
        let now = self.clock.now();
        match (now, self.clock_valid) {
            (None, Some(false)) | (Some(_), Some(true)) => {}
            (None, _) => {
                warn!("[{}] clock unavailable, evaluation deferred", self.config.name);
                self.tracker.reset();
                sink.emit(&EngineEvent::ClockLost);
            }
            (Some(t), Some(false)) => {
                info!("[{}] clock restored at {}", self.config.name, t);
                sink.emit(&EngineEvent::ClockRestored(t));
            }
            (Some(_), None) => {}
        }
        self.clock_valid = Some(now.is_some());
        self.last_now = now;

        // 2. Evaluate and arbitrate for the schedule kind
        match self.config.kind {
            ScheduleKind::Interval => self.tick_interval(now, sink),
            ScheduleKind::Instant => self.tick_instant(now, sink),
        }
    }

    fn tick_interval(&mut self, now: Option<TimeOfDay>, sink: &mut impl EventSink) {
        if let Some(now) = now {
            if self.needs_seed {
                self.seed_channels(now);
            }
        }

        let eval = now.map(|t| evaluator::evaluate_interval(&self.schedule, t));
        let before = self.arbiter.mode();
        let resolution = self.arbiter.resolve(eval.as_ref());
        if resolution.reverted {
            self.mode_changed(before, sink);
            let _ = self.flush(sink);
        }

        if resolution.on != self.output {
            self.output = resolution.on;
            info!("[{}] output {}", self.config.name, if self.output { "on" } else { "off" });
            sink.emit(&EngineEvent::OutputChanged { on: self.output });
        }

        // Without a clock only the manual modes know their output.
        if eval.is_none() && !self.arbiter.is_override() {
            return;
        }
        let active = eval.and_then(|e| e.active).filter(|_| resolution.on);
        for channel in &mut self.channels {
            if let Some(value) = channel.update(resolution.on, active) {
                debug!("Channel '{}' = {}", channel.label(), value);
                sink.emit(&EngineEvent::ChannelChanged {
                    label: channel.label_buf().clone(),
                    value,
                });
            }
        }
    }

    fn tick_instant(&mut self, now: Option<TimeOfDay>, sink: &mut impl EventSink) {
        let Some(now) = now else {
            return;
        };
        let fired = self.tracker.advance(&self.schedule, now);
        for index in self.arbiter.gate(fired) {
            let Some(entry) = self.schedule.get(index) else {
                continue;
            };
            info!("[{}] fired #{} at {}", self.config.name, index, entry.start());
            self.last_fired = Some(index);
            sink.emit(&EngineEvent::Fired {
                index,
                at: entry.start(),
            });
        }
    }

    /// Seed last-on values from the most recently started entry.
    fn seed_channels(&mut self, now: TimeOfDay) {
        self.needs_seed = false;
        if let Some(index) = evaluator::most_recent_index(&self.schedule, now) {
            for channel in &mut self.channels {
                channel.seed_last_on(index);
            }
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Process an external command (operator, hub transport, connection
    /// monitor).  Rejected commands leave the engine unchanged.
    pub fn handle_command(&mut self, cmd: EngineCommand, sink: &mut impl EventSink) -> Result<()> {
        match cmd {
            EngineCommand::SetMode(mode) => self.set_mode(mode, sink),
            EngineCommand::RequestSync => {
                self.request_sync(sink);
                Ok(())
            }
            EngineCommand::ApplySchedule(candidate) => self.apply_schedule(&candidate, sink),
            EngineCommand::SourceConnected => {
                info!("[{}] schedule source connected", self.config.name);
                if self.sync.on_connected() {
                    self.request_sync(sink);
                }
                Ok(())
            }
            EngineCommand::SourceDisconnected => {
                info!("[{}] schedule source disconnected", self.config.name);
                self.sync.on_disconnected();
                Ok(())
            }
        }
    }

    fn set_mode(&mut self, mode: Mode, sink: &mut impl EventSink) -> Result<()> {
        let before = self.arbiter.mode();
        match self.arbiter.select(mode) {
            Ok(true) => {
                self.mode_changed(before, sink);
                // A failed write stays dirty and is retried next tick.
                let _ = self.flush(sink);
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => {
                warn!("[{}] {}", self.config.name, e);
                Err(e)
            }
        }
    }

    fn request_sync(&mut self, sink: &mut impl EventSink) {
        match self.sync.request(&mut self.source, &self.config.source_id) {
            Ok(true) => sink.emit(&EngineEvent::SyncRequested),
            Ok(false) => {}
            Err(e) => warn!("[{}] sync request failed: {}", self.config.name, e),
        }
    }

    /// Validate and commit a candidate.  On a validation failure nothing
    /// changes.  A storage failure after the commit keeps the new
    /// schedule live and is retried on later ticks.
    fn apply_schedule(&mut self, candidate: &CandidateSchedule, sink: &mut impl EventSink) -> Result<()> {
        self.sync.finish();
        let validated = match sync::validate_candidate(&self.config, candidate) {
            Ok(v) => v,
            Err(e) => {
                warn!("[{}] schedule rejected: {}", self.config.name, e);
                sink.emit(&EngineEvent::SyncRejected(e));
                return Err(e);
            }
        };
        self.commit(validated, sink);
        self.flush(sink).map_err(Error::from)
    }

    fn commit(&mut self, validated: ValidatedSchedule, sink: &mut impl EventSink) {
        let ValidatedSchedule {
            buffer,
            channel_images,
            ..
        } = validated;

        for (channel, image) in self.channels.iter_mut().zip(channel_images) {
            channel.replace_data(image);
        }
        self.schedule = buffer;
        self.schedule_valid = true;
        self.bound_source = self.config.source_id.clone();
        self.needs_seed = true;
        self.sync.set_wanted(false);
        self.dirty = Dirty {
            schedule: true,
            meta: true,
        };

        let before = self.arbiter.mode();
        if self.arbiter.set_schedule_available(!self.schedule.is_empty()).is_some() {
            self.mode_changed(before, sink);
        }

        info!("[{}] schedule applied: {} entries", self.config.name, self.schedule.len());
        sink.emit(&EngineEvent::SyncApplied {
            entries: self.schedule.len(),
        });
    }

    fn mode_changed(&mut self, from: Mode, sink: &mut impl EventSink) {
        let to = self.arbiter.mode();
        info!("[{}] mode {} -> {}", self.config.name, from, to);
        sink.emit(&EngineEvent::ModeChanged { from, to });
        self.dirty.meta = true;
    }

    // ── Persistence ───────────────────────────────────────────

    /// Write whatever is dirty: channels, then schedule, then metadata.
    /// The metadata carries the source binding, so an interrupted sequence
    /// leaves the old binding and the next boot discards the half-written
    /// schedule.
    fn flush(&mut self, sink: &mut impl EventSink) -> core::result::Result<(), StorageError> {
        let result = self.write_dirty();
        if let Err(e) = result {
            error!("[{}] persist failed: {}", self.config.name, e);
            sink.emit(&EngineEvent::PersistFailed(e));
        }
        result
    }

    fn write_dirty(&mut self) -> core::result::Result<(), StorageError> {
        if self.dirty.schedule {
            for (channel, slot) in self.channels.iter().zip(&self.slots.channels) {
                slot.save(&mut self.storage, channel.data())?;
            }
            let image = codec::encode(&self.schedule).map_err(|_| StorageError::Overflow)?;
            self.slots.schedule.save(&mut self.storage, &image)?;
            self.dirty.schedule = false;
            debug!("[{}] schedule persisted ({} bytes)", self.config.name, image.len());
        }
        if self.dirty.meta {
            let meta = EngineMeta {
                mode: self.arbiter.mode(),
                source_id: self.bound_source.clone(),
            };
            self.slots.meta.save(&mut self.storage, &meta.to_bytes()?)?;
            self.dirty.meta = false;
        }
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn status(&self) -> EngineStatus {
        if self.clock_valid != Some(true) {
            EngineStatus::ClockUnavailable
        } else if !self.schedule_valid {
            EngineStatus::ScheduleInvalid
        } else if self.schedule.is_empty() {
            EngineStatus::ScheduleEmpty
        } else {
            EngineStatus::Running
        }
    }

    pub fn mode(&self) -> Mode {
        self.arbiter.mode()
    }

    /// Whether `mode` can be selected right now.
    pub fn is_mode_available(&self, mode: Mode) -> bool {
        mode.kind() == self.config.kind && self.arbiter.is_selectable(mode)
    }

    /// Effective interval output.
    pub fn output(&self) -> bool {
        self.output
    }

    /// Index of the instant entry that fired last.
    pub fn last_fired(&self) -> Option<usize> {
        self.last_fired
    }

    /// Entry active at the last tick (interval), or the one that started
    /// most recently (instant).
    pub fn current_entry(&self) -> Option<(usize, ScheduleEntry)> {
        let now = self.last_now?;
        let index = match self.config.kind {
            ScheduleKind::Interval => evaluator::evaluate_interval(&self.schedule, now).active,
            ScheduleKind::Instant => evaluator::most_recent_index(&self.schedule, now),
        }?;
        self.schedule.get(index).map(|e| (index, *e))
    }

    /// Next entry to start after the last tick.
    pub fn next_entry(&self) -> Option<(usize, ScheduleEntry)> {
        let index = evaluator::next_index(&self.schedule, self.last_now?)?;
        self.schedule.get(index).map(|e| (index, *e))
    }

    /// Reported value of the channel `label`.
    pub fn channel_value(&self, label: &str) -> Option<f32> {
        self.channels
            .iter()
            .find(|c| c.label() == label)
            .map(DataChannel::value)
    }

    pub fn channels(&self) -> &[DataChannel] {
        &self.channels
    }

    pub fn schedule(&self) -> &ScheduleBuffer {
        &self.schedule
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_sync_in_flight(&self) -> bool {
        self.sync.in_flight()
    }

    /// Whether a storage write is still outstanding.
    pub fn is_persist_pending(&self) -> bool {
        self.dirty.schedule || self.dirty.meta
    }

    /// Total ticks executed since construction.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn source_mut(&mut self) -> &mut R {
        &mut self.source
    }
}
