//! Outbound engine events.
//!
//! The [`ScheduleService`](super::service::ScheduleService) emits these
//! through the [`EventSink`](super::ports::EventSink) port.  Adapters on
//! the other side decide what to do with them: log to serial, update a
//! host switch or sensor entity, publish over MQTT, etc.

use crate::arbiter::Mode;
use crate::channel::LABEL_CAPACITY;
use crate::error::Error;
use crate::time::TimeOfDay;

use super::ports::StorageError;
use super::service::EngineStatus;

/// Structured events emitted by the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// The service has started (carries restored mode and status).
    Started { mode: Mode, status: EngineStatus },

    /// The effective interval output changed.
    OutputChanged { on: bool },

    /// An instant entry fired.
    Fired { index: usize, at: TimeOfDay },

    /// The mode changed (operator, reversion, or empty-schedule restriction).
    ModeChanged { from: Mode, to: Mode },

    /// A data channel reports a new value (`NaN` = no value).
    ChannelChanged {
        label: heapless::String<LABEL_CAPACITY>,
        value: f32,
    },

    /// A schedule request went out to the source.
    SyncRequested,

    /// A candidate schedule was validated and committed.
    SyncApplied { entries: usize },

    /// A candidate schedule was rejected; nothing changed.
    SyncRejected(Error),

    /// An outstanding request was abandoned unanswered.
    SyncTimedOut,

    /// The clock stopped producing a valid time.
    ClockLost,

    /// The clock is valid again.
    ClockRestored(TimeOfDay),

    /// A storage write failed; it will be retried on later ticks.
    PersistFailed(StorageError),
}
