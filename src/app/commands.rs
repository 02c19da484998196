//! Inbound commands to the schedule service.
//!
//! These represent actions requested by the outside world (operator
//! select entity, hub transport, connection monitor) that the
//! [`ScheduleService`](super::service::ScheduleService) interprets and
//! acts upon.

use crate::arbiter::Mode;
use crate::sync::CandidateSchedule;

/// Commands that external adapters can send into the engine.
#[derive(Debug, Clone)]
pub enum EngineCommand {
    /// Operator mode selection.
    SetMode(Mode),

    /// Ask the hub for a fresh schedule (operator action).
    RequestSync,

    /// A complete candidate schedule arrived from the hub.
    ApplySchedule(CandidateSchedule),

    /// The hub transport connected (or reconnected).
    SourceConnected,

    /// The hub transport dropped.
    SourceDisconnected,
}
