//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing one line per engine event to the
//! `log` facade (UART / USB-CDC in production, stderr in the simulator).
//! A host-entity or MQTT adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::EngineEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`EngineEvent`].
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &EngineEvent) {
        match event {
            EngineEvent::Started { mode, status } => {
                info!("START | mode={} | status={:?}", mode, status);
            }
            EngineEvent::OutputChanged { on } => {
                info!("OUTPUT | {}", if *on { "on" } else { "off" });
            }
            EngineEvent::Fired { index, at } => {
                info!("FIRED | #{} at {}", index, at);
            }
            EngineEvent::ModeChanged { from, to } => {
                info!("MODE | {} -> {}", from, to);
            }
            EngineEvent::ChannelChanged { label, value } => {
                if value.is_nan() {
                    info!("DATA | {}=unknown", label);
                } else {
                    info!("DATA | {}={:.2}", label, value);
                }
            }
            EngineEvent::SyncRequested => info!("SYNC | requested"),
            EngineEvent::SyncApplied { entries } => {
                info!("SYNC | applied, {} entries", entries);
            }
            EngineEvent::SyncRejected(e) => warn!("SYNC | rejected: {}", e),
            EngineEvent::SyncTimedOut => warn!("SYNC | timed out"),
            EngineEvent::ClockLost => warn!("CLOCK | lost"),
            EngineEvent::ClockRestored(t) => info!("CLOCK | restored at {}", t),
            EngineEvent::PersistFailed(e) => warn!("PERSIST | failed: {}", e),
        }
    }
}
