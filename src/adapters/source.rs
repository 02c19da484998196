//! Schedule source adapters.
//!
//! The real hub transport lives outside this crate.  These two cover the
//! device running without one and the host simulator.

use log::debug;

use crate::app::ports::{ScheduleSource, SourceError};

/// A source that is never reachable.  The engine keeps running on its
/// stored schedule.
#[derive(Debug, Default)]
pub struct OfflineSource;

impl ScheduleSource for OfflineSource {
    fn request_schedule(&mut self, _source_id: &str) -> Result<(), SourceError> {
        Err(SourceError::NotConnected)
    }
}

/// Records requests; the caller answers them with `ApplySchedule`.
#[derive(Debug, Default)]
pub struct RecordingSource {
    connected: bool,
    requests: Vec<String>,
}

impl RecordingSource {
    pub fn new(connected: bool) -> Self {
        Self {
            connected,
            requests: Vec::new(),
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    /// Every source id requested so far, oldest first.
    pub fn requests(&self) -> &[String] {
        &self.requests
    }

    /// Take the requests recorded since the last call.
    pub fn drain(&mut self) -> Vec<String> {
        core::mem::take(&mut self.requests)
    }
}

impl ScheduleSource for RecordingSource {
    fn request_schedule(&mut self, source_id: &str) -> Result<(), SourceError> {
        if !self.connected {
            return Err(SourceError::NotConnected);
        }
        debug!("RecordingSource: request for '{}'", source_id);
        self.requests.push(source_id.to_owned());
        Ok(())
    }
}
