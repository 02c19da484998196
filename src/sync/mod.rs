//! Schedule synchronisation: trigger bookkeeping and candidate validation.
//!
//! ```text
//!   RequestSync / reconnect ──▶ SyncController ──▶ ScheduleSource
//!                                                       │
//!   ApplySchedule(candidate) ◀──────────────────────────┘
//!          │
//!          ▼
//!   validate_candidate ──▶ ValidatedSchedule ──▶ commit (service)
//! ```
//!
//! Validation runs to completion before anything is touched.  A
//! [`ValidatedSchedule`] carries the ready-to-write byte images, so the
//! commit step cannot fail on encoding.

pub mod wire;

use log::{debug, info, warn};

use crate::app::ports::{ScheduleSource, SourceError};
use crate::channel::encode_values;
use crate::config::EngineConfig;
use crate::error::{Result, ValidationError};
use crate::schedule::{ScheduleBuffer, ScheduleEntry, codec};

// ───────────────────────────────────────────────────────────────
// Candidate
// ───────────────────────────────────────────────────────────────

/// Per-channel values, one per candidate entry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelValues {
    pub label: String,
    pub values: Vec<f64>,
}

/// A complete replacement schedule offered by the source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSchedule {
    pub entries: Vec<ScheduleEntry>,
    pub channels: Vec<ChannelValues>,
}

impl CandidateSchedule {
    pub fn new(entries: Vec<ScheduleEntry>) -> Self {
        Self {
            entries,
            channels: Vec::new(),
        }
    }

    /// Attach values for the channel `label`.
    #[must_use]
    pub fn with_channel(mut self, label: &str, values: Vec<f64>) -> Self {
        self.channels.push(ChannelValues {
            label: label.into(),
            values,
        });
        self
    }
}

/// A candidate that passed every check, with its persisted images.
#[derive(Debug, Clone)]
pub struct ValidatedSchedule {
    pub buffer: ScheduleBuffer,
    pub schedule_image: Vec<u8>,
    /// Parallel to `EngineConfig::channels`.
    pub channel_images: Vec<Vec<u8>>,
}

/// Check a candidate against the configuration.
///
/// Order: capacity, entry rules, unknown labels, then per configured
/// channel presence, length and value range.  A channel may be absent
/// only when the candidate has no entries.
pub fn validate_candidate(config: &EngineConfig, candidate: &CandidateSchedule) -> Result<ValidatedSchedule> {
    let buffer = ScheduleBuffer::new(config.kind, config.max_entries, candidate.entries.clone())?;

    if candidate
        .channels
        .iter()
        .any(|c| config.channel_index(&c.label).is_none())
    {
        return Err(ValidationError::UnknownChannel.into());
    }

    let mut channel_images = Vec::with_capacity(config.channels.len());
    for (channel, cfg) in config.channels.iter().enumerate() {
        let values: &[f64] = match candidate.channels.iter().find(|c| c.label == cfg.label) {
            Some(c) => c.values.as_slice(),
            None if buffer.is_empty() => &[],
            None => return Err(ValidationError::MissingChannel { channel }.into()),
        };
        if values.len() != buffer.len() {
            return Err(ValidationError::ChannelLength {
                channel,
                expected: buffer.len(),
                found: values.len(),
            }
            .into());
        }
        channel_images.push(encode_values(cfg.value_kind, config.max_entries, channel, values)?);
    }

    let schedule_image = codec::encode(&buffer)?;
    Ok(ValidatedSchedule {
        buffer,
        schedule_image,
        channel_images,
    })
}

// ───────────────────────────────────────────────────────────────
// Trigger bookkeeping
// ───────────────────────────────────────────────────────────────

/// Serialises sync triggers behind one in-flight flag.
#[derive(Debug, Clone)]
pub struct SyncController {
    /// Ticks the outstanding request has waited, if one is in flight.
    in_flight: Option<u32>,
    timeout_ticks: u32,
    update_on_reconnect: bool,
    /// The stored schedule is missing or unusable; fetch on next connect.
    wanted: bool,
    connected: bool,
}

impl SyncController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            in_flight: None,
            timeout_ticks: config.sync_timeout_ticks.max(1),
            update_on_reconnect: config.update_on_reconnect,
            wanted: false,
            connected: false,
        }
    }

    pub fn in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn is_wanted(&self) -> bool {
        self.wanted
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Note that the local schedule needs replacing.
    pub fn set_wanted(&mut self, wanted: bool) {
        self.wanted = wanted;
    }

    /// Issue a request unless one is already outstanding.  `Ok(false)`
    /// means the trigger was coalesced.
    pub fn request(&mut self, source: &mut impl ScheduleSource, source_id: &str) -> core::result::Result<bool, SourceError> {
        if self.in_flight.is_some() {
            debug!("Sync already in flight, trigger coalesced");
            return Ok(false);
        }
        source.request_schedule(source_id)?;
        info!("Requested schedule '{}'", source_id);
        self.in_flight = Some(0);
        Ok(true)
    }

    /// A candidate arrived (accepted or not); the request is answered.
    pub fn finish(&mut self) {
        self.in_flight = None;
    }

    /// Count one tick.  Returns `true` if the outstanding request just
    /// timed out.
    pub fn tick(&mut self) -> bool {
        let Some(waited) = self.in_flight.as_mut() else {
            return false;
        };
        *waited += 1;
        if *waited >= self.timeout_ticks {
            warn!("Sync request unanswered after {} ticks", self.timeout_ticks);
            self.in_flight = None;
            return true;
        }
        false
    }

    /// Transport connected.  Returns `true` if a request should go out.
    pub fn on_connected(&mut self) -> bool {
        self.connected = true;
        self.update_on_reconnect || self.wanted
    }

    /// Transport dropped; an outstanding request will never be answered.
    pub fn on_disconnected(&mut self) {
        self.connected = false;
        self.in_flight = None;
    }
}
