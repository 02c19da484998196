//! Engine configuration.
//!
//! Fixed at construction.  Everything here is validated once by
//! [`EngineConfig::validate`]; the engine refuses to start on failure
//! rather than falling back to runtime defaults.

use serde::{Deserialize, Serialize};

use crate::channel::{LABEL_CAPACITY, ManualPolicy, OffPolicy, ValueKind};
use crate::error::ConfigurationError;
use crate::persist::MAX_NAME_LEN;
use crate::schedule::{DEFAULT_MAX_ENTRIES, MAX_ENTRIES_LIMIT, ScheduleKind};

/// Longest `source_id` the metadata slot can hold.
pub const MAX_SOURCE_ID_LEN: usize = 120;

/// Core engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Name used in log lines and as the storage namespace prefix.
    pub name: String,
    /// Identity of the external schedule this engine follows
    /// (e.g. `schedule.heating`).
    pub source_id: String,
    pub kind: ScheduleKind,
    /// Entry capacity of the persisted buffer.
    pub max_entries: usize,
    /// Request a fresh schedule every time the source (re)connects.
    pub update_on_reconnect: bool,
    /// Ticks after which an unanswered sync request is abandoned.
    pub sync_timeout_ticks: u32,
    /// Auxiliary per-entry values (interval schedules only).
    pub channels: Vec<ChannelConfig>,
}

/// One data channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub label: String,
    pub value_kind: ValueKind,
    #[serde(default)]
    pub off_policy: OffPolicy,
    #[serde(default)]
    pub off_value: Option<f32>,
    #[serde(default)]
    pub manual_policy: ManualPolicy,
    #[serde(default)]
    pub manual_value: Option<f32>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: "schedule".into(),
            source_id: "schedule.default".into(),
            kind: ScheduleKind::Interval,
            max_entries: DEFAULT_MAX_ENTRIES,
            update_on_reconnect: false,
            sync_timeout_ticks: 30,
            channels: Vec::new(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        // Used verbatim as the NVS namespace; two engines must never share one.
        if self.name.len() > MAX_NAME_LEN {
            return Err(ConfigurationError::NameTooLong);
        }
        if self.source_id.len() > MAX_SOURCE_ID_LEN {
            return Err(ConfigurationError::SourceIdTooLong);
        }
        if !(1..=MAX_ENTRIES_LIMIT).contains(&self.max_entries) {
            return Err(ConfigurationError::MaxEntriesOutOfRange);
        }
        if self.kind == ScheduleKind::Instant && !self.channels.is_empty() {
            return Err(ConfigurationError::ChannelsOnInstantSchedule);
        }
        for (channel, cfg) in self.channels.iter().enumerate() {
            cfg.validate(channel)?;
            if self.channels[..channel].iter().any(|c| c.label == cfg.label) {
                return Err(ConfigurationError::DuplicateLabel { channel });
            }
        }
        Ok(())
    }

    /// Position of the channel called `label`.
    pub fn channel_index(&self, label: &str) -> Option<usize> {
        self.channels.iter().position(|c| c.label == label)
    }
}

impl ChannelConfig {
    /// A channel with `Nan` policies for both off and manual states.
    pub fn new(label: &str, value_kind: ValueKind) -> Self {
        Self {
            label: label.into(),
            value_kind,
            off_policy: OffPolicy::Nan,
            off_value: None,
            manual_policy: ManualPolicy::Nan,
            manual_value: None,
        }
    }

    /// Check this channel in isolation; `channel` is its index for errors.
    pub fn validate(&self, channel: usize) -> Result<(), ConfigurationError> {
        if self.label.len() > LABEL_CAPACITY {
            return Err(ConfigurationError::LabelTooLong { channel });
        }
        if self.off_policy == OffPolicy::OffValue && self.off_value.is_none() {
            return Err(ConfigurationError::MissingOffValue { channel });
        }
        if self.manual_policy == ManualPolicy::ManualValue && self.manual_value.is_none() {
            return Err(ConfigurationError::MissingManualValue { channel });
        }
        Ok(())
    }
}
