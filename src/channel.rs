//! Data channels: auxiliary per-entry values exposed next to the schedule.
//!
//! Each channel stores one typed value per schedule entry in a
//! little-endian byte array parallel to the [`ScheduleBuffer`]:
//!
//! ```text
//!   entries:   [08:00-09:00] [20:00-01:00]
//!   setpoint:  21.0          18.0           (f32, 4 bytes each)
//! ```
//!
//! The observable value is derived every tick from the effective state:
//!
//! | Effective state                     | Reported value            |
//! |-------------------------------------|---------------------------|
//! | on, active entry `i`                | value `i` verbatim        |
//! | on, no active entry (forced on)     | manual policy             |
//! | off                                 | off policy                |
//!
//! [`ScheduleBuffer`]: crate::schedule::ScheduleBuffer

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::ChannelConfig;
use crate::error::{ConfigurationError, ValidationError};

/// Longest label a channel accepts, in bytes.
pub const LABEL_CAPACITY: usize = 32;

// ═══════════════════════════════════════════════════════════════
//  Value kinds and policies
// ═══════════════════════════════════════════════════════════════

/// Primitive type of a channel's stored values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    U8,
    U16,
    I32,
    F32,
}

impl ValueKind {
    /// Stored width in bytes.
    pub const fn width(self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 => 2,
            Self::I32 | Self::F32 => 4,
        }
    }

    /// Encode `value` if it is representable: integers must be whole and in
    /// range, floats must be finite.
    fn encode(self, value: f64, out: &mut [u8]) -> bool {
        let integral = value.is_finite() && value.fract() == 0.0;
        match self {
            Self::U8 if integral && (0.0..=f64::from(u8::MAX)).contains(&value) => {
                out[0] = value as u8;
            }
            Self::U16 if integral && (0.0..=f64::from(u16::MAX)).contains(&value) => {
                out.copy_from_slice(&(value as u16).to_le_bytes());
            }
            Self::I32
                if integral && (f64::from(i32::MIN)..=f64::from(i32::MAX)).contains(&value) =>
            {
                out.copy_from_slice(&(value as i32).to_le_bytes());
            }
            Self::F32 if value.is_finite() && (value as f32).is_finite() => {
                out.copy_from_slice(&(value as f32).to_le_bytes());
            }
            _ => return false,
        }
        true
    }

    fn decode(self, bytes: &[u8]) -> f32 {
        match self {
            Self::U8 => f32::from(bytes[0]),
            Self::U16 => f32::from(u16::from_le_bytes([bytes[0], bytes[1]])),
            Self::I32 => i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as f32,
            Self::F32 => f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
        }
    }
}

/// What a channel reports while the effective state is off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffPolicy {
    #[default]
    Nan,
    LastOnValue,
    OffValue,
}

/// What a channel reports while forced on with no active entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManualPolicy {
    #[default]
    Nan,
    LastOnValue,
    ManualValue,
}

/// Encode a candidate value list into a full-capacity channel image.
///
/// Fails on the first value the kind cannot hold.  Length against the
/// entry count is the caller's concern.
pub fn encode_values(
    kind: ValueKind,
    max_entries: usize,
    channel: usize,
    values: &[f64],
) -> Result<Vec<u8>, ValidationError> {
    let width = kind.width();
    let mut out = vec![0u8; max_entries * width];
    for (index, (&value, slot)) in values.iter().zip(out.chunks_exact_mut(width)).enumerate() {
        if !kind.encode(value, slot) {
            return Err(ValidationError::ValueOutOfRange { channel, index });
        }
    }
    Ok(out)
}

/// `NaN`-aware equality for reported values.
fn same_value(a: f32, b: f32) -> bool {
    (a.is_nan() && b.is_nan()) || a == b
}

// ═══════════════════════════════════════════════════════════════
//  DataChannel
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
pub struct DataChannel {
    label: heapless::String<LABEL_CAPACITY>,
    kind: ValueKind,
    max_entries: usize,
    data: Vec<u8>,
    off_policy: OffPolicy,
    off_value: f32,
    manual_policy: ManualPolicy,
    manual_value: f32,
    last_on: f32,
    value: f32,
}

impl DataChannel {
    /// Build a channel with zeroed storage.  `channel` is its position in
    /// the configuration, used for error reporting.
    pub fn new(
        channel: usize,
        cfg: &ChannelConfig,
        max_entries: usize,
    ) -> Result<Self, ConfigurationError> {
        cfg.validate(channel)?;
        let mut label = heapless::String::new();
        label
            .push_str(&cfg.label)
            .map_err(|()| ConfigurationError::LabelTooLong { channel })?;

        Ok(Self {
            label,
            kind: cfg.value_kind,
            max_entries,
            data: vec![0; max_entries * cfg.value_kind.width()],
            off_policy: cfg.off_policy,
            off_value: cfg.off_value.unwrap_or(f32::NAN),
            manual_policy: cfg.manual_policy,
            manual_value: cfg.manual_value.unwrap_or(f32::NAN),
            last_on: f32::NAN,
            value: f32::NAN,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn label_buf(&self) -> &heapless::String<LABEL_CAPACITY> {
        &self.label
    }

    pub fn kind(&self) -> ValueKind {
        self.kind
    }

    /// Size of the persisted image in bytes.
    pub fn capacity_bytes(&self) -> usize {
        self.max_entries * self.kind.width()
    }

    /// Raw little-endian image, exactly [`capacity_bytes`](Self::capacity_bytes) long.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Replace the stored values wholesale (load or sync commit).  Short
    /// images are zero-padded, long ones truncated.
    pub fn replace_data(&mut self, mut bytes: Vec<u8>) {
        bytes.resize(self.capacity_bytes(), 0);
        self.data = bytes;
        self.last_on = f32::NAN;
    }

    /// Stored value for entry `index`.
    pub fn value_at(&self, index: usize) -> Option<f32> {
        let width = self.kind.width();
        let bytes = self.data.get(index * width..(index + 1) * width)?;
        Some(self.kind.decode(bytes))
    }

    /// Last reported value (`NaN` = no value).
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn last_on_value(&self) -> f32 {
        self.last_on
    }

    /// Seed the last-on value from entry `index` so `LastOnValue`
    /// policies have something to report before the first on-transition.
    pub fn seed_last_on(&mut self, index: usize) {
        if let Some(v) = self.value_at(index) {
            debug!("Channel '{}' last-on seeded from #{}: {}", self.label, index, v);
            self.last_on = v;
        }
    }

    /// Derive and store the reported value.  Returns it if it changed.
    pub fn update(&mut self, on: bool, active: Option<usize>) -> Option<f32> {
        let value = match (on, active.and_then(|i| self.value_at(i))) {
            (true, Some(v)) => {
                self.last_on = v;
                v
            }
            (true, None) => match self.manual_policy {
                ManualPolicy::Nan => f32::NAN,
                ManualPolicy::LastOnValue => self.last_on,
                ManualPolicy::ManualValue => self.manual_value,
            },
            (false, _) => match self.off_policy {
                OffPolicy::Nan => f32::NAN,
                OffPolicy::LastOnValue => self.last_on,
                OffPolicy::OffValue => self.off_value,
            },
        };

        if same_value(value, self.value) {
            return None;
        }
        self.value = value;
        Some(value)
    }
}
