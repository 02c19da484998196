//! Unified error types for the schedule engine.
//!
//! A single `Error` enum that every subsystem converts into, keeping the
//! caller's error handling uniform. All variants are `Copy` so they can
//! be passed through events and logged without allocation.
//!
//! None of these are fatal to the engine: a rejected operation leaves
//! the live schedule and the persisted buffer exactly as they were.

use core::fmt;

use crate::app::ports::StorageError;
use crate::arbiter::Mode;

// ---------------------------------------------------------------------------
// Top-level engine error
// ---------------------------------------------------------------------------

/// Every fallible engine operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A candidate schedule holds more entries than `max_entries`.
    CapacityExceeded { count: usize, max: usize },
    /// A candidate schedule broke an ordering, overlap or shape rule.
    Validation(ValidationError),
    /// The engine configuration is inconsistent.
    Configuration(ConfigurationError),
    /// The time source cannot produce a valid time of day.
    ClockUnavailable,
    /// The storage backend refused a read or write.
    Storage(StorageError),
    /// The requested mode is not selectable in the current schedule state.
    ModeUnavailable(Mode),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CapacityExceeded { count, max } => {
                write!(f, "capacity exceeded: {count} entries, max {max}")
            }
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Configuration(e) => write!(f, "configuration: {e}"),
            Self::ClockUnavailable => write!(f, "clock unavailable"),
            Self::Storage(e) => write!(f, "storage: {e}"),
            Self::ModeUnavailable(mode) => write!(f, "mode {mode} unavailable"),
        }
    }
}

// ---------------------------------------------------------------------------
// Candidate schedule validation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// An entry field is not a time of day (0..=1439).
    TimeOutOfRange { index: usize },
    /// An interval entry starts and ends at the same minute.
    EmptyInterval { index: usize },
    /// Entry `index` does not start strictly after entry `index - 1`.
    Unsorted { index: usize },
    /// Two interval entries cover a common minute.
    Overlap { first: usize, second: usize },
    /// Interval entries offered to an instant engine, or vice versa.
    KindMismatch,
    /// A channel's value array does not match the entry count.
    ChannelLength {
        channel: usize,
        expected: usize,
        found: usize,
    },
    /// A configured channel has no values in the candidate.
    MissingChannel { channel: usize },
    /// The candidate carries values for a label no channel is configured with.
    UnknownChannel,
    /// A value does not fit the channel's declared kind.
    ValueOutOfRange { channel: usize, index: usize },
    /// The transport payload could not be parsed.
    Malformed(&'static str),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeOutOfRange { index } => write!(f, "entry {index}: time out of range"),
            Self::EmptyInterval { index } => write!(f, "entry {index}: empty interval"),
            Self::Unsorted { index } => write!(f, "entry {index}: not sorted"),
            Self::Overlap { first, second } => {
                write!(f, "entries {first} and {second} overlap")
            }
            Self::KindMismatch => write!(f, "entry kind does not match schedule kind"),
            Self::ChannelLength {
                channel,
                expected,
                found,
            } => write!(
                f,
                "channel {channel}: expected {expected} values, found {found}"
            ),
            Self::MissingChannel { channel } => write!(f, "channel {channel}: no values"),
            Self::UnknownChannel => write!(f, "values for unknown channel"),
            Self::ValueOutOfRange { channel, index } => {
                write!(f, "channel {channel}: value {index} out of range")
            }
            Self::Malformed(msg) => write!(f, "malformed schedule: {msg}"),
        }
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigurationError {
    /// `max_entries` is zero or above the supported limit.
    MaxEntriesOutOfRange,
    /// `OffValue` policy selected without an off-state literal.
    MissingOffValue { channel: usize },
    /// `ManualValue` policy selected without a manual-state literal.
    MissingManualValue { channel: usize },
    /// Two channels share a label.
    DuplicateLabel { channel: usize },
    /// A label does not fit the fixed label buffer.
    LabelTooLong { channel: usize },
    /// Data channels are only supported on interval schedules.
    ChannelsOnInstantSchedule,
    /// `name` is longer than an NVS namespace allows.
    NameTooLong,
    /// `source_id` does not fit the metadata slot.
    SourceIdTooLong,
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxEntriesOutOfRange => write!(f, "max_entries out of range"),
            Self::MissingOffValue { channel } => {
                write!(f, "channel {channel}: off_value policy needs an off value")
            }
            Self::MissingManualValue { channel } => {
                write!(f, "channel {channel}: manual_value policy needs a manual value")
            }
            Self::DuplicateLabel { channel } => write!(f, "channel {channel}: duplicate label"),
            Self::LabelTooLong { channel } => write!(f, "channel {channel}: label too long"),
            Self::ChannelsOnInstantSchedule => {
                write!(f, "data channels require an interval schedule")
            }
            Self::NameTooLong => write!(f, "name longer than an NVS namespace"),
            Self::SourceIdTooLong => write!(f, "source_id too long"),
        }
    }
}

impl From<ConfigurationError> for Error {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

impl From<StorageError> for Error {
    fn from(e: StorageError) -> Self {
        Self::Storage(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Engine-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
