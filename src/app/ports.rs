//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ScheduleService (domain)
//! ```
//!
//! Driven adapters (clock, storage, schedule transport, event sinks)
//! implement these traits.  The [`ScheduleService`](super::service::ScheduleService)
//! receives them at construction (or per call, for the sink), so the
//! engine never touches the RTC, flash or network directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use crate::time::TimeOfDay;

// ───────────────────────────────────────────────────────────────
// Time source (driven adapter: RTC / SNTP → domain)
// ───────────────────────────────────────────────────────────────

/// Wall-clock time of day.
pub trait TimeSource {
    /// Current local time of day, or `None` while the clock is not set
    /// (before SNTP, after an RTC fault).  Sampled once per tick.
    fn now(&self) -> Option<TimeOfDay>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value blob storage.
///
/// - Keys are namespaced to prevent collisions between engine instances.
/// - Write operations MUST be atomic, with no partial writes on power loss.
///   The ESP-IDF NVS API guarantees this natively; in-memory simulation
///   achieves it trivially.
pub trait StoragePort {
    /// Read a value.  Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key.  Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;

    /// Check whether a key exists without reading it.
    fn exists(&self, namespace: &str, key: &str) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Schedule source (driven adapter: domain → hub transport)
// ───────────────────────────────────────────────────────────────

/// Transport to the external scheduling authority.
///
/// The request is fire-and-forget: the complete candidate comes back
/// later as [`EngineCommand::ApplySchedule`](super::commands::EngineCommand::ApplySchedule).
pub trait ScheduleSource {
    /// Ask for the current definition of `source_id`.
    fn request_schedule(&mut self, source_id: &str) -> Result<(), SourceError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / host entities)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`EngineEvent`](super::events::EngineEvent)s
/// through this port.  Adapters decide where they go (serial log, host
/// entity state, MQTT, etc.).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::EngineEvent);
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested key does not exist.
    NotFound,
    /// Storage partition is full.
    Full,
    /// Generic I/O error.
    IoError,
    /// Payload larger than the slot's fixed capacity.
    Overflow,
}

/// Errors from [`ScheduleSource`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceError {
    /// The transport has no connection to the hub.
    NotConnected,
    /// The hub refused the request (unknown entity, no permission).
    Rejected,
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Overflow => write!(f, "payload exceeds slot capacity"),
        }
    }
}

impl core::fmt::Display for SourceError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotConnected => write!(f, "source not connected"),
            Self::Rejected => write!(f, "request rejected by source"),
        }
    }
}
