//! Fixed-capacity persisted slots over a [`StoragePort`].
//!
//! One engine instance owns these slots, all in the engine's namespace:
//!
//! | Key          | Contents                                   |
//! |--------------|--------------------------------------------|
//! | `sched`      | codec image of the schedule                |
//! | `meta`       | postcard-encoded [`EngineMeta`]            |
//! | `d<hash>`    | one channel image per label (FNV-1a hash)  |
//!
//! Capacities are computed once from the configuration and never change
//! for the lifetime of the instance.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::arbiter::Mode;
use crate::config::{EngineConfig, MAX_SOURCE_ID_LEN};
use crate::schedule::codec;

/// NVS limits namespaces and keys to 15 characters.
pub const MAX_NAME_LEN: usize = 15;

/// Two mode tags, the source id length prefix and the source id itself.
const META_CAPACITY: usize = MAX_SOURCE_ID_LEN + 8;

// ───────────────────────────────────────────────────────────────
// PersistedBuffer
// ───────────────────────────────────────────────────────────────

/// A fixed-capacity byte slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedBuffer {
    namespace: String,
    key: String,
    capacity: usize,
}

impl PersistedBuffer {
    /// `namespace` and `key` must already fit [`MAX_NAME_LEN`];
    /// [`EngineConfig::validate`] enforces this for engine names.
    pub fn new(namespace: &str, key: &str, capacity: usize) -> Self {
        debug_assert!(namespace.len() <= MAX_NAME_LEN && key.len() <= MAX_NAME_LEN);
        Self {
            namespace: namespace.into(),
            key: key.into(),
            capacity,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Load exactly `capacity` bytes.  Shorter stored blobs are padded
    /// with zeros; a missing slot is `NotFound`.
    pub fn load(&self, storage: &impl StoragePort) -> Result<Vec<u8>, StorageError> {
        let mut buf = vec![0u8; self.capacity];
        let len = storage.read(&self.namespace, &self.key, &mut buf)?;
        debug!("Loaded {}/{} bytes from {}::{}", len, self.capacity, self.namespace, self.key);
        Ok(buf)
    }

    /// Write `bytes` (at most `capacity`).
    pub fn save(&self, storage: &mut impl StoragePort, bytes: &[u8]) -> Result<(), StorageError> {
        if bytes.len() > self.capacity {
            return Err(StorageError::Overflow);
        }
        storage.write(&self.namespace, &self.key, bytes)
    }

    pub fn exists(&self, storage: &impl StoragePort) -> bool {
        storage.exists(&self.namespace, &self.key)
    }
}

/// 32-bit FNV-1a, used to derive short stable keys from channel labels.
fn fnv1a(text: &str) -> u32 {
    text.bytes().fold(0x811c_9dc5, |hash, b| {
        (hash ^ u32::from(b)).wrapping_mul(0x0100_0193)
    })
}

// ───────────────────────────────────────────────────────────────
// Engine metadata
// ───────────────────────────────────────────────────────────────

/// Small record persisted next to the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineMeta {
    /// Last operator-selected (or forced) mode.
    pub mode: Mode,
    /// Source the stored schedule was synced from; empty when unbound.
    pub source_id: String,
}

impl EngineMeta {
    pub fn to_bytes(&self) -> Result<Vec<u8>, StorageError> {
        postcard::to_allocvec(self).map_err(|_| StorageError::Overflow)
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        postcard::from_bytes(bytes).ok()
    }
}

// ───────────────────────────────────────────────────────────────
// Slot set
// ───────────────────────────────────────────────────────────────

/// Every slot one engine instance uses.
#[derive(Debug, Clone)]
pub struct EngineSlots {
    pub schedule: PersistedBuffer,
    pub meta: PersistedBuffer,
    /// Parallel to `EngineConfig::channels`.
    pub channels: Vec<PersistedBuffer>,
}

impl EngineSlots {
    pub fn for_config(config: &EngineConfig) -> Self {
        let ns = config.name.as_str();
        Self {
            schedule: PersistedBuffer::new(
                ns,
                "sched",
                codec::capacity_bytes(config.kind, config.max_entries),
            ),
            meta: PersistedBuffer::new(ns, "meta", META_CAPACITY),
            channels: config
                .channels
                .iter()
                .map(|c| {
                    let key = format!("d{:08x}", fnv1a(&c.label));
                    PersistedBuffer::new(ns, &key, config.max_entries * c.value_kind.width())
                })
                .collect(),
        }
    }
}
