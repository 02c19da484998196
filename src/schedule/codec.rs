//! Persisted byte layout of a schedule.
//!
//! Every time field is a little-endian `u16`.  Interval records are
//! `(start, end)`, instant records are `(at)`.  The used records are
//! followed by one terminator record whose fields are all `0xFFFF`:
//!
//! ```text
//! interval, max_entries = 3, two entries (capacity 16 bytes):
//!
//!   E0 01 1C 02 | B0 04 3C 00 | FF FF FF FF | 00 00 00 00
//!   480   540     1200  60      terminator    unused
//! ```
//!
//! Capacity is `fields × max_entries × 2 + fields × 2` bytes, so a full
//! schedule still has room for its terminator.  Bytes after the terminator
//! are written as zero and ignored on decode.

use crate::error::{Error, Result, ValidationError};
use crate::time::{SENTINEL, TimeOfDay};

use super::{ScheduleBuffer, ScheduleEntry, ScheduleKind, validate_entries};

/// Size in bytes of the persisted buffer for `kind` and `max_entries`.
pub const fn capacity_bytes(kind: ScheduleKind, max_entries: usize) -> usize {
    let fields = kind.fields_per_record();
    fields * max_entries * 2 + fields * 2
}

/// Encode a validated buffer into a full-capacity byte image.
pub fn encode(buffer: &ScheduleBuffer) -> Result<Vec<u8>> {
    encode_entries(buffer.kind(), buffer.max_entries(), buffer.entries())
}

/// Encode raw entries.  Fails with `CapacityExceeded` above `max_entries`.
pub fn encode_entries(kind: ScheduleKind, max_entries: usize, entries: &[ScheduleEntry]) -> Result<Vec<u8>> {
    if entries.len() > max_entries {
        return Err(Error::CapacityExceeded {
            count: entries.len(),
            max: max_entries,
        });
    }

    let mut out = Vec::with_capacity(capacity_bytes(kind, max_entries));
    for entry in entries {
        match (kind, *entry) {
            (ScheduleKind::Interval, ScheduleEntry::Interval { start, end }) => {
                out.extend_from_slice(&start.minutes().to_le_bytes());
                out.extend_from_slice(&end.minutes().to_le_bytes());
            }
            (ScheduleKind::Instant, ScheduleEntry::Instant { at }) => {
                out.extend_from_slice(&at.minutes().to_le_bytes());
            }
            _ => return Err(ValidationError::KindMismatch.into()),
        }
    }
    for _ in 0..kind.fields_per_record() {
        out.extend_from_slice(&SENTINEL.to_le_bytes());
    }
    out.resize(capacity_bytes(kind, max_entries), 0);
    Ok(out)
}

/// Decode a persisted image.
///
/// Stops at the first terminator or after `max_entries` records.  A
/// missing terminator is not an error, and a short image simply yields
/// fewer records.  A record that mixes sentinel and non-sentinel fields,
/// holds a time above 23:59, or a decoded list that breaks the ordering
/// rules is reported as an error: the stored schedule is unusable.
pub fn decode(kind: ScheduleKind, max_entries: usize, bytes: &[u8]) -> Result<ScheduleBuffer> {
    let fields = kind.fields_per_record();
    let record_len = fields * 2;
    let mut entries = Vec::new();

    for (index, record) in bytes.chunks_exact(record_len).take(max_entries).enumerate() {
        let mut raw = [0u16; 2];
        for (slot, pair) in raw.iter_mut().zip(record.chunks_exact(2)) {
            *slot = u16::from_le_bytes([pair[0], pair[1]]);
        }
        let raw = &raw[..fields];

        if raw.iter().all(|&v| v == SENTINEL) {
            break;
        }
        let field = |i: usize| {
            TimeOfDay::from_minutes(raw[i]).ok_or(ValidationError::TimeOutOfRange { index })
        };
        let entry = match kind {
            ScheduleKind::Interval => ScheduleEntry::Interval {
                start: field(0)?,
                end: field(1)?,
            },
            ScheduleKind::Instant => ScheduleEntry::Instant { at: field(0)? },
        };
        entries.push(entry);
    }

    validate_entries(kind, max_entries, &entries)?;
    Ok(ScheduleBuffer {
        kind,
        max_entries,
        entries,
    })
}
