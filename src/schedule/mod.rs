//! Schedule entries and the capacity-bounded buffer that holds them.
//!
//! ```text
//!   interval:  [start, end) [start, end) ... [TERM, TERM]
//!   instant:   [at] [at] ...                 [TERM]
//! ```
//!
//! A [`ScheduleBuffer`] is only ever built through [`ScheduleBuffer::new`],
//! which enforces the ordering, overlap and capacity rules.  Everything
//! downstream (evaluator, arbiter, channels) relies on those rules.

pub mod codec;
pub mod evaluator;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result, ValidationError};
use crate::time::{MINUTES_PER_DAY, TimeOfDay};

/// Default number of entries a schedule can hold.
pub const DEFAULT_MAX_ENTRIES: usize = 21;

/// Hard upper bound on `max_entries` (keeps indices and buffers small).
pub const MAX_ENTRIES_LIMIT: usize = 256;

// ═══════════════════════════════════════════════════════════════
//  Kinds and entries
// ═══════════════════════════════════════════════════════════════

/// Interval-based schedules switch a level on and off; instant-based
/// schedules fire a one-shot edge at each entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleKind {
    Interval,
    Instant,
}

impl ScheduleKind {
    /// Number of 16-bit time fields per persisted record.
    pub const fn fields_per_record(self) -> usize {
        match self {
            Self::Interval => 2,
            Self::Instant => 1,
        }
    }
}

/// One schedule entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleEntry {
    /// On from `start` (inclusive) until `end` (exclusive).  `end < start`
    /// spans midnight.
    Interval { start: TimeOfDay, end: TimeOfDay },
    /// Fires once a day at `at`.
    Instant { at: TimeOfDay },
}

impl ScheduleEntry {
    pub const fn kind(&self) -> ScheduleKind {
        match self {
            Self::Interval { .. } => ScheduleKind::Interval,
            Self::Instant { .. } => ScheduleKind::Instant,
        }
    }

    /// Start of an interval, or the trigger time of an instant.
    pub const fn start(&self) -> TimeOfDay {
        match *self {
            Self::Interval { start, .. } => start,
            Self::Instant { at } => at,
        }
    }

    /// True for intervals that run past midnight.
    pub fn wraps(&self) -> bool {
        matches!(*self, Self::Interval { start, end } if start > end)
    }

    /// Whether the interval covers `now`.  Start inclusive, end exclusive.
    /// Instants never cover anything.
    pub fn contains(&self, now: TimeOfDay) -> bool {
        match *self {
            Self::Interval { start, end } if start <= end => start <= now && now < end,
            Self::Interval { start, end } => now >= start || now < end,
            Self::Instant { .. } => false,
        }
    }

    /// The interval as at most two non-wrapping half-open minute ranges.
    fn segments(&self) -> [(u16, u16); 2] {
        match *self {
            Self::Interval { start, end } if start <= end => {
                [(start.minutes(), end.minutes()), (0, 0)]
            }
            Self::Interval { start, end } => {
                [(start.minutes(), MINUTES_PER_DAY), (0, end.minutes())]
            }
            Self::Instant { at } => [(at.minutes(), at.minutes() + 1), (0, 0)],
        }
    }

    /// Whether two intervals cover a common minute.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.segments().iter().any(|a| {
            other
                .segments()
                .iter()
                .any(|b| a.0 < a.1 && b.0 < b.1 && a.0 < b.1 && b.0 < a.1)
        })
    }
}

// ═══════════════════════════════════════════════════════════════
//  Buffer
// ═══════════════════════════════════════════════════════════════

/// Ordered, validated, capacity-bounded list of entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleBuffer {
    kind: ScheduleKind,
    max_entries: usize,
    entries: Vec<ScheduleEntry>,
}

impl ScheduleBuffer {
    /// An empty schedule (first boot, or after an invalid load).
    pub fn empty(kind: ScheduleKind, max_entries: usize) -> Self {
        Self {
            kind,
            max_entries,
            entries: Vec::new(),
        }
    }

    /// Validate and wrap `entries`.
    pub fn new(kind: ScheduleKind, max_entries: usize, entries: Vec<ScheduleEntry>) -> Result<Self> {
        validate_entries(kind, max_entries, &entries)?;
        Ok(Self {
            kind,
            max_entries,
            entries,
        })
    }

    pub fn kind(&self) -> ScheduleKind {
        self.kind
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&ScheduleEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Check every buffer invariant without building anything.
///
/// Order of checks: capacity, kind, shape, ordering, overlap.  The first
/// violation found is reported.
pub fn validate_entries(kind: ScheduleKind, max_entries: usize, entries: &[ScheduleEntry]) -> Result<()> {
    if entries.len() > max_entries {
        return Err(Error::CapacityExceeded {
            count: entries.len(),
            max: max_entries,
        });
    }

    for (index, entry) in entries.iter().enumerate() {
        if entry.kind() != kind {
            return Err(ValidationError::KindMismatch.into());
        }
        if let ScheduleEntry::Interval { start, end } = *entry {
            if start == end {
                return Err(ValidationError::EmptyInterval { index }.into());
            }
        }
        if index > 0 && entry.start() <= entries[index - 1].start() {
            return Err(ValidationError::Unsorted { index }.into());
        }
    }

    if kind == ScheduleKind::Interval {
        for first in 0..entries.len() {
            for second in first + 1..entries.len() {
                if entries[first].overlaps(&entries[second]) {
                    return Err(ValidationError::Overlap { first, second }.into());
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn interval(start: u16, end: u16) -> ScheduleEntry {
    ScheduleEntry::Interval {
        start: TimeOfDay::from_minutes(start).unwrap(),
        end: TimeOfDay::from_minutes(end).unwrap(),
    }
}

#[cfg(test)]
pub(crate) fn instant(at: u16) -> ScheduleEntry {
    ScheduleEntry::Instant {
        at: TimeOfDay::from_minutes(at).unwrap(),
    }
}
