//! Raw (un-overridden) schedule state from wall-clock time.
//!
//! Two variants, selected by the buffer's [`ScheduleKind`]:
//!
//! - **Interval**: a level: on iff some entry covers `now`.
//! - **Instant**: edges: each entry fires once per day at the first
//!   tick that reaches or passes its time.
//!
//! Neither variant samples the clock; the caller passes the one `now`
//! it sampled for the whole tick.

use log::debug;

use crate::time::{MINUTES_PER_DAY, TimeOfDay};

use super::{ScheduleBuffer, ScheduleKind};

// ═══════════════════════════════════════════════════════════════
//  Interval variant
// ═══════════════════════════════════════════════════════════════

/// Which part of the daily cycle `now` falls in.
///
/// Two ticks in different segments are separated by at least one
/// interval boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    /// Inside entry `i`.
    Inside(usize),
    /// Between entries, waiting for entry `next` to start.
    Gap { next: usize },
    /// The schedule has no entries.
    Empty,
}

/// Result of evaluating an interval schedule at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalEvaluation {
    /// Raw on/off state.
    pub on: bool,
    /// Index of the covering entry, if any.
    pub active: Option<usize>,
    pub segment: Segment,
}

/// Evaluate an interval schedule at `now`.
///
/// Entries never overlap, so at most one covers `now`; a linear scan is
/// bounded by `max_entries`.
pub fn evaluate_interval(buffer: &ScheduleBuffer, now: TimeOfDay) -> IntervalEvaluation {
    debug_assert_eq!(buffer.kind(), ScheduleKind::Interval);

    let active = buffer.entries().iter().position(|e| e.contains(now));
    let segment = match (active, next_index(buffer, now)) {
        (Some(i), _) => Segment::Inside(i),
        (None, Some(next)) => Segment::Gap { next },
        (None, None) => Segment::Empty,
    };
    IntervalEvaluation {
        on: active.is_some(),
        active,
        segment,
    }
}

/// Index of the next entry to start strictly after `now`, wrapping to
/// the first entry of tomorrow.  `None` only for an empty schedule.
pub fn next_index(buffer: &ScheduleBuffer, now: TimeOfDay) -> Option<usize> {
    if buffer.is_empty() {
        return None;
    }
    Some(
        buffer
            .entries()
            .iter()
            .position(|e| e.start() > now)
            .unwrap_or(0),
    )
}

/// Index of the entry that started most recently at or before `now`,
/// wrapping to the last entry of yesterday.  `None` only when empty.
pub fn most_recent_index(buffer: &ScheduleBuffer, now: TimeOfDay) -> Option<usize> {
    if buffer.is_empty() {
        return None;
    }
    Some(
        buffer
            .entries()
            .iter()
            .rposition(|e| e.start() <= now)
            .unwrap_or(buffer.len() - 1),
    )
}

// ═══════════════════════════════════════════════════════════════
//  Instant variant
// ═══════════════════════════════════════════════════════════════

/// Largest backward step, in minutes, treated as a clock correction
/// rather than a pass through midnight.
pub const MAX_CLOCK_CORRECTION: u16 = MINUTES_PER_DAY / 2;

/// Remembers the previous tick so each instant fires exactly once.
#[derive(Debug, Clone, Default)]
pub struct InstantTracker {
    prev: Option<TimeOfDay>,
}

impl InstantTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the previous tick (boot, clock loss).  The next tick only
    /// fires entries exactly at its own time.
    pub fn reset(&mut self) {
        self.prev = None;
    }

    pub fn previous(&self) -> Option<TimeOfDay> {
        self.prev
    }

    /// Advance to `now` and return the indices of the entries that fire.
    ///
    /// The firing window is `(prev, now]`.  When `now < prev` the day has
    /// rolled over and the window is `(prev, 23:59] ∪ [00:00, now]`, which
    /// re-arms every entry at midnight.
    ///
    /// A step back of at most [`MAX_CLOCK_CORRECTION`] minutes is a clock
    /// correction, not a rollover: nothing fires and `prev` is kept, so
    /// entries already fired in `(now, prev]` stay fired.
    pub fn advance(&mut self, buffer: &ScheduleBuffer, now: TimeOfDay) -> Vec<usize> {
        debug_assert_eq!(buffer.kind(), ScheduleKind::Instant);

        if let Some(prev) = self.prev {
            let back = (prev.minutes() + MINUTES_PER_DAY - now.minutes()) % MINUTES_PER_DAY;
            if back != 0 && back <= MAX_CLOCK_CORRECTION {
                debug!("Clock stepped back {} min ({} -> {}), holding", back, prev, now);
                return Vec::new();
            }
        }

        let prev = self.prev.replace(now);
        let in_window = |at: TimeOfDay| match prev {
            None => at == now,
            Some(prev) if prev <= now => prev < at && at <= now,
            Some(prev) => at > prev || at <= now,
        };

        buffer
            .entries()
            .iter()
            .enumerate()
            .filter(|(_, e)| in_window(e.start()))
            .map(|(i, _)| i)
            .collect()
    }
}
