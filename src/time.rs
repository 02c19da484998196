//! Time-of-day type shared by every schedule component.
//!
//! A [`TimeOfDay`] is minutes since local midnight, `0..=1439`.  The raw
//! value `0xFFFF` is reserved as the "unused / terminator" sentinel in the
//! persisted layout and is never a valid time.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Minutes in one day.
pub const MINUTES_PER_DAY: u16 = 1440;

/// Raw value marking an unused field in the persisted buffer.
pub const SENTINEL: u16 = 0xFFFF;

/// Minutes since local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct TimeOfDay(u16);

impl TimeOfDay {
    pub const MIDNIGHT: Self = Self(0);
    pub const LAST_MINUTE: Self = Self(MINUTES_PER_DAY - 1);

    /// Build from raw minutes; `None` for anything outside `0..=1439`.
    pub const fn from_minutes(minutes: u16) -> Option<Self> {
        if minutes < MINUTES_PER_DAY {
            Some(Self(minutes))
        } else {
            None
        }
    }

    /// Build from wall-clock fields.
    pub const fn from_hm(hour: u8, minute: u8) -> Option<Self> {
        if hour < 24 && minute < 60 {
            Some(Self(hour as u16 * 60 + minute as u16))
        } else {
            None
        }
    }

    /// Parse `HH:MM` or `HH:MM:SS`.  Seconds are validated then dropped.
    /// `24:00` (and `24:00:00`) is accepted as the end of the day and maps
    /// to midnight, which is how external schedules express "until midnight".
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.trim().split(':');
        let hour: u8 = parts.next()?.parse().ok()?;
        let minute: u8 = parts.next()?.parse().ok()?;
        let second: u8 = match parts.next() {
            Some(s) => s.parse().ok()?,
            None => 0,
        };
        if parts.next().is_some() || second >= 60 {
            return None;
        }
        if hour == 24 && minute == 0 && second == 0 {
            return Some(Self::MIDNIGHT);
        }
        Self::from_hm(hour, minute)
    }

    pub const fn minutes(self) -> u16 {
        self.0
    }

    pub const fn hour(self) -> u8 {
        (self.0 / 60) as u8
    }

    pub const fn minute(self) -> u8 {
        (self.0 % 60) as u8
    }
}

impl TryFrom<u16> for TimeOfDay {
    type Error = &'static str;

    fn try_from(minutes: u16) -> Result<Self, Self::Error> {
        Self::from_minutes(minutes).ok_or("time of day out of range")
    }
}

impl From<TimeOfDay> for u16 {
    fn from(t: TimeOfDay) -> Self {
        t.0
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour(), self.minute())
    }
}
