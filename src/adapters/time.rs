//! Time-of-day adapters.
//!
//! - [`RtcClock`] (feature `espidf`) reads the system wall clock via
//!   `gettimeofday()` + `localtime_r()`, so it follows SNTP and the `TZ`
//!   setting.  Reports `None` until the clock has been set.
//! - [`SimClock`] is a settable clock for host-side tests and simulation.

use crate::app::ports::TimeSource;
use crate::time::{MINUTES_PER_DAY, TimeOfDay};

/// Wall clock of the ESP32 system timer.
#[cfg(feature = "espidf")]
#[derive(Debug, Default)]
pub struct RtcClock;

#[cfg(feature = "espidf")]
impl RtcClock {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(feature = "espidf")]
impl TimeSource for RtcClock {
    fn now(&self) -> Option<TimeOfDay> {
        use core::ptr;
        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        if unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } != 0 {
            return None;
        }
        // Reject obviously unsynced time (e.g. before 2020-01-01)
        const EPOCH_2020: i64 = 1_577_836_800;
        if (tv.tv_sec as i64) < EPOCH_2020 {
            return None;
        }
        let secs = tv.tv_sec as esp_idf_svc::sys::time_t;
        let mut tm: esp_idf_svc::sys::tm = unsafe { core::mem::zeroed() };
        if unsafe { esp_idf_svc::sys::localtime_r(&secs, &mut tm) }.is_null() {
            return None;
        }
        let hour = u8::try_from(tm.tm_hour).ok()?;
        let minute = u8::try_from(tm.tm_min).ok()?;
        TimeOfDay::from_hm(hour, minute)
    }
}

/// Settable clock for host builds.
#[derive(Debug, Clone, Default)]
pub struct SimClock {
    now: Option<TimeOfDay>,
}

impl SimClock {
    /// A clock that has not been set.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(now: TimeOfDay) -> Self {
        Self { now: Some(now) }
    }

    pub fn set(&mut self, now: Option<TimeOfDay>) {
        self.now = now;
    }

    /// Move forward by `minutes`, wrapping at midnight.  No-op while unset.
    pub fn advance(&mut self, minutes: u16) {
        if let Some(t) = self.now {
            let next = (u32::from(t.minutes()) + u32::from(minutes)) % u32::from(MINUTES_PER_DAY);
            self.now = TimeOfDay::from_minutes(next as u16);
        }
    }
}

impl TimeSource for SimClock {
    fn now(&self) -> Option<TimeOfDay> {
        self.now
    }
}
