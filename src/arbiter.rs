//! Operator mode arbitration.
//!
//! The arbiter sits between the evaluator and everything observable:
//!
//! ```text
//!   raw state ──▶ ModeArbiter(mode) ──▶ effective state
//! ```
//!
//! Interval engines offer five modes.  `EarlyOff` and `BoostOn` are
//! edge-armed: the first tick after selection anchors them to the current
//! [`Segment`] and the first tick in a different segment reverts the
//! arbiter to `Auto`.  Instant engines only gate edges on or off.

use core::fmt;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schedule::ScheduleKind;
use crate::schedule::evaluator::{IntervalEvaluation, Segment};

// ═══════════════════════════════════════════════════════════════
//  Modes
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IntervalMode {
    ManualOff,
    EarlyOff,
    Auto,
    ManualOn,
    BoostOn,
}

impl IntervalMode {
    pub const ALL: [Self; 5] = [
        Self::ManualOff,
        Self::EarlyOff,
        Self::Auto,
        Self::ManualOn,
        Self::BoostOn,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::ManualOff => "Manual Off",
            Self::EarlyOff => "Early Off",
            Self::Auto => "Auto",
            Self::ManualOn => "Manual On",
            Self::BoostOn => "Boost On",
        }
    }

    /// Modes that need a schedule to mean anything.
    pub const fn needs_schedule(self) -> bool {
        matches!(self, Self::EarlyOff | Self::Auto | Self::BoostOn)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InstantMode {
    Disabled,
    Enabled,
}

impl InstantMode {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Disabled => "Disabled",
            Self::Enabled => "Enabled",
        }
    }
}

/// Operator-selected mode, tagged by schedule kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mode {
    Interval(IntervalMode),
    Instant(InstantMode),
}

impl Mode {
    /// Mode used on first boot.
    pub const fn default_for(kind: ScheduleKind) -> Self {
        match kind {
            ScheduleKind::Interval => Self::Interval(IntervalMode::ManualOff),
            ScheduleKind::Instant => Self::Instant(InstantMode::Enabled),
        }
    }

    pub const fn kind(self) -> ScheduleKind {
        match self {
            Self::Interval(_) => ScheduleKind::Interval,
            Self::Instant(_) => ScheduleKind::Instant,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Interval(m) => m.name(),
            Self::Instant(m) => m.name(),
        }
    }

    /// Look up a mode by its display name ("Boost On", "Enabled", ...).
    pub fn from_name(kind: ScheduleKind, name: &str) -> Option<Self> {
        match kind {
            ScheduleKind::Interval => IntervalMode::ALL
                .into_iter()
                .find(|m| m.name() == name)
                .map(Self::Interval),
            ScheduleKind::Instant => [InstantMode::Disabled, InstantMode::Enabled]
                .into_iter()
                .find(|m| m.name() == name)
                .map(Self::Instant),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════
//  Arbiter
// ═══════════════════════════════════════════════════════════════

/// Outcome of one interval arbitration step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Effective output.
    pub on: bool,
    /// Set when `EarlyOff`/`BoostOn` crossed a boundary and fell back to `Auto`.
    pub reverted: bool,
}

#[derive(Debug, Clone)]
pub struct ModeArbiter {
    mode: Mode,
    /// Segment a pending `EarlyOff`/`BoostOn` is anchored to.
    anchor: Option<Segment>,
    /// Last interval output, held while the clock is unavailable.
    held: bool,
    /// Schedule is empty or invalid.
    restricted: bool,
    /// The instant engine was disabled by the restriction, not the operator.
    forced_disabled: bool,
}

impl ModeArbiter {
    /// Start in `mode` (restored or default) and apply the restriction for
    /// the current schedule state.
    pub fn new(mode: Mode, schedule_available: bool) -> Self {
        let mut arbiter = Self {
            mode,
            anchor: None,
            held: false,
            restricted: false,
            forced_disabled: false,
        };
        arbiter.set_schedule_available(schedule_available);
        arbiter
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Whether the effective state currently follows the operator, not the
    /// schedule.
    pub fn is_override(&self) -> bool {
        matches!(
            self.mode,
            Mode::Interval(IntervalMode::ManualOff | IntervalMode::ManualOn)
        )
    }

    /// Operator selection.  Returns `true` if the mode actually changed.
    pub fn select(&mut self, mode: Mode) -> Result<bool> {
        if mode.kind() != self.mode.kind() || !self.is_selectable(mode) {
            return Err(Error::ModeUnavailable(mode));
        }
        self.forced_disabled = false;
        if mode == self.mode {
            return Ok(false);
        }
        self.mode = mode;
        self.anchor = None;
        Ok(true)
    }

    /// Whether `mode` may be selected in the current schedule state.
    pub fn is_selectable(&self, mode: Mode) -> bool {
        if !self.restricted {
            return true;
        }
        match mode {
            Mode::Interval(m) => !m.needs_schedule(),
            Mode::Instant(m) => m == InstantMode::Disabled,
        }
    }

    /// React to a schedule load or sync.  Returns the new mode if the
    /// restriction forced a change.
    pub fn set_schedule_available(&mut self, available: bool) -> Option<Mode> {
        self.restricted = !available;
        self.anchor = None;

        let forced = match self.mode {
            Mode::Interval(m) if !available && m.needs_schedule() => {
                Some(Mode::Interval(IntervalMode::ManualOff))
            }
            Mode::Instant(InstantMode::Enabled) if !available => {
                self.forced_disabled = true;
                Some(Mode::Instant(InstantMode::Disabled))
            }
            Mode::Instant(InstantMode::Disabled) if available && self.forced_disabled => {
                self.forced_disabled = false;
                Some(Mode::Instant(InstantMode::Enabled))
            }
            _ => None,
        };
        if let Some(mode) = forced {
            info!("Mode forced {} -> {}", self.mode, mode);
            self.mode = mode;
        }
        forced
    }

    /// Combine the interval evaluation with the mode.  `None` means the
    /// clock is unavailable: time-dependent modes hold their last output.
    pub fn resolve(&mut self, eval: Option<&IntervalEvaluation>) -> Resolution {
        let Mode::Interval(mode) = self.mode else {
            return Resolution {
                on: false,
                reverted: false,
            };
        };

        let mut reverted = false;
        let on = match (mode, eval) {
            (IntervalMode::ManualOff, _) => false,
            (IntervalMode::ManualOn, _) => true,
            (_, None) => self.held,
            (IntervalMode::Auto, Some(eval)) => eval.on,
            (IntervalMode::EarlyOff | IntervalMode::BoostOn, Some(eval)) => {
                match self.anchor {
                    Some(anchor) if anchor != eval.segment => {
                        info!("{} reached a boundary, reverting to Auto", mode.name());
                        self.mode = Mode::Interval(IntervalMode::Auto);
                        self.anchor = None;
                        reverted = true;
                        eval.on
                    }
                    _ => {
                        self.anchor = Some(eval.segment);
                        mode == IntervalMode::BoostOn
                    }
                }
            }
        };

        self.held = on;
        Resolution { on, reverted }
    }

    /// Gate instant edges: `Disabled` evaluates but discards them.
    pub fn gate(&self, fired: Vec<usize>) -> Vec<usize> {
        match self.mode {
            Mode::Instant(InstantMode::Enabled) => fired,
            _ => Vec::new(),
        }
    }
}
