//! Robot time model.
//!
//! # Design
//!
//! The behavior system is driven by a single cooperative tick loop.  Time is
//! tracked two ways at once, both held in `RobotClock`:
//!
//!   - `current_tick` — a monotonically increasing `Tick` counter, used for
//!     "same tick" checks and freshness windows measured in ticks.
//!   - `time_s` — basestation time in seconds, used for cooldowns and
//!     state durations.
//!
//! A fixed-rate loop advances both together (`advance`).  Tests and replay
//! tools may advance by an arbitrary number of seconds (`advance_by`) while
//! still counting exactly one tick.

use std::fmt;

use serde::{Deserialize, Serialize};

// ── Tick ─────────────────────────────────────────────────────────────────────

/// An absolute robot tick counter.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default, Serialize, Deserialize)]
pub struct Tick(pub u64);

impl Tick {
    pub const ZERO: Tick = Tick(0);

    /// Return the tick `n` steps after `self`.
    #[inline]
    pub fn offset(self, n: u64) -> Tick {
        Tick(self.0 + n)
    }

    /// Ticks elapsed from `earlier` to `self`, saturating at zero.
    #[inline]
    pub fn since(self, earlier: Tick) -> u64 {
        self.0.saturating_sub(earlier.0)
    }
}

impl std::ops::Add<u64> for Tick {
    type Output = Tick;
    #[inline]
    fn add(self, rhs: u64) -> Tick {
        Tick(self.0 + rhs)
    }
}

impl std::ops::Sub for Tick {
    type Output = u64;
    #[inline]
    fn sub(self, rhs: Tick) -> u64 {
        self.0 - rhs.0
    }
}

impl fmt::Display for Tick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ── RobotClock ────────────────────────────────────────────────────────────────

/// Tick counter plus basestation time in seconds.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RobotClock {
    /// Seconds one regular tick represents.
    pub tick_duration_s: f64,
    /// The current tick, advanced once per behavior-system update.
    pub current_tick: Tick,
    /// Basestation time of `current_tick`, in seconds.
    pub time_s: f64,
}

impl RobotClock {
    /// Create a clock at tick 0, time 0.0 with the given resolution.
    pub fn new(tick_duration_s: f64) -> Self {
        Self {
            tick_duration_s,
            current_tick: Tick::ZERO,
            time_s: 0.0,
        }
    }

    /// Advance by one regular tick.
    #[inline]
    pub fn advance(&mut self) {
        self.advance_by(self.tick_duration_s);
    }

    /// Advance by one tick that spans `secs` seconds.
    #[inline]
    pub fn advance_by(&mut self, secs: f64) {
        self.current_tick = self.current_tick + 1;
        self.time_s += secs.max(0.0);
    }

    #[inline]
    pub fn now_s(&self) -> f64 {
        self.time_s
    }

    #[inline]
    pub fn tick(&self) -> Tick {
        self.current_tick
    }
}

impl Default for RobotClock {
    fn default() -> Self {
        Self::new(SystemConfig::default().tick_duration_s)
    }
}

impl fmt::Display for RobotClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:.3}s)", self.current_tick, self.time_s)
    }
}

// ── SystemConfig ──────────────────────────────────────────────────────────────

/// Top-level behavior-system configuration.
///
/// Loaded from JSON by the application (every field has a default, so `{}`
/// is a valid config) and passed explicitly to the system builder.  Nothing
/// in the behavior system reads process-wide settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SystemConfig {
    /// Seconds per robot tick.  Default: 0.06 (the engine's 60 ms tick).
    pub tick_duration_s: f64,

    /// Master seed for per-behavior RNGs.  The same seed always produces
    /// identical dispatch choices.
    pub seed: u64,

    /// Iteration cap for the linked-activatable-scope walk.  Malformed
    /// (cyclic) declarations stop here with a warning instead of hanging.
    pub max_linked_scope_iterations: usize,

    /// A post-behavior suggestion older than this many ticks is ignored when
    /// choosing a resume state.
    pub suggestion_freshness_ticks: u64,

    /// Window, in ticks, over which the cycle monitor counts re-pushes of the
    /// same behavior.
    pub cycle_window_ticks: u64,

    /// Re-pushes of one behavior within `cycle_window_ticks` that the cycle
    /// monitor tolerates before reporting a cycle.
    pub cycle_max_pushes: usize,

    /// Install the visualization monitor (dev builds).
    pub dev_monitors: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            tick_duration_s:             0.06,
            seed:                        0,
            max_linked_scope_iterations: 1_000,
            suggestion_freshness_ticks:  5,
            cycle_window_ticks:          20,
            cycle_max_pushes:            6,
            dev_monitors:                true,
        }
    }
}

impl SystemConfig {
    /// Construct a `RobotClock` pre-configured for this run.
    pub fn make_clock(&self) -> RobotClock {
        RobotClock::new(self.tick_duration_s)
    }
}
