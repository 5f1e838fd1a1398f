//! Cycle timing math.
//!
//! Converts a fractional duty cycle and a master cycle length into concrete
//! on/off durations, honoring minimum activation and deactivation dwell
//! times, and computes staggered start offsets that minimize how many
//! actuators are simultaneously energized.

use crate::error::{CycleError, CycleResult};
use serde::{Deserialize, Serialize};
use tz_core::{Real, clamp_unit};

/// Master cycle configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleConfig {
    /// Master cycle length in minutes.
    pub cycle_min: u32,
    /// Shortest on-window worth activating, seconds. Anything shorter is
    /// coerced to zero.
    pub min_activation_delay_sec: u32,
    /// Shortest acceptable off-window, seconds. Anything shorter keeps the
    /// actuator on for the whole cycle instead.
    pub min_deactivation_delay_sec: u32,
}

impl CycleConfig {
    /// Create a cycle configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `cycle_min` is zero or a dwell time exceeds the
    /// cycle itself.
    pub fn new(
        cycle_min: u32,
        min_activation_delay_sec: u32,
        min_deactivation_delay_sec: u32,
    ) -> CycleResult<Self> {
        if cycle_min == 0 {
            return Err(CycleError::InvalidArg {
                what: "cycle_min must be positive",
            });
        }
        let cycle_sec = cycle_min * 60;
        if min_activation_delay_sec > cycle_sec || min_deactivation_delay_sec > cycle_sec {
            return Err(CycleError::InvalidArg {
                what: "dwell times cannot exceed the cycle length",
            });
        }
        Ok(Self {
            cycle_min,
            min_activation_delay_sec,
            min_deactivation_delay_sec,
        })
    }

    /// Master cycle length in seconds.
    pub fn cycle_sec(&self) -> u32 {
        self.cycle_min * 60
    }

    /// Convert a duty cycle into on/off durations within the master cycle.
    ///
    /// `forced` reports whether a dwell-time coercion changed the requested
    /// timing, so feedback-driven learners can distinguish requested from
    /// realized duty.
    pub fn calculate_cycle_times(&self, duty: Real) -> CycleTimes {
        let cycle_sec = self.cycle_sec();
        let mut on_sec = (clamp_unit(duty) * cycle_sec as Real).round() as u32;
        let mut forced = false;

        // Too short to be worth activating.
        if on_sec > 0 && on_sec < self.min_activation_delay_sec {
            on_sec = 0;
            forced = true;
        }
        // Too short an off-period is worse than staying on.
        if cycle_sec - on_sec < self.min_deactivation_delay_sec && on_sec < cycle_sec {
            on_sec = cycle_sec;
            forced = true;
        }

        CycleTimes {
            on_sec,
            off_sec: cycle_sec - on_sec,
            forced,
        }
    }
}

/// Realized on/off timing for one master cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleTimes {
    pub on_sec: u32,
    pub off_sec: u32,
    /// Whether a dwell-time coercion changed the requested timing.
    pub forced: bool,
}

impl CycleTimes {
    /// Realized duty fraction within a cycle of `cycle_sec` seconds.
    pub fn realized_duty(&self, cycle_sec: u32) -> Real {
        if cycle_sec == 0 {
            return 0.0;
        }
        self.on_sec as Real / cycle_sec as Real
    }
}

/// Staggered start offsets for `n` actuators sharing one master cycle.
///
/// Offsets are evenly spaced across `[0, cycle_sec - on_sec]`, which
/// minimizes the maximum simultaneous-on overlap for contiguous per-actuator
/// windows. Nothing to stagger (single actuator, zero demand, 100% duty)
/// yields all-zero offsets.
pub fn compute_offsets(on_sec: u32, cycle_sec: u32, n: usize) -> Vec<Real> {
    if n <= 1 || on_sec == 0 || on_sec >= cycle_sec {
        return vec![0.0; n];
    }
    let span = (cycle_sec - on_sec) as Real;
    (0..n)
        .map(|i| i as Real * span / (n - 1) as Real)
        .collect()
}
