//! Accumulated-error auto shutdown/restart detection.
//!
//! Decides whether a zone should be fully shut down (and later restarted)
//! based on a filtered accumulation of the temperature error plus a projected
//! future temperature. Hysteresis and a minimum dwell time between
//! transitions keep the decision from chattering; a debounce window absorbs
//! rapid re-evaluations.
//!
//! "Disabled" is a type-level fact: a zone that does not want this detector
//! holds `Option<AutoShutdownDetector>` and simply never constructs one.

use serde::{Deserialize, Serialize};
use tz_core::{HvacMode, Real};

/// Fixed measurement cycle the error accumulation is normalized to, seconds.
pub const MEASUREMENT_CYCLE_SEC: Real = 120.0;

/// Evaluations closer together than this return the previous decision
/// unchanged (20% of the measurement cycle).
const DEBOUNCE_SEC: Real = MEASUREMENT_CYCLE_SEC * 0.2;

/// Symmetric dead-band around the target, degrees C.
pub const TEMP_HYSTERESIS: Real = 0.5;

/// Aggressiveness of the shutdown decision.
///
/// Each level selects an evaluation horizon `dt` (minutes) and a cap on the
/// accumulated error. Slower levels need a longer, larger error history
/// before they act.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownLevel {
    VerySlow,
    Slow,
    Medium,
    Fast,
}

impl ShutdownLevel {
    /// Evaluation horizon in minutes: minimum dwell between transitions and
    /// the distance at which the temperature is projected.
    pub fn dt_min(self) -> Real {
        match self {
            ShutdownLevel::VerySlow => 60.0,
            ShutdownLevel::Slow => 30.0,
            ShutdownLevel::Medium => 15.0,
            ShutdownLevel::Fast => 7.0,
        }
    }

    /// Saturation cap on the accumulated error, degree-cycles.
    pub fn error_threshold(self) -> Real {
        match self {
            ShutdownLevel::VerySlow => 20.0,
            ShutdownLevel::Slow => 10.0,
            ShutdownLevel::Medium => 5.0,
            ShutdownLevel::Fast => 2.0,
        }
    }
}

/// Per-zone shutdown/restart detector.
///
/// Owns its accumulated-error state exclusively; only
/// [`AutoShutdownDetector::should_be_off`] mutates it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoShutdownDetector {
    level: ShutdownLevel,
    accumulated_error: Real,
    last_evaluation_at: Option<Real>,
    last_transition_at: Option<Real>,
    last_decision: bool,
}

impl AutoShutdownDetector {
    /// Create a detector at the given aggressiveness level.
    pub fn new(level: ShutdownLevel) -> Self {
        Self {
            level,
            accumulated_error: 0.0,
            last_evaluation_at: None,
            last_transition_at: None,
            last_decision: false,
        }
    }

    /// Configured level.
    pub fn level(&self) -> ShutdownLevel {
        self.level
    }

    /// Accumulated error, for diagnostics. Bounded by
    /// `±level.error_threshold()` after every evaluation.
    pub fn accumulated_error(&self) -> Real {
        self.accumulated_error
    }

    /// Decision of the most recent evaluation: `true` means the zone should
    /// be fully off.
    pub fn last_decision(&self) -> bool {
        self.last_decision
    }

    /// Evaluate whether the zone should be fully off at time `now` (seconds,
    /// monotonic, caller-owned clock).
    ///
    /// Missing inputs (a mode with no thermal demand, or an absent target,
    /// current or slope reading) return "not off" and perform no
    /// accumulation. Calls arriving within the debounce window return the
    /// previous decision unchanged.
    pub fn should_be_off(
        &mut self,
        mode: HvacMode,
        target: Option<Real>,
        current: Option<Real>,
        slope_per_min: Option<Real>,
        now: Real,
    ) -> bool {
        if !mode.is_regulated() {
            return false;
        }
        let (Some(target), Some(current), Some(slope)) = (target, current, slope_per_min) else {
            tracing::debug!(?mode, "shutdown detector input missing, staying on");
            return false;
        };

        if let Some(last_eval) = self.last_evaluation_at {
            if now - last_eval < DEBOUNCE_SEC {
                return self.last_decision;
            }
        }

        // Error normalized to the measurement cycle, so irregular evaluation
        // intervals accumulate at the same rate.
        let ratio = self
            .last_evaluation_at
            .map(|last_eval| (now - last_eval) / MEASUREMENT_CYCLE_SEC)
            .unwrap_or(1.0);
        let error = (target - current) * ratio;

        // A sign flip halves the history instead of dropping it, so one
        // outlier reading cannot erase a long saturation.
        if error != 0.0
            && self.accumulated_error != 0.0
            && error.signum() != self.accumulated_error.signum()
        {
            self.accumulated_error /= 2.0;
        }
        let threshold = self.level.error_threshold();
        self.accumulated_error = (self.accumulated_error + error).clamp(-threshold, threshold);
        self.last_evaluation_at = Some(now);

        let dt_min = self.level.dt_min();
        let temp_at_dt = current + slope * dt_min;
        let dwell_ok = self
            .last_transition_at
            .map(|at| now - at >= dt_min * 60.0)
            .unwrap_or(true);

        let (saturated_for_off, off_projection, on_projection) = match mode {
            HvacMode::Heat => (
                self.accumulated_error <= -threshold,
                temp_at_dt >= target + TEMP_HYSTERESIS,
                temp_at_dt <= target - TEMP_HYSTERESIS,
            ),
            // Cooling mirrors heating: saturation and comparisons invert.
            _ => (
                self.accumulated_error >= threshold,
                temp_at_dt <= target - TEMP_HYSTERESIS,
                temp_at_dt >= target + TEMP_HYSTERESIS,
            ),
        };

        if !self.last_decision && saturated_for_off && off_projection && dwell_ok {
            self.last_decision = true;
            self.last_transition_at = Some(now);
            tracing::debug!(
                accumulated = self.accumulated_error,
                temp_at_dt,
                "shutdown detector: zone should stop"
            );
        } else if self.last_decision && on_projection && dwell_ok {
            self.last_decision = false;
            self.last_transition_at = Some(now);
            tracing::debug!(temp_at_dt, "shutdown detector: zone should restart");
        }

        self.last_decision
    }
}
