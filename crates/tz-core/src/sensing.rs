//! Per-tick sensor input.

use crate::numeric::Real;
use serde::{Deserialize, Serialize};

/// Temperature readings supplied by the caller once per evaluation tick.
///
/// Every field is optional: a sensor that has not reported yet is a degraded
/// input, not an error. The core defaults to the safe decision when a
/// mandatory reading is missing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureSample {
    /// Target (setpoint) temperature, degrees C.
    pub target: Option<Real>,
    /// Current room temperature, degrees C.
    pub current: Option<Real>,
    /// Outdoor/external temperature, degrees C.
    pub external: Option<Real>,
    /// Room temperature trend, degrees C per hour.
    pub trend_per_hour: Option<Real>,
}

impl TemperatureSample {
    /// Trend converted to degrees C per minute.
    pub fn trend_per_min(&self) -> Option<Real> {
        self.trend_per_hour.map(|t| t / 60.0)
    }
}
