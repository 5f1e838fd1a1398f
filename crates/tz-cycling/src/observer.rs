//! Cycle start/end notification hooks.
//!
//! External energy and metrics collectors register observers with the
//! scheduler. Observer failures are the observer's problem: the scheduler
//! logs them and finishes actuator dispatch regardless.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tz_core::{HvacMode, Real};

/// Failure raised by a cycle observer. Always swallowed by the scheduler.
#[derive(Debug, Error, Clone, PartialEq)]
#[error("Cycle observer failed: {what}")]
pub struct ObserverError {
    pub what: String,
}

/// Hooks fired around each master cycle.
pub trait CycleObserver {
    /// A cycle was dispatched with the realized (post-coercion) timing.
    fn on_cycle_start(
        &mut self,
        on_sec: u32,
        off_sec: u32,
        duty: Real,
        mode: HvacMode,
    ) -> Result<(), ObserverError>;

    /// The master cycle ended; the next repeat has not started yet.
    fn on_cycle_end(&mut self) -> Result<(), ObserverError>;
}

/// Caller-owned energy accumulator fed by cycle notifications.
///
/// Counts each completed cycle's on-window against the actuator's rated
/// power. The core never owns this total; it is read (and may be reset) by
/// whoever registered the meter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyMeter {
    rated_power_kw: Real,
    pending_on_sec: u32,
    total_kwh: Real,
}

impl EnergyMeter {
    pub fn new(rated_power_kw: Real) -> Self {
        Self {
            rated_power_kw,
            pending_on_sec: 0,
            total_kwh: 0.0,
        }
    }

    /// Accumulated energy over every completed cycle, kWh.
    pub fn total_kwh(&self) -> Real {
        self.total_kwh
    }

    pub fn reset(&mut self) {
        self.total_kwh = 0.0;
        self.pending_on_sec = 0;
    }
}

impl CycleObserver for EnergyMeter {
    fn on_cycle_start(
        &mut self,
        on_sec: u32,
        _off_sec: u32,
        _duty: Real,
        _mode: HvacMode,
    ) -> Result<(), ObserverError> {
        self.pending_on_sec = on_sec;
        Ok(())
    }

    fn on_cycle_end(&mut self) -> Result<(), ObserverError> {
        self.total_kwh += self.rated_power_kw * self.pending_on_sec as Real / 3600.0;
        self.pending_on_sec = 0;
        Ok(())
    }
}
