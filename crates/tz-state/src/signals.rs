//! Override signal inputs.
//!
//! Each override source (safety, window, presence, motion, power budget,
//! central mode, auto shutdown) exposes only its current value; the
//! reconciler reads them all once per tick.

use serde::{Deserialize, Serialize};
use tz_core::CentralMode;

/// Snapshot of every override source for one evaluation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OverrideSignals {
    /// Building-wide override mode.
    pub central_mode: CentralMode,
    /// A safety condition (stale sensor, runaway temperature) is active.
    pub safety_detected: bool,
    /// A window in the zone is open.
    pub window_detected: bool,
    /// Nobody is home.
    pub absence_detected: bool,
    /// Motion reading: `None` when the zone has no motion sensor.
    pub motion_detected: Option<bool>,
    /// The zone exceeds its share of the power budget.
    pub overpowering_detected: bool,
    /// The auto-shutdown detector wants the zone fully off.
    pub shutdown_requested: bool,
}
